//! The ordered scenario steps.
//!
//! Data flows strictly forward: mine, build, patch, fund, sign, broadcast,
//! mine, verify, then the spend leg. Each step blocks on its RPC calls; there
//! is no concurrency and no retry. The fixture is owned by the [`Scenario`]
//! context object, so node shutdown is guaranteed on every exit path.

use std::path::Path;

use bitcoin::Amount;
use normtx_rpc::node::UtxoRef;

use crate::fixture::NetworkFixture;
use crate::{check, Result, ScenarioError};

/// Blocks mined up front so coinbase outputs mature and funds are spendable.
pub const BOOTSTRAP_BLOCKS: u64 = 120;

/// Amount paid into the upgraded CHECKSIGEX output.
pub const PAYMENT: Amount = Amount::from_sat(500_000_000);

/// Amount the spend leg forwards, leaving the remainder as fee.
pub const SPEND: Amount = Amount::from_sat(499_900_000);

/// Transaction version that activates normalized-identifier semantics.
pub const UPGRADED_VERSION: i32 = 2;

/// Scenario context: owns the two-node mesh for the duration of one run.
pub struct Scenario {
    net: NetworkFixture,
}

impl Scenario {
    /// Boot a fresh two-node mesh.
    pub fn new(bitcoind_path: &Path) -> Result<Self> {
        println!("Starting two regtest nodes...");
        let net = NetworkFixture::setup(bitcoind_path, 2)?;
        Ok(Self { net })
    }

    /// The full scenario: bootstrap, confirm the upgraded output, spend it.
    pub fn run(&self) -> Result<()> {
        self.bootstrap()?;
        let utxo = self.confirm_checksigex_output()?;
        self.spend_confirmed_output(utxo)?;
        Ok(())
    }

    /// The fixture, for stepwise runs and post-hoc inspection.
    pub fn network(&self) -> &NetworkFixture {
        &self.net
    }

    /// Mine past coinbase maturity on node 0 and wait for convergence.
    pub fn bootstrap(&self) -> Result<()> {
        println!("Mining {BOOTSTRAP_BLOCKS} blocks...");
        self.net.mine(0, BOOTSTRAP_BLOCKS)?;
        self.net.sync_all()
    }

    /// Build, upgrade, fund, sign, broadcast and confirm the CHECKSIGEX
    /// output, returning a reference to it for the spend leg.
    pub fn confirm_checksigex_output(&self) -> Result<UtxoRef> {
        let node0 = self.net.node(0);
        let node1 = self.net.node(1);

        // Node 0 pays node 1 through an output we upgrade before broadcast.
        println!("Building legacy draft paying {PAYMENT} to node 1...");
        let destination = node1.new_address()?;
        let draft = node0.create_raw_transaction(&[], &[(destination, PAYMENT)])?;

        // Upgrade in place. The issuing node never sees this transaction as a
        // coherent object again, only as raw bytes.
        let mut tx = normtx_codec::decode(&draft)?;
        normtx_codec::set_version(&mut tx, UPGRADED_VERSION);
        check::expect_eq(&tx.output.len(), &1usize, "upgrade: draft output count")?;
        let upgraded = normtx_codec::upgrade_to_checksigex(&tx.output[0].script_pubkey)?;
        normtx_codec::patch_output_script(&mut tx, 0, upgraded.clone())?;
        let patched = normtx_codec::encode(&tx);

        // Funding may insert the change output before or after the patched
        // one, so the index is derived from the reported change position.
        println!("Funding and signing...");
        let (funded, change_pos) = node0.fund_raw_transaction(&patched)?;
        check::expect_true(
            change_pos == 0 || change_pos == 1,
            "fund: change output position",
        )?;
        let out_pos = (1 - change_pos) as u32;

        let (signed, complete) = node0.sign_raw_transaction(&funded, None)?;
        if !complete {
            return Err(ScenarioError::IncompleteSignature {
                step: "signing the upgraded transaction",
            });
        }

        println!("Broadcasting and mining...");
        let txid = node0.send_raw_transaction(&signed)?;
        self.net.sync_all()?;
        let block = self.mine_one(0)?;
        self.net.sync_all()?;
        check::expect_true(
            node0.block_txids(&block)?.contains(&txid),
            "confirm: txid in mined block",
        )?;

        // The node must have persisted the novel output type unmodified.
        let (_, script_bytes) = node0.get_tx_out(&txid, out_pos)?.ok_or_else(|| {
            ScenarioError::Assertion {
                context: "verify: confirmed output present".into(),
                expected: "utxo entry".into(),
                actual: "not found".into(),
            }
        })?;
        check::expect_eq(
            &hex::encode(&script_bytes),
            &hex::encode(upgraded.as_bytes()),
            "verify: spending-condition bytes",
        )?;

        Ok(UtxoRef {
            txid,
            vout: out_pos,
            script_pubkey: upgraded,
        })
    }

    /// Spend the confirmed output from node 1 back to node 0.
    ///
    /// The input references the literal confirmed txid/index; the node
    /// resolves the normalized identifier internally when looking it up.
    pub fn spend_confirmed_output(&self, utxo: UtxoRef) -> Result<()> {
        let node0 = self.net.node(0);
        let node1 = self.net.node(1);

        println!("Spending the CHECKSIGEX output from node 1...");
        let destination = node0.new_address()?;
        let draft =
            node1.create_raw_transaction(std::slice::from_ref(&utxo), &[(destination, SPEND)])?;

        // Only the version field changes here; the spending condition is
        // satisfied by the wallet, not by byte patching.
        let mut tx = normtx_codec::decode(&draft)?;
        normtx_codec::set_version(&mut tx, UPGRADED_VERSION);
        let patched = normtx_codec::encode(&tx);

        let (signed, complete) =
            node1.sign_raw_transaction(&patched, Some(std::slice::from_ref(&utxo)))?;
        if !complete {
            return Err(ScenarioError::IncompleteSignature {
                step: "signing the spend of the CHECKSIGEX output",
            });
        }

        let spend_txid = node1.send_raw_transaction(&signed)?;
        let block = self.mine_one(1)?;

        // Both checks require the node to resolve normalized identifiers in
        // block and wallet listings; they are enforced, not advisory.
        self.net.sync_all()?;
        check::expect_true(
            node1.block_txids(&block)?.contains(&spend_txid),
            "spend: txid in mined block",
        )?;
        check::expect_true(
            node0.list_unspent_txids()?.contains(&spend_txid),
            "spend: proceeds visible in recipient unspent listing",
        )?;

        println!("Scenario complete: CHECKSIGEX output confirmed and spent.");
        Ok(())
    }

    fn mine_one(&self, index: usize) -> Result<bitcoin::BlockHash> {
        self.net
            .mine(index, 1)?
            .first()
            .copied()
            .ok_or_else(|| ScenarioError::Setup("generate reported no new block".into()))
    }
}

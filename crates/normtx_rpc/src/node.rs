use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::time::Duration;

use bitcoin::{Address, Amount, BlockHash, Network, ScriptBuf, Txid};
use bitcoincore_rpc::json;
use bitcoincore_rpc::{Auth, Client, RpcApi};

use crate::{Result, RpcError};

/// Configuration for a node RPC connection.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub rpc_url: String,
    pub auth: NodeAuth,
    pub network: Network,
    pub datadir: Option<PathBuf>,
    /// Peer (P2P) listen port, used to mesh nodes together.
    pub p2p_port: u16,
}

/// Authentication method for RPC connection.
#[derive(Debug, Clone)]
pub enum NodeAuth {
    /// Cookie file authentication (default for spawned nodes).
    CookieFile(PathBuf),
    /// Username/password authentication.
    UserPass { user: String, pass: String },
}

impl NodeConfig {
    /// Create a regtest configuration for specific RPC and P2P ports.
    pub fn regtest(datadir: &Path, rpc_port: u16, p2p_port: u16) -> Self {
        Self {
            rpc_url: format!("http://127.0.0.1:{rpc_port}"),
            auth: NodeAuth::CookieFile(datadir.join("regtest/.cookie")),
            network: Network::Regtest,
            datadir: Some(datadir.to_path_buf()),
            p2p_port,
        }
    }

    /// Build an RPC client from this config.
    pub fn client(&self) -> Result<Client> {
        let auth = match &self.auth {
            NodeAuth::CookieFile(path) => Auth::CookieFile(path.clone()),
            NodeAuth::UserPass { user, pass } => Auth::UserPass(user.clone(), pass.clone()),
        };

        Client::new(&self.rpc_url, auth).map_err(RpcError::Rpc)
    }
}

/// Reference to a confirmed unspent output, carried by value between the
/// confirm leg and the spend leg of the scenario.
///
/// The script is the locally constructed spending condition; the node is
/// expected to resolve normalized identifiers internally when looking the
/// outpoint up, so txid/vout are the literal confirmed values.
#[derive(Debug, Clone)]
pub struct UtxoRef {
    pub txid: Txid,
    pub vout: u32,
    pub script_pubkey: ScriptBuf,
}

/// Managed ledger node for the scenario.
///
/// Starts a regtest bitcoind process and provides RPC access.
/// The node is stopped when dropped.
pub struct ManagedNode {
    process: Option<Child>,
    pub config: NodeConfig,
    pub client: Client,
}

impl ManagedNode {
    /// Start a regtest node with isolated datadir and unique ports.
    ///
    /// `bitcoind_path` should point to a normalized-txid-enabled bitcoind.
    pub fn start_regtest(
        bitcoind_path: &Path,
        datadir: &Path,
        rpc_port: u16,
        p2p_port: u16,
    ) -> Result<Self> {
        std::fs::create_dir_all(datadir)
            .map_err(|e| RpcError::NodeError(format!("create datadir: {e}")))?;

        let process = Command::new(bitcoind_path)
            .args([
                "-regtest",
                "-daemon=0",
                &format!("-datadir={}", datadir.display()),
                "-server",
                "-txindex",
                "-listen=1",
                // The patched output script is nonstandard until the upgrade
                // deploys; relay must not filter it out.
                "-acceptnonstdtxn=1",
                "-fallbackfee=0.00001",
                "-minrelaytxfee=0",
                "-blockmintxfee=0",
                "-rpcallowip=127.0.0.1",
                "-rpcbind=127.0.0.1",
                &format!("-rpcport={rpc_port}"),
                &format!("-port={p2p_port}"),
            ])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| RpcError::NodeNotFound(format!("{}: {e}", bitcoind_path.display())))?;

        let config = NodeConfig::regtest(datadir, rpc_port, p2p_port);

        // Wait for the node to become available (up to 30 seconds for slow CI)
        let mut client = None;
        for _ in 0..60 {
            std::thread::sleep(Duration::from_millis(500));
            if let Ok(c) = config.client() {
                if c.get_blockchain_info().is_ok() {
                    client = Some(c);
                    break;
                }
            }
        }

        let client = client.ok_or_else(|| {
            RpcError::NodeError("bitcoind did not start within 30 seconds".into())
        })?;

        Ok(Self {
            process: Some(process),
            config,
            client,
        })
    }

    /// The local address peers should connect to.
    pub fn p2p_addr(&self) -> String {
        format!("127.0.0.1:{}", self.config.p2p_port)
    }

    /// Create a wallet (required for regtest operations).
    pub fn create_wallet(&self, name: &str) -> Result<()> {
        // Try to create; if it already exists, try to load it
        match self.client.create_wallet(name, None, None, None, None) {
            Ok(_) => Ok(()),
            Err(_) => {
                self.client.load_wallet(name).map_err(RpcError::Rpc)?;
                Ok(())
            }
        }
    }

    /// Get a fresh destination address from the wallet.
    ///
    /// Legacy type: the CHECKSIGEX upgrade rewrites a pay-to-pubkey-hash
    /// tail, so the draft output must be P2PKH rather than a witness program.
    pub fn new_address(&self) -> Result<Address> {
        let addr = self
            .client
            .get_new_address(None, Some(json::AddressType::Legacy))
            .map_err(RpcError::Rpc)?
            .assume_checked();
        Ok(addr)
    }

    /// Mine blocks to a given address and return the new block hashes.
    pub fn generate_blocks(&self, count: u64, address: &Address) -> Result<Vec<BlockHash>> {
        self.client
            .generate_to_address(count, address)
            .map_err(RpcError::Rpc)
    }

    /// Build an unsigned, unfunded raw transaction.
    pub fn create_raw_transaction(
        &self,
        inputs: &[UtxoRef],
        outputs: &[(Address, Amount)],
    ) -> Result<String> {
        let utxos: Vec<json::CreateRawTransactionInput> = inputs
            .iter()
            .map(|r| json::CreateRawTransactionInput {
                txid: r.txid,
                vout: r.vout,
                sequence: None,
            })
            .collect();

        let outs: HashMap<String, Amount> = outputs
            .iter()
            .map(|(addr, amount)| (addr.to_string(), *amount))
            .collect();

        self.client
            .create_raw_transaction_hex(&utxos, &outs, None, None)
            .map_err(RpcError::Rpc)
    }

    /// Have the wallet select inputs and add a change output to cover fees.
    ///
    /// Returns the funded hex and the position at which the change output was
    /// inserted — funding may place it before or after the existing outputs.
    pub fn fund_raw_transaction(&self, raw_hex: &str) -> Result<(String, i32)> {
        let res = self
            .client
            .fund_raw_transaction(raw_hex, None, None)
            .map_err(RpcError::Rpc)?;
        Ok((hex::encode(&res.hex), res.change_position))
    }

    /// Request wallet signatures for all inputs.
    ///
    /// `prevouts` describes outputs the node may not index for its wallet
    /// (here: the CHECKSIGEX output under spend). Returns the signed hex and
    /// the node's completeness flag; the caller decides whether a partial
    /// signing is fatal.
    pub fn sign_raw_transaction(
        &self,
        raw_hex: &str,
        prevouts: Option<&[UtxoRef]>,
    ) -> Result<(String, bool)> {
        let utxos: Option<Vec<json::SignRawTransactionInput>> = prevouts.map(|refs| {
            refs.iter()
                .map(|r| json::SignRawTransactionInput {
                    txid: r.txid,
                    vout: r.vout,
                    script_pub_key: r.script_pubkey.clone(),
                    redeem_script: None,
                    amount: None,
                })
                .collect()
        });

        let res = self
            .client
            .sign_raw_transaction_with_wallet(raw_hex, utxos.as_deref(), None)
            .map_err(RpcError::Rpc)?;
        Ok((hex::encode(&res.hex), res.complete))
    }

    /// Broadcast a signed raw transaction.
    pub fn send_raw_transaction(&self, raw_hex: &str) -> Result<Txid> {
        self.client
            .send_raw_transaction(raw_hex)
            .map_err(RpcError::Rpc)
    }

    /// Transaction identifiers contained in a block.
    pub fn block_txids(&self, hash: &BlockHash) -> Result<Vec<Txid>> {
        let info = self.client.get_block_info(hash).map_err(RpcError::Rpc)?;
        Ok(info.tx)
    }

    /// Look a confirmed output up by (txid, vout).
    ///
    /// Returns the amount and the spending-condition bytes exactly as the
    /// node reports them, or `None` if the output is unknown or spent.
    pub fn get_tx_out(&self, txid: &Txid, vout: u32) -> Result<Option<(Amount, Vec<u8>)>> {
        let out = self
            .client
            .get_tx_out(txid, vout, Some(false))
            .map_err(RpcError::Rpc)?;
        Ok(out.map(|o| (o.value, o.script_pub_key.hex)))
    }

    /// Owning transaction identifiers of the wallet's spendable outputs.
    pub fn list_unspent_txids(&self) -> Result<Vec<Txid>> {
        let entries = self
            .client
            .list_unspent(None, None, None, None, None)
            .map_err(RpcError::Rpc)?;
        Ok(entries.into_iter().map(|e| e.txid).collect())
    }

    /// Ask the node to connect out to a peer.
    pub fn add_peer(&self, addr: &str) -> Result<()> {
        self.client.add_node(addr).map_err(RpcError::Rpc)
    }

    /// Number of established peer connections.
    pub fn connection_count(&self) -> Result<usize> {
        self.client.get_connection_count().map_err(RpcError::Rpc)
    }

    /// Hash of the node's current best block.
    pub fn best_block_hash(&self) -> Result<BlockHash> {
        self.client.get_best_block_hash().map_err(RpcError::Rpc)
    }

    /// Stop the node.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(ref mut process) = self.process {
            let _ = self.client.stop();
            let _ = process.wait();
            self.process = None;
        }
        Ok(())
    }
}

impl Drop for ManagedNode {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

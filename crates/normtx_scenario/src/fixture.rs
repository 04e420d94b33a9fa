//! Network fixture: an isolated mesh of regtest nodes.
//!
//! Boots N node instances from clean chain state, links them into a full
//! peer mesh, and exposes a blocking best-block synchronization wait. Any
//! node that fails to start or to converge within the fixed poll budget is a
//! fatal scenario error; there are no retries beyond that budget.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use bitcoin::{Address, BlockHash};
use normtx_rpc::node::ManagedNode;

use crate::{Result, ScenarioError};

/// Atomic counters for unique ports when running scenarios in parallel.
static RPC_PORT_COUNTER: AtomicU16 = AtomicU16::new(18443);
static P2P_PORT_COUNTER: AtomicU16 = AtomicU16::new(19443);

const POLL_ATTEMPTS: u32 = 60;
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A running mesh of regtest nodes, torn down (processes stopped, datadirs
/// removed) on drop — including early fatal exits.
pub struct NetworkFixture {
    nodes: Vec<ManagedNode>,
    mining_addresses: Vec<Address>,
    datadirs: Vec<PathBuf>,
}

impl NetworkFixture {
    /// Start `node_count` nodes with fresh datadirs and mesh them together.
    ///
    /// `bitcoind_path` should point to a normalized-txid-enabled bitcoind.
    pub fn setup(bitcoind_path: &Path, node_count: usize) -> Result<Self> {
        let mut nodes = Vec::with_capacity(node_count);
        let mut mining_addresses = Vec::with_capacity(node_count);
        let mut datadirs = Vec::with_capacity(node_count);

        for _ in 0..node_count {
            let rpc_port = RPC_PORT_COUNTER.fetch_add(1, Ordering::SeqCst);
            let p2p_port = P2P_PORT_COUNTER.fetch_add(1, Ordering::SeqCst);
            let datadir = std::env::temp_dir()
                .join("normtx_test")
                .join(format!("regtest_{rpc_port}"));

            // Clean up any previous data
            let _ = std::fs::remove_dir_all(&datadir);

            let node = ManagedNode::start_regtest(bitcoind_path, &datadir, rpc_port, p2p_port)?;
            node.create_wallet("test")?;
            let mining_address = node.new_address()?;

            nodes.push(node);
            mining_addresses.push(mining_address);
            datadirs.push(datadir);
        }

        let fixture = Self {
            nodes,
            mining_addresses,
            datadirs,
        };
        fixture.connect_all()?;
        Ok(fixture)
    }

    /// Link every pair of nodes and wait until each reports a connection.
    fn connect_all(&self) -> Result<()> {
        for i in 0..self.nodes.len() {
            for j in (i + 1)..self.nodes.len() {
                self.nodes[i].add_peer(&self.nodes[j].p2p_addr())?;
            }
        }
        if self.nodes.len() < 2 {
            return Ok(());
        }

        for _ in 0..POLL_ATTEMPTS {
            let mut all_connected = true;
            for node in &self.nodes {
                if node.connection_count()? == 0 {
                    all_connected = false;
                    break;
                }
            }
            if all_connected {
                return Ok(());
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        Err(ScenarioError::Setup(
            "nodes failed to establish peer connections within the poll budget".into(),
        ))
    }

    /// Handle to one node of the mesh.
    ///
    /// # Panics
    ///
    /// Panics if `index >= node_count`. Step code addresses nodes by the
    /// fixed positions it set the mesh up with, so an out-of-range index is
    /// a driver bug, not a runtime condition.
    pub fn node(&self, index: usize) -> &ManagedNode {
        &self.nodes[index]
    }

    /// Mine blocks on one node, paying its own mining address.
    pub fn mine(&self, index: usize, count: u64) -> Result<Vec<BlockHash>> {
        Ok(self.nodes[index].generate_blocks(count, &self.mining_addresses[index])?)
    }

    /// Block until every node reports the same best block hash.
    ///
    /// Polls with a fixed interval and a bounded attempt count; exhausting
    /// the budget is fatal.
    pub fn sync_all(&self) -> Result<()> {
        for _ in 0..POLL_ATTEMPTS {
            let mut tips = Vec::with_capacity(self.nodes.len());
            for node in &self.nodes {
                tips.push(node.best_block_hash()?);
            }
            if tips.windows(2).all(|pair| pair[0] == pair[1]) {
                return Ok(());
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        Err(ScenarioError::Setup(
            "nodes failed to converge on a best block within the poll budget".into(),
        ))
    }
}

impl Drop for NetworkFixture {
    fn drop(&mut self) {
        for node in &mut self.nodes {
            let _ = node.stop();
        }
        for datadir in &self.datadirs {
            let _ = std::fs::remove_dir_all(datadir);
        }
    }
}

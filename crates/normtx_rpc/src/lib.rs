//! Node command interface for the normalized-txid scenario.
//!
//! Thin wrapper around `bitcoincore-rpc` that spawns and manages regtest
//! node processes (cookie auth, isolated datadirs, unique ports) and exposes
//! exactly the command surface the scenario steps need. Everything hard —
//! consensus, signatures, UTXO indexing — lives behind these RPCs in the
//! external node binary.

pub mod node;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("bitcoincore-rpc error: {0}")]
    Rpc(#[from] bitcoincore_rpc::Error),

    #[error("node not found at {0}")]
    NodeNotFound(String),

    #[error("node error: {0}")]
    NodeError(String),
}

pub type Result<T> = std::result::Result<T, RpcError>;

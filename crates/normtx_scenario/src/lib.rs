//! Scenario driver for the normalized-txid CHECKSIGEX output upgrade.
//!
//! Boots a two-node regtest mesh, upgrades a legacy pay-to-pubkey-hash
//! output into a CHECKSIGEX spending condition by raw-byte patching, confirms
//! it, then has the second node spend it by its confirmed identifier. Every
//! unmet condition is fatal: this is a correctness oracle, not a resilient
//! service, so the run halts at the first violation.

pub mod check;
pub mod fixture;
pub mod locator;
pub mod steps;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    /// A node or the network mesh did not reach a usable state.
    #[error("setup failure: {0}")]
    Setup(String),

    #[error("rpc error: {0}")]
    Rpc(#[from] normtx_rpc::RpcError),

    #[error(transparent)]
    Codec(#[from] normtx_codec::CodecError),

    /// The sign command left at least one input unsatisfied. A partially
    /// signed transaction is never broadcast.
    #[error("incomplete signature while {step}")]
    IncompleteSignature { step: &'static str },

    #[error("assertion failed [{context}]: expected {expected}, got {actual}")]
    Assertion {
        context: String,
        expected: String,
        actual: String,
    },
}

pub type Result<T> = std::result::Result<T, ScenarioError>;

//! Raw-transaction codec for the normalized-txid scenario.
//!
//! The node's own transaction builder predates the CHECKSIGEX output type, so
//! the scenario has to drop to raw bytes to inject it. All of that byte-level
//! surgery lives here: strict hex decode/encode with exact round-trip
//! fidelity, surgical patching of the version field and of a single output
//! script, and construction of the CHECKSIGEX spending condition itself.

pub mod checksigex;
pub mod error;
pub mod raw;

pub use checksigex::{upgrade_to_checksigex, OP_CHECKSIGEX, SIGMODE_SINGLE_NORMALIZED};
pub use error::{CodecError, Result};
pub use raw::{decode, encode, patch_output_script, set_version};

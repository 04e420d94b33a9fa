use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    /// The byte stream is shorter than its length prefixes declare, carries
    /// trailing bytes after the declared fields, or uses a non-minimal
    /// variable-length integer encoding.
    #[error("malformed transaction: {0}")]
    Malformed(#[from] bitcoin::consensus::encode::Error),

    #[error("malformed transaction: invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("output index {index} out of range ({outputs} outputs)")]
    OutputIndex { index: usize, outputs: usize },

    #[error("unexpected script shape: {0}")]
    UnexpectedScript(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;

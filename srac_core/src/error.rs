use std::io;

use thiserror::Error;

/// Errors surfaced by container and stripe operations.
///
/// Every error is fatal to the operation that raised it; there is no retry
/// and no partial-success reporting.
#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// Parameter combination impossible for the selected strategy.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// The bytes on disk do not describe a well-formed container.
    #[error("corrupt container: {0}")]
    Format(String),

    /// The block codec failed, or its output disagrees with the index.
    #[error("codec error: {0}")]
    Codec(String),

    #[error("block {index} out of range ({total} blocks)")]
    BlockOutOfRange { index: u64, total: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;

//! I/O error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Checkpoint serialization error.
    #[error("checkpoint serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Another process owns the checkpoint.
    #[error("checkpoint {0} is locked by another run")]
    CheckpointLocked(PathBuf),

    /// EXIF metadata could not be parsed.
    #[error("metadata error in {path}: {reason}")]
    Metadata {
        /// Offending file.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] geosift_core::Error),
}

//! Error hierarchy for the snapshot staging layer.
//!
//! Failures split into three classes: infrastructure I/O failures that the
//! caller decides to retry or abandon, caller lifecycle misuse of scratch
//! spaces and staging files, and configuration validation failures.
//! Reference-count underflow is deliberately not representable here; it
//! aborts (see `SnapshotStagingArea`).

use std::path::PathBuf;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (filesystem, admission control)
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Configuration validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Disk I/O failures during staging operations
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// I/O failure carrying the path it occurred at
    #[error("Error occurred at path: {path}")]
    PathError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The caller's context was cancelled while a write waited for bulk I/O
    /// admission; nothing was written by that call.
    #[error("Bulk write cancelled while awaiting I/O admission")]
    Cancelled,

    /// Scratch space or staging file lifecycle misuse
    #[error(transparent)]
    Staging(#[from] StagingError),
}

/// Usage/state errors of the scratch and file lifecycle. Any of these means
/// the snapshot attempt that triggered it must be abandoned, not retried in
/// place.
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    /// Operation on a scratch space that has already been closed
    #[error("snapshot scratch space is closed")]
    ScratchClosed,

    /// Write or reopen of a staging file after it was released
    #[error("file has already been closed")]
    FileAlreadyClosed,

    /// Close or sync of a staging file that was never written to
    #[error("file is empty")]
    EmptyFile,
}

// ============== Conversion Implementations ============== //
impl From<StagingError> for Error {
    fn from(e: StagingError) -> Self {
        Error::Storage(StorageError::Staging(e))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(StorageError::IoError(e))
    }
}

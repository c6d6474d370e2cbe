//! Error handling types for duplex-bridge
//!
//! Each bridge operation has its own error enum; [`BridgeError`] aggregates
//! them together with the lifecycle errors that any operation can raise.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure while opening the two file handles.
#[derive(Debug, Error)]
pub enum OpenError {
    /// The source could not be opened; the sink was never attempted.
    #[error("Failed to open read path {}: {source}", .path.display())]
    ReadOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The source opened but the sink could not be opened.
    #[error("Failed to open write path {}: {source}", .path.display())]
    WriteOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure on the write side while accepting a chunk.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Writing the accumulated buffer failed. Nothing was dropped:
    /// `pending` bytes are still buffered.
    #[error("Failed to flush {pending} pending bytes: {source}")]
    FlushFailed {
        pending: usize,
        #[source]
        source: io::Error,
    },

    /// A previous flush was abandoned before it completed, so the sink may
    /// hold a partial write.
    #[error("A previous flush was interrupted before completing")]
    FlushInterrupted,

    /// `finalize` already ran; the write side accepts nothing more.
    #[error("Write after finalize")]
    WriteAfterFinalize,
}

/// Failure of the final flush issued by `finalize`.
#[derive(Debug, Error)]
pub enum FlushError {
    #[error("Final flush of {pending} bytes failed: {source}")]
    Failed {
        pending: usize,
        #[source]
        source: io::Error,
    },
}

/// Failure while pulling a chunk from the source.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Read from source failed: {0}")]
    UnderlyingReadFailed(#[source] io::Error),

    /// An earlier read failed; the source produces no more chunks.
    #[error("Source already failed, no further reads are possible")]
    SourceFailed,
}

/// Failure while closing the handles during teardown.
///
/// Both closes are always attempted. The write handle is closed first, so
/// when both fail the write error is the primary one.
#[derive(Debug, Error)]
pub enum CloseError {
    #[error("Failed to close read handle: {0}")]
    ReadCloseFailed(#[source] io::Error),

    #[error("Failed to close write handle: {0}")]
    WriteCloseFailed(#[source] io::Error),

    #[error("Failed to close write handle: {write} (read handle also failed: {read})")]
    Both {
        #[source]
        write: io::Error,
        read: io::Error,
    },
}

impl CloseError {
    /// Combine the outcome of the two closes. `None` when both succeeded.
    pub fn merge(write: io::Result<()>, read: io::Result<()>) -> Option<Self> {
        match (write, read) {
            (Ok(()), Ok(())) => None,
            (Err(write), Ok(())) => Some(CloseError::WriteCloseFailed(write)),
            (Ok(()), Err(read)) => Some(CloseError::ReadCloseFailed(read)),
            (Err(write), Err(read)) => Some(CloseError::Both { write, read }),
        }
    }

    /// The first error encountered during teardown.
    pub fn primary(&self) -> &io::Error {
        match self {
            CloseError::ReadCloseFailed(e) | CloseError::WriteCloseFailed(e) => e,
            CloseError::Both { write, .. } => write,
        }
    }
}

/// Aggregate error returned by every [`Bridge`](crate::Bridge) operation.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Open(#[from] OpenError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Flush(#[from] FlushError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Close(#[from] CloseError),

    /// The bridge has not been opened, or its open failed.
    #[error("Bridge is not open")]
    NotOpen,

    /// The bridge was torn down.
    #[error("Bridge used after close")]
    UseAfterClose,

    /// The driving pipeline was cancelled.
    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required option: {0}")]
    Missing(&'static str),

    #[error("Invalid threshold for {name}: must be greater than zero")]
    InvalidThreshold { name: &'static str },
}

/// Helper functions for common error patterns
impl BridgeError {
    /// True for errors after which the bridge cannot be used any more.
    ///
    /// Write-side errors leave the buffer intact and are not terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BridgeError::Write(_) | BridgeError::NotOpen)
    }
}

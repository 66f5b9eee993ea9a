//! Error types for the log tail engine.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for log tailing operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The log file could not be stat'ed, opened or read during a poll.
    #[error("Log file not accessible: {}", path.display())]
    NotAccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O errors outside of a poll (config files, sockets).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File watching errors from the notify crate.
    #[error("File watcher error: {0}")]
    Watcher(#[from] notify::Error),

    /// Invalid configuration values or unparsable config file.
    #[error("Invalid configuration: {message}")]
    Config { message: String },
}

impl Error {
    pub(crate) fn not_accessible(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::NotAccessible {
            path: path.into(),
            source,
        }
    }

    /// True for failures the follow loop should retry on the next tick.
    pub fn is_not_accessible(&self) -> bool {
        matches!(self, Error::NotAccessible { .. })
    }
}

/// A convenient Result type for log tail operations.
pub type Result<T> = std::result::Result<T, Error>;

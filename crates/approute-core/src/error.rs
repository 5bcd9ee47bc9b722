//! Error types for AppRoute Core

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // File store construction errors
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(String),

    // File store caller errors
    #[error("File {0} does not exist")]
    FileNotFound(PathBuf),

    #[error("Path {0} is not a regular file")]
    NotAFile(PathBuf),

    #[error("File {0} already exists in the store")]
    AlreadyTracked(PathBuf),

    #[error("File store has shut down")]
    ShutDown,

    // File store ingestion errors
    #[error("Failed to stat file {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to watch file {path}: {message}")]
    Watch { path: PathBuf, message: String },

    #[error("File {0} was removed")]
    FileRemoved(PathBuf),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = Error::FileNotFound(PathBuf::from("/tmp/missing.pem"));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_already_tracked_message() {
        let err = Error::AlreadyTracked(PathBuf::from("/tmp/cert.pem"));
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_read_error_preserves_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::Read {
            path: PathBuf::from("/tmp/key.pem"),
            source: io,
        };
        assert!(err.to_string().contains("/tmp/key.pem"));
        assert!(std::error::Error::source(&err).is_some());
    }
}

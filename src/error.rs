use std::path::PathBuf;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures while validating or sampling an interface
#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("Interface '{0}' not found")]
    InterfaceNotFound(String),

    #[error("Interface '{0}' not found or disconnected")]
    InterfaceGone(String),

    #[error("Failed to read counters for '{interface}': {source}")]
    Sample {
        interface: String,
        #[source]
        source: BoxError,
    },
}

/// Failures of session persistence
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid session file name: {0:?}")]
    InvalidName(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SessionError {
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SessionError::Persistence {
            path: path.into(),
            source,
        }
    }
}

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed artifact name: {0}")]
    MalformedName(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Invalid anchor '{0}'")]
    InvalidAnchor(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Storage {
            path: path.into(),
            source,
        }
    }

    /// Storage faults may clear up on their own; the caller can re-issue the
    /// same request since no partial state survives a failed call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Storage { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

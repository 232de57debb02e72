//! Error types for session store operations.

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A session identifier could not be parsed.
    #[error("Invalid session id: {0}")]
    InvalidId(String),

    /// Error from the persistence backend.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A stored record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Persistence(e.to_string())
    }
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, Error>;

use std::fmt;
use std::io;

/// Errors surfaced by object-store operations
#[derive(Debug)]
pub enum StoreError {
    /// The requested object or directory does not exist in the remote
    NotFound,
    /// I/O failure talking to the backend command
    Io(io::Error),
    /// The backend command failed with diagnostic output
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "object not found in remote"),
            StoreError::Io(e) => write!(f, "backend i/o error: {}", e),
            StoreError::Backend(msg) => write!(f, "backend failure: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::Io(err)
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

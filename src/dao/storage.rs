use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Backend-agnostic storage failure.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or did not answer in time.
    #[error("{backend} unavailable: {message}")]
    Unavailable {
        backend: &'static str,
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The backend answered but refused the write (missing parent row, corrupt document...).
    #[error("storage rejected the operation: {0}")]
    Rejected(String),
}

impl StorageError {
    pub fn unavailable(backend: &'static str, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            backend,
            message: source.to_string(),
            source: Box::new(source),
        }
    }
}

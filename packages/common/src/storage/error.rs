use thiserror::Error;

/// Errors that can occur during object storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(String),
    /// The object key is malformed or outside the caller's namespace.
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    /// The upload was rejected before reaching the backend.
    #[error("{0}")]
    Rejected(String),
    /// The backend (S3 or compatible) returned an error.
    #[error("storage backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "object-storage")]
impl From<::s3::error::S3Error> for StorageError {
    fn from(err: ::s3::error::S3Error) -> Self {
        Self::Backend(err.to_string())
    }
}

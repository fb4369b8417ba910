use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::error::StorageError;

/// A time-limited URL the client can `PUT` the object body to.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct PresignedUpload {
    /// Object key the upload will be stored under.
    #[schema(example = "uploads/42/0193a1b2-7c4d-7e8f-9a0b-1c2d3e4f5a6b.png")]
    pub key: String,
    /// Signed URL accepting a single `PUT`.
    pub upload_url: String,
    /// Public URL the object is served from once uploaded.
    pub public_url: String,
    /// Seconds until `upload_url` expires.
    #[schema(example = 600)]
    pub expires_in: u64,
}

/// Key-addressed object storage (S3 or compatible).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Produce a signed `PUT` URL for `key`.
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<PresignedUpload, StorageError>;

    /// Check whether an object exists.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Public URL an object is served from.
    fn public_url(&self, key: &str) -> String;
}

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::error::StorageError;
use super::traits::{ObjectStore, PresignedUpload};

/// In-process object store.
///
/// Presigned URLs are not reachable over HTTP; uploads are simulated with
/// [`MemoryObjectStore::put`]. Used for local development and tests.
pub struct MemoryObjectStore {
    base_url: String,
    objects: DashMap<String, StoredObject>,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub content_type: String,
    pub data: Vec<u8>,
}

impl MemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: DashMap::new(),
        }
    }

    /// Store an object directly, standing in for the client's `PUT`.
    pub fn put(&self, key: &str, content_type: &str, data: Vec<u8>) {
        self.objects.insert(
            key.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                data,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.get(key).map(|o| o.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<PresignedUpload, StorageError> {
        let expires_at = Utc::now().timestamp() + expires_in.as_secs() as i64;
        Ok(PresignedUpload {
            key: key.to_string(),
            upload_url: format!(
                "{}/{}?content-type={}&expires={}",
                self.base_url, key, content_type, expires_at
            ),
            public_url: self.public_url(key),
            expires_in: expires_in.as_secs(),
        })
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects.remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

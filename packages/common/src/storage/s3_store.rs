use std::time::Duration;

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};
use tracing::debug;

use super::error::StorageError;
use super::traits::{ObjectStore, PresignedUpload};
use crate::config::StorageConfig;

/// S3-compatible object store (AWS, MinIO, R2, ...).
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
    public_base_url: String,
}

impl S3ObjectStore {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let region = match config.endpoint.as_deref() {
            Some(endpoint) if !endpoint.is_empty() => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.to_string(),
            },
            _ => config
                .region
                .parse()
                .map_err(|e| StorageError::Backend(format!("invalid region: {e}")))?,
        };

        let credentials = Credentials::new(
            config.access_key.as_deref(),
            config.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("invalid credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<PresignedUpload, StorageError> {
        let secs = u32::try_from(expires_in.as_secs())
            .map_err(|_| StorageError::Rejected("expiry too long".into()))?;
        let upload_url = self.bucket.presign_put(key, secs, None, None).await?;

        debug!(key, content_type, expires_in = secs, "Presigned upload URL");

        Ok(PresignedUpload {
            key: key.to_string(),
            upload_url,
            public_url: self.public_url(key),
            expires_in: expires_in.as_secs(),
        })
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.bucket.head_object(key).await {
            Ok((_, status)) => Ok(status == 200),
            Err(S3Error::HttpFailWithBody(404, _)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self.bucket.delete_object(key).await {
            Ok(_) | Err(S3Error::HttpFailWithBody(404, _)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

use serde::Deserialize;

/// Which object storage backend to use.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process store, for development and tests.
    Memory,
    /// S3 or an S3-compatible service.
    S3,
}

/// Object storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Backend selection. Default: memory.
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// Bucket name. Default: "lules-market".
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Region name. Default: "us-east-1".
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible services.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Base URL objects are publicly served from.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Use path-style addressing (required by MinIO). Default: true.
    #[serde(default = "default_path_style")]
    pub path_style: bool,
    /// Maximum accepted upload size in bytes. Default: 10 MiB.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,
    /// Lifetime of presigned upload URLs in seconds. Default: 600.
    #[serde(default = "default_presign_expiry_secs")]
    pub presign_expiry_secs: u64,
}

fn default_backend() -> StorageBackend {
    StorageBackend::Memory
}
fn default_bucket() -> String {
    "lules-market".into()
}
fn default_region() -> String {
    "us-east-1".into()
}
fn default_public_base_url() -> String {
    "http://localhost:9000/lules-market".into()
}
fn default_path_style() -> bool {
    true
}
fn default_max_upload_size() -> u64 {
    10 * 1024 * 1024
}
fn default_presign_expiry_secs() -> u64 {
    600
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            bucket: default_bucket(),
            region: default_region(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            public_base_url: default_public_base_url(),
            path_style: default_path_style(),
            max_upload_size: default_max_upload_size(),
            presign_expiry_secs: default_presign_expiry_secs(),
        }
    }
}

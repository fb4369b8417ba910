mod error;
mod traits;

pub mod key;
pub mod memory;
#[cfg(feature = "object-storage")]
pub mod s3_store;

pub use error::StorageError;
pub use traits::{ObjectStore, PresignedUpload};

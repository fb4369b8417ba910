pub mod config;
pub mod image_owner;
pub mod payment_status;
pub mod permission;
pub mod plan_tier;
pub mod storage;

pub use config::{StorageBackend, StorageConfig};
pub use image_owner::ImageOwner;
pub use payment_status::PaymentStatus;
pub use plan_tier::PlanTier;

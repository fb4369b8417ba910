use chrono::{DateTime, Utc};
use lules_common::ImageOwner;
use serde::{Deserialize, Serialize};

use crate::entity::image;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct PresignRequest {
    #[schema(example = "vidriera.jpg")]
    pub filename: String,
    #[schema(example = "image/jpeg")]
    pub content_type: String,
    /// Size in bytes of the file to be uploaded.
    #[schema(example = 245760)]
    pub size: u64,
}

pub fn validate_presign(payload: &PresignRequest) -> Result<(), AppError> {
    if payload.filename.trim().is_empty() || payload.filename.chars().count() > 255 {
        return Err(AppError::Validation(
            "El nombre del archivo debe tener entre 1 y 255 caracteres".into(),
        ));
    }
    Ok(())
}

/// Attach an uploaded object to a product or a business slot.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterImageRequest {
    /// Key returned by the presign call.
    #[schema(example = "uploads/42/0190f5c4-7d1e-7aa0-9e1d-3c1c2b1a0f00.jpg")]
    pub key: String,
    pub owner: ImageOwner,
    /// Product id for `product`, business id for logo/cover.
    #[schema(example = 12)]
    pub owner_id: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, utoipa::ToSchema)]
pub struct ImageResponse {
    pub id: i32,
    pub key: String,
    pub url: String,
    pub owner_type: ImageOwner,
    pub owner_id: i32,
    pub created_at: DateTime<Utc>,
}

impl From<image::Model> for ImageResponse {
    fn from(m: image::Model) -> Self {
        Self {
            id: m.id,
            key: m.key,
            url: m.url,
            owner_type: m.owner_type,
            owner_id: m.owner_id,
            created_at: m.created_at,
        }
    }
}

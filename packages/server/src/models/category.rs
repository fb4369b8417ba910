use serde::{Deserialize, Serialize};

use crate::entity::category;
use crate::error::AppError;

use super::shared::validate_text;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCategoryRequest {
    /// Display name (1-80 characters). The slug is derived from it.
    #[schema(example = "Panaderías")]
    pub name: String,
}

pub fn validate_create_category(payload: &CreateCategoryRequest) -> Result<(), AppError> {
    validate_text(&payload.name, "nombre", 80)
}

#[derive(Serialize, Deserialize, Clone, Debug, utoipa::ToSchema)]
pub struct CategoryResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Panaderías")]
    pub name: String,
    #[schema(example = "panaderias")]
    pub slug: String,
}

impl From<category::Model> for CategoryResponse {
    fn from(m: category::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            slug: m.slug,
        }
    }
}

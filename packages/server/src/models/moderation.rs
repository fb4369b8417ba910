use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::error::AppError;

use super::shared::{Pagination, validate_optional_text};

/// Body of a ban request. Send `{}` when no reason is given.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct BanRequest {
    #[serde(default)]
    #[schema(example = "Publicaciones engañosas")]
    pub reason: Option<String>,
}

pub fn validate_ban_request(payload: &BanRequest) -> Result<(), AppError> {
    validate_optional_text(payload.reason.as_deref(), "motivo", 500)
}

/// Outcome of a ban or unban.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ModerationResponse {
    #[schema(example = "El negocio fue baneado correctamente")]
    pub message: String,
    pub target_id: i32,
    pub is_banned: bool,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct BannedUserResponse {
    pub user_id: i32,
    pub email: String,
    pub name: String,
    pub banned_by_id: i32,
    pub reason: Option<String>,
    pub banned_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct BannedBusinessResponse {
    pub business_id: i32,
    pub name: String,
    pub slug: String,
    pub banned_by_id: i32,
    pub reason: Option<String>,
    pub banned_at: DateTime<Utc>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BannedListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct BannedUserListResponse {
    pub data: Vec<BannedUserResponse>,
    pub pagination: Pagination,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct BannedBusinessListResponse {
    pub data: Vec<BannedBusinessResponse>,
    pub pagination: Pagination,
}

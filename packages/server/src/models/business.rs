use chrono::{DateTime, Utc};
use lules_common::PlanTier;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::entity::business;
use crate::error::AppError;

use super::plan::PlanResponse;
use super::product::ProductListItem;
use super::shared::{Pagination, double_option, validate_optional_text, validate_text};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateBusinessRequest {
    #[schema(example = "Panadería Doña Rosa")]
    pub name: String,
    #[schema(example = "Pan casero y facturas todos los días.")]
    pub description: String,
    #[schema(example = 1)]
    pub category_id: i32,
    #[schema(example = "+54 381 555-1234")]
    pub phone: Option<String>,
    #[schema(example = "rosa@panaderia.com")]
    pub email: Option<String>,
    #[schema(example = "Av. Aconquija 1200, Lules")]
    pub address: Option<String>,
    pub website: Option<String>,
}

pub fn validate_create_business(payload: &CreateBusinessRequest) -> Result<(), AppError> {
    validate_text(&payload.name, "nombre", 120)?;
    validate_optional_text(Some(&payload.description), "descripción", 5000)?;
    validate_contact(
        payload.phone.as_deref(),
        payload.email.as_deref(),
        payload.address.as_deref(),
        payload.website.as_deref(),
    )
}

fn validate_contact(
    phone: Option<&str>,
    email: Option<&str>,
    address: Option<&str>,
    website: Option<&str>,
) -> Result<(), AppError> {
    validate_optional_text(phone, "teléfono", 40)?;
    validate_optional_text(email, "correo", 254)?;
    validate_optional_text(address, "dirección", 300)?;
    validate_optional_text(website, "sitio web", 300)
}

/// PATCH body; absent fields are left unchanged, `null` clears nullable fields.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateBusinessRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub website: Option<Option<String>>,
    /// Owners may pause their storefront.
    pub is_active: Option<bool>,
}

pub fn validate_update_business(payload: &UpdateBusinessRequest) -> Result<(), AppError> {
    if let Some(ref name) = payload.name {
        validate_text(name, "nombre", 120)?;
    }
    validate_optional_text(payload.description.as_deref(), "descripción", 5000)?;
    validate_contact(
        payload.phone.clone().flatten().as_deref(),
        payload.email.clone().flatten().as_deref(),
        payload.address.clone().flatten().as_deref(),
        payload.website.clone().flatten().as_deref(),
    )
}

#[derive(Serialize, Deserialize, Clone, Debug, utoipa::ToSchema)]
pub struct BusinessResponse {
    #[schema(example = 3)]
    pub id: i32,
    #[schema(example = "Panadería Doña Rosa")]
    pub name: String,
    #[schema(example = "panaderia-dona-rosa")]
    pub slug: String,
    pub description: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub category_id: i32,
    pub owner_id: i32,
    pub logo_url: Option<String>,
    pub cover_url: Option<String>,
    pub is_active: bool,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<business::Model> for BusinessResponse {
    fn from(m: business::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            slug: m.slug,
            description: m.description,
            phone: m.phone,
            email: m.email,
            address: m.address,
            website: m.website,
            category_id: m.category_id,
            owner_id: m.owner_id,
            logo_url: m.logo_url,
            cover_url: m.cover_url,
            is_active: m.is_active,
            is_banned: m.is_banned,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Public storefront: the business, its effective tier and its visible products.
#[derive(Serialize, Deserialize, Clone, Debug, utoipa::ToSchema)]
pub struct BusinessDetailResponse {
    pub business: BusinessResponse,
    pub tier: PlanTier,
    pub products: Vec<ProductListItem>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BusinessListQuery {
    /// Page number (default 1).
    pub page: Option<u64>,
    /// Items per page (default 20, max 100).
    pub per_page: Option<u64>,
    /// Case-insensitive search on the business name.
    pub search: Option<String>,
    pub category_id: Option<i32>,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct BusinessListResponse {
    pub data: Vec<BusinessResponse>,
    pub pagination: Pagination,
}

/// Usage counters of the owner's current plan.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct PlanUsage {
    pub products_used: i32,
    pub images_used: i32,
    pub is_trial: bool,
    /// `null` for plans without expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Owner dashboard view of their own business.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct MyBusinessResponse {
    pub business: BusinessResponse,
    /// Effective plan (FREE when the assigned plan lapsed).
    pub plan: PlanResponse,
    pub usage: PlanUsage,
}

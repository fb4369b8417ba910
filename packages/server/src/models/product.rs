use chrono::{DateTime, Utc};
use lules_common::PlanTier;
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::entity::product;
use crate::error::AppError;

use super::image::ImageResponse;
use super::shared::{Pagination, validate_optional_text, validate_text};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateProductRequest {
    #[schema(example = "Docena de facturas")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Price in cents.
    #[schema(example = 350000)]
    pub price_cents: i64,
    #[schema(example = 1)]
    pub category_id: i32,
    /// Highlighted listing. Requires a paid plan.
    #[serde(default)]
    pub featured: bool,
    /// Defaults to true.
    pub active: Option<bool>,
}

pub fn validate_create_product(payload: &CreateProductRequest) -> Result<(), AppError> {
    validate_text(&payload.name, "nombre", 150)?;
    validate_optional_text(Some(&payload.description), "descripción", 5000)?;
    validate_price(payload.price_cents)
}

fn validate_price(price_cents: i64) -> Result<(), AppError> {
    if price_cents < 0 {
        return Err(AppError::Validation("El precio no puede ser negativo".into()));
    }
    Ok(())
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub category_id: Option<i32>,
    pub featured: Option<bool>,
    pub active: Option<bool>,
}

pub fn validate_update_product(payload: &UpdateProductRequest) -> Result<(), AppError> {
    if let Some(ref name) = payload.name {
        validate_text(name, "nombre", 150)?;
    }
    validate_optional_text(payload.description.as_deref(), "descripción", 5000)?;
    if let Some(price) = payload.price_cents {
        validate_price(price)?;
    }
    Ok(())
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProductResponse {
    #[schema(example = 12)]
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub business_id: i32,
    pub category_id: i32,
    pub active: bool,
    pub featured: bool,
    pub is_banned: bool,
    pub images: Vec<ImageResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductResponse {
    pub fn new(m: product::Model, images: Vec<ImageResponse>) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            price_cents: m.price_cents,
            business_id: m.business_id,
            category_id: m.category_id,
            active: m.active,
            featured: m.featured,
            is_banned: m.is_banned,
            images,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Summary row for product lists (no description, no images).
#[derive(Serialize, Deserialize, Clone, Debug, FromQueryResult, utoipa::ToSchema)]
pub struct ProductListItem {
    pub id: i32,
    pub name: String,
    pub price_cents: i64,
    pub business_id: i32,
    pub category_id: i32,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Case-insensitive search on the product name.
    pub search: Option<String>,
    pub category_id: Option<i32>,
    pub business_id: Option<i32>,
    pub featured: Option<bool>,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProductListResponse {
    pub data: Vec<ProductListItem>,
    pub pagination: Pagination,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecentProductsQuery {
    /// Number of products (default 12, max 50).
    pub limit: Option<u64>,
}

/// A storefront product with the tier of the business selling it.
#[derive(Serialize, Deserialize, Clone, Debug, utoipa::ToSchema)]
pub struct RecentProduct {
    pub id: i32,
    pub name: String,
    pub price_cents: i64,
    pub featured: bool,
    pub business_id: i32,
    pub business_name: String,
    pub business_slug: String,
    pub tier: PlanTier,
    pub created_at: DateTime<Utc>,
}

/// Order by tier priority (PREMIUM first), then newest first.
pub fn rank_by_plan_priority(products: &mut [RecentProduct]) {
    products.sort_by(|a, b| {
        b.tier
            .priority()
            .cmp(&a.tier.priority())
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    });
}

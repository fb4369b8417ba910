use chrono::{DateTime, Utc};
use lules_common::PlanTier;
use serde::{Deserialize, Serialize};

use crate::entity::{plan, trial};
use crate::error::AppError;

/// Longest trial an admin may grant, in days.
pub const MAX_TRIAL_DAYS: i64 = 90;

#[derive(Serialize, Deserialize, Clone, Debug, utoipa::ToSchema)]
pub struct PlanResponse {
    pub id: i32,
    pub tier: PlanTier,
    #[schema(example = "Básico")]
    pub name: String,
    pub description: String,
    /// Monthly price in cents.
    #[schema(example = 990000)]
    pub price_cents: i64,
    #[schema(example = 50)]
    pub max_products: i32,
    #[schema(example = 3)]
    pub max_images_per_product: i32,
    pub has_statistics: bool,
}

impl From<plan::Model> for PlanResponse {
    fn from(m: plan::Model) -> Self {
        Self {
            id: m.id,
            tier: m.tier,
            name: m.name,
            description: m.description,
            price_cents: m.price_cents,
            max_products: m.max_products,
            max_images_per_product: m.max_images_per_product,
            has_statistics: m.has_statistics,
        }
    }
}

/// One row of a plan comparison table.
#[derive(Serialize, Deserialize, Debug, PartialEq, utoipa::ToSchema)]
pub struct FeatureComparison {
    #[schema(example = "max_products")]
    pub feature: String,
    #[schema(example = "10")]
    pub current: String,
    #[schema(example = "50")]
    pub target: String,
    /// The target plan offers more of this feature.
    pub improved: bool,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct PlanComparison {
    pub current: PlanResponse,
    pub target: PlanResponse,
    pub is_upgrade: bool,
    pub features: Vec<FeatureComparison>,
}

/// Compare two plans feature by feature.
pub fn compare_plans(current: PlanResponse, target: PlanResponse) -> PlanComparison {
    let row = |feature: &str, current: String, target: String, improved: bool| FeatureComparison {
        feature: feature.to_string(),
        current,
        target,
        improved,
    };

    let features = vec![
        row(
            "max_products",
            current.max_products.to_string(),
            target.max_products.to_string(),
            target.max_products > current.max_products,
        ),
        row(
            "max_images_per_product",
            current.max_images_per_product.to_string(),
            target.max_images_per_product.to_string(),
            target.max_images_per_product > current.max_images_per_product,
        ),
        row(
            "has_statistics",
            current.has_statistics.to_string(),
            target.has_statistics.to_string(),
            target.has_statistics && !current.has_statistics,
        ),
        row(
            "featured_products",
            current.tier.is_paid().to_string(),
            target.tier.is_paid().to_string(),
            target.tier.is_paid() && !current.tier.is_paid(),
        ),
    ];

    PlanComparison {
        is_upgrade: target.tier.priority() > current.tier.priority(),
        features,
        current,
        target,
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct GrantTrialRequest {
    /// Paid tier to grant.
    pub tier: PlanTier,
    /// Trial length in days (1-90).
    #[schema(example = 14)]
    pub days: i64,
}

pub fn validate_grant_trial(payload: &GrantTrialRequest) -> Result<(), AppError> {
    if !payload.tier.is_paid() {
        return Err(AppError::Validation(
            "La prueba solo puede otorgarse para un plan pago".into(),
        ));
    }
    if !(1..=MAX_TRIAL_DAYS).contains(&payload.days) {
        return Err(AppError::Validation(format!(
            "La duración de la prueba debe estar entre 1 y {MAX_TRIAL_DAYS} días"
        )));
    }
    Ok(())
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct TrialResponse {
    pub id: i32,
    pub business_id: i32,
    pub tier: PlanTier,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
}

impl TrialResponse {
    pub fn new(m: trial::Model, tier: PlanTier) -> Self {
        Self {
            id: m.id,
            business_id: m.business_id,
            tier,
            starts_at: m.starts_at,
            expires_at: m.expires_at,
            is_active: m.is_active,
        }
    }
}

use chrono::{DateTime, Utc};
use lules_common::{PaymentStatus, PlanTier};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::entity::payment;

use super::shared::Pagination;

/// Days a plan stays active after an approved payment.
pub const PAID_PLAN_DAYS: i64 = 30;

/// Currency of every plan price.
pub const CURRENCY: &str = "ARS";

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CheckoutRequest {
    /// Paid tier to subscribe to.
    pub tier: PlanTier,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct PaymentResponse {
    pub id: i32,
    pub business_id: i32,
    pub tier: PlanTier,
    #[schema(example = 990000)]
    pub amount_cents: i64,
    #[schema(example = "ARS")]
    pub currency: String,
    pub status: PaymentStatus,
    pub reviewed_by_id: Option<i32>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<payment::Model> for PaymentResponse {
    fn from(m: payment::Model) -> Self {
        Self {
            id: m.id,
            business_id: m.business_id,
            tier: m.tier,
            amount_cents: m.amount_cents,
            currency: m.currency,
            status: m.status,
            reviewed_by_id: m.reviewed_by_id,
            reviewed_at: m.reviewed_at,
            created_at: m.created_at,
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaymentListQuery {
    /// Filter by status: `pending`, `approved` or `rejected`.
    pub status: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct PaymentListResponse {
    pub data: Vec<PaymentResponse>,
    pub pagination: Pagination,
}

use lules_common::{PaymentStatus, PlanTier};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub business_id: i32,
    #[sea_orm(belongs_to, from = "business_id", to = "id")]
    pub business: HasOne<super::business::Entity>,

    pub plan_id: i32,
    #[sea_orm(belongs_to, from = "plan_id", to = "id")]
    pub plan: HasOne<super::plan::Entity>,
    /// Tier at checkout time, kept for display.
    pub tier: PlanTier,

    pub amount_cents: i64,
    pub currency: String,
    #[sea_orm(indexed)]
    pub status: PaymentStatus,

    pub reviewed_by_id: Option<i32>,
    pub reviewed_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

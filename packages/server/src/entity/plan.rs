use lules_common::PlanTier;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "plan")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub tier: PlanTier,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// Monthly price in cents. Zero for FREE.
    pub price_cents: i64,

    pub max_products: i32,
    pub max_images_per_product: i32,
    pub has_statistics: bool,

    #[sea_orm(has_many)]
    pub current_plans: HasMany<super::current_plan::Entity>,
    #[sea_orm(has_many)]
    pub trials: HasMany<super::trial::Entity>,
    #[sea_orm(has_many)]
    pub payments: HasMany<super::payment::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

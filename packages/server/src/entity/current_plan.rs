use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The plan assignment and usage counters of one business.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "current_plan")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub business_id: i32,
    #[sea_orm(belongs_to, from = "business_id", to = "id")]
    pub business: HasOne<super::business::Entity>,

    pub plan_id: i32,
    #[sea_orm(belongs_to, from = "plan_id", to = "id")]
    pub plan: HasOne<super::plan::Entity>,

    #[sea_orm(indexed)]
    pub is_active: bool,
    /// NULL for plans that never expire (FREE).
    #[sea_orm(indexed)]
    pub expires_at: Option<DateTimeUtc>,
    #[sea_orm(default_value = false)]
    pub is_trial: bool,

    #[sea_orm(default_value = 0)]
    pub products_used: i32,
    #[sea_orm(default_value = 0)]
    pub images_used: i32,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trial")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// One trial per business.
    #[sea_orm(unique)]
    pub business_id: i32,
    #[sea_orm(belongs_to, from = "business_id", to = "id")]
    pub business: HasOne<super::business::Entity>,

    pub plan_id: i32,
    #[sea_orm(belongs_to, from = "plan_id", to = "id")]
    pub plan: HasOne<super::plan::Entity>,

    pub granted_by_id: i32,
    pub starts_at: DateTimeUtc,
    pub expires_at: DateTimeUtc,
    pub is_active: bool,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Audit record pairing a banned business with the admin who banned it.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "banned_business")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub business_id: i32,
    #[sea_orm(belongs_to, from = "business_id", to = "id")]
    pub business: HasOne<super::business::Entity>,

    pub banned_by_id: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub reason: Option<String>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

use lules_common::ImageOwner;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "image")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Object storage key.
    #[sea_orm(unique)]
    pub key: String,
    pub url: String,

    pub owner_type: ImageOwner,
    /// Product or business id, depending on `owner_type`.
    #[sea_orm(indexed)]
    pub owner_id: i32,

    /// User who uploaded the object.
    pub uploaded_by_id: i32,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Audit record pairing a banned user with the admin who banned them.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "banned_user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    /// Admin user id. Not a declared relation: `user` already points at the user table.
    pub banned_by_id: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub reason: Option<String>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

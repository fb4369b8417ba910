//! Ban and unban of users and businesses.
//!
//! Each operation re-loads the acting admin and its permissions from the
//! database, checks the target state, then writes the ban record and the
//! target's `is_banned` flag in a single transaction.

use chrono::Utc;
use lules_common::permission;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use serde_json::json;
use tracing::{info, warn};

use crate::cache::tags;
use crate::entity::{banned_business, banned_user, business, role_permission, user};
use crate::error::AppError;
use crate::mail::{send_best_effort, templates};
use crate::services::audit;
use crate::state::AppState;

/// Load `user_id` and make sure its role currently grants `required`.
pub async fn load_admin<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    required: &str,
) -> Result<user::Model, AppError> {
    let admin = user::Entity::find_by_id(user_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Administrador no encontrado".into()))?;

    let permissions: Vec<String> = role_permission::Entity::find()
        .filter(role_permission::Column::Role.eq(&admin.role))
        .all(conn)
        .await?
        .into_iter()
        .map(|rp| rp.permission)
        .collect();

    if admin.is_banned || !permission::grants(&permissions, required) {
        warn!(user_id, required, "Admin action denied");
        return Err(AppError::PermissionDenied);
    }

    Ok(admin)
}

pub struct ModerationService<'a> {
    state: &'a AppState,
}

impl<'a> ModerationService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn ban_business(
        &self,
        actor_id: i32,
        business_id: i32,
        reason: Option<String>,
    ) -> Result<business::Model, AppError> {
        let db = &self.state.db;
        let admin = load_admin(db, actor_id, permission::BAN_USERS).await?;
        let target = find_business(db, business_id).await?;

        if target.owner_id == admin.id {
            return Err(AppError::Validation(
                "No puedes banear tu propio negocio".into(),
            ));
        }
        if target.is_banned {
            return Err(AppError::Conflict("El negocio ya está baneado".into()));
        }

        let now = Utc::now();
        let txn = db.begin().await?;
        banned_business::Entity::insert(banned_business::ActiveModel {
            business_id: Set(target.id),
            banned_by_id: Set(admin.id),
            reason: Set(reason.clone()),
            created_at: Set(now),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(banned_business::Column::BusinessId)
                .update_columns([
                    banned_business::Column::BannedById,
                    banned_business::Column::Reason,
                    banned_business::Column::CreatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;
        set_business_banned(&txn, target.id, true).await?;
        txn.commit().await?;

        info!(business_id, admin_id = admin.id, "Business banned");
        self.invalidate_business(&target);
        audit::record_best_effort(
            db,
            audit::BUSINESS_BANNED,
            "business",
            target.id,
            Some(admin.id),
            json!({ "reason": reason }),
        )
        .await;

        match user::Entity::find_by_id(target.owner_id).one(db).await {
            Ok(Some(owner)) => {
                send_best_effort(
                    self.state.mailer.as_ref(),
                    templates::business_banned(&owner.email, &target.name, reason.as_deref()),
                )
                .await;
            }
            Ok(None) => {}
            Err(e) => warn!(business_id, error = %e, "Could not load owner for ban email"),
        }

        Ok(business::Model {
            is_banned: true,
            updated_at: now,
            ..target
        })
    }

    pub async fn unban_business(
        &self,
        actor_id: i32,
        business_id: i32,
    ) -> Result<business::Model, AppError> {
        let db = &self.state.db;
        let admin = load_admin(db, actor_id, permission::BAN_USERS).await?;
        let target = find_business(db, business_id).await?;

        if target.owner_id == admin.id {
            return Err(AppError::Validation(
                "No puedes desbanear tu propio negocio".into(),
            ));
        }
        if !target.is_banned {
            return Err(AppError::Conflict("El negocio no está baneado".into()));
        }

        let now = Utc::now();
        let txn = db.begin().await?;
        banned_business::Entity::delete_many()
            .filter(banned_business::Column::BusinessId.eq(target.id))
            .exec(&txn)
            .await?;
        set_business_banned(&txn, target.id, false).await?;
        txn.commit().await?;

        info!(business_id, admin_id = admin.id, "Business unbanned");
        self.invalidate_business(&target);
        audit::record_best_effort(
            db,
            audit::BUSINESS_UNBANNED,
            "business",
            target.id,
            Some(admin.id),
            json!({}),
        )
        .await;

        Ok(business::Model {
            is_banned: false,
            updated_at: now,
            ..target
        })
    }

    pub async fn ban_user(
        &self,
        actor_id: i32,
        user_id: i32,
        reason: Option<String>,
    ) -> Result<user::Model, AppError> {
        let db = &self.state.db;
        let admin = load_admin(db, actor_id, permission::BAN_USERS).await?;

        if user_id == admin.id {
            return Err(AppError::Validation("No puedes banearte a ti mismo".into()));
        }
        let target = find_user(db, user_id).await?;
        if target.is_banned {
            return Err(AppError::Conflict("El usuario ya está baneado".into()));
        }

        let now = Utc::now();
        let txn = db.begin().await?;
        banned_user::Entity::insert(banned_user::ActiveModel {
            user_id: Set(target.id),
            banned_by_id: Set(admin.id),
            reason: Set(reason.clone()),
            created_at: Set(now),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(banned_user::Column::UserId)
                .update_columns([
                    banned_user::Column::BannedById,
                    banned_user::Column::Reason,
                    banned_user::Column::CreatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;
        set_user_banned(&txn, target.id, true).await?;
        txn.commit().await?;

        info!(user_id, admin_id = admin.id, "User banned");
        self.state.cache.invalidate_tag(&tags::user(target.id));
        audit::record_best_effort(
            db,
            audit::USER_BANNED,
            "user",
            target.id,
            Some(admin.id),
            json!({ "reason": reason }),
        )
        .await;
        send_best_effort(
            self.state.mailer.as_ref(),
            templates::account_banned(&target.email, &target.name, reason.as_deref()),
        )
        .await;

        Ok(user::Model {
            is_banned: true,
            updated_at: now,
            ..target
        })
    }

    pub async fn unban_user(&self, actor_id: i32, user_id: i32) -> Result<user::Model, AppError> {
        let db = &self.state.db;
        let admin = load_admin(db, actor_id, permission::BAN_USERS).await?;

        if user_id == admin.id {
            return Err(AppError::Validation(
                "No puedes desbanearte a ti mismo".into(),
            ));
        }
        let target = find_user(db, user_id).await?;
        if !target.is_banned {
            return Err(AppError::Conflict("El usuario no está baneado".into()));
        }

        let now = Utc::now();
        let txn = db.begin().await?;
        banned_user::Entity::delete_many()
            .filter(banned_user::Column::UserId.eq(target.id))
            .exec(&txn)
            .await?;
        set_user_banned(&txn, target.id, false).await?;
        txn.commit().await?;

        info!(user_id, admin_id = admin.id, "User unbanned");
        self.state.cache.invalidate_tag(&tags::user(target.id));
        audit::record_best_effort(
            db,
            audit::USER_UNBANNED,
            "user",
            target.id,
            Some(admin.id),
            json!({}),
        )
        .await;

        Ok(user::Model {
            is_banned: false,
            updated_at: now,
            ..target
        })
    }

    fn invalidate_business(&self, target: &business::Model) {
        self.state.cache.invalidate_tags(&[
            tags::business(target.id),
            tags::BUSINESSES.to_string(),
            tags::PRODUCTS.to_string(),
        ]);
    }
}

async fn find_business<C: ConnectionTrait>(conn: &C, id: i32) -> Result<business::Model, AppError> {
    business::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Negocio no encontrado".into()))
}

async fn find_user<C: ConnectionTrait>(conn: &C, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Usuario no encontrado".into()))
}

async fn set_business_banned<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    banned: bool,
) -> Result<(), DbErr> {
    let result = business::Entity::update_many()
        .col_expr(business::Column::IsBanned, Expr::value(banned))
        .col_expr(business::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(business::Column::Id.eq(id))
        .exec(conn)
        .await?;
    if result.rows_affected != 1 {
        return Err(DbErr::RecordNotUpdated);
    }
    Ok(())
}

async fn set_user_banned<C: ConnectionTrait>(conn: &C, id: i32, banned: bool) -> Result<(), DbErr> {
    let result = user::Entity::update_many()
        .col_expr(user::Column::IsBanned, Expr::value(banned))
        .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(user::Column::Id.eq(id))
        .exec(conn)
        .await?;
    if result.rows_affected != 1 {
        return Err(DbErr::RecordNotUpdated);
    }
    Ok(())
}

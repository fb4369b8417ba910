use chrono::Utc;
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Set};

use crate::entity::audit_log;

pub const PLAN_EXPIRED: &str = "plan_expired";
pub const TRIAL_EXPIRED: &str = "trial_expired";
pub const TRIAL_GRANTED: &str = "trial_granted";
pub const PAYMENT_APPROVED: &str = "payment_approved";
pub const PAYMENT_REJECTED: &str = "payment_rejected";
pub const USER_BANNED: &str = "user_banned";
pub const USER_UNBANNED: &str = "user_unbanned";
pub const BUSINESS_BANNED: &str = "business_banned";
pub const BUSINESS_UNBANNED: &str = "business_unbanned";

/// Append one row to the audit log.
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    action: &str,
    entity_type: &str,
    entity_id: i32,
    actor_id: Option<i32>,
    details: serde_json::Value,
) -> Result<(), DbErr> {
    let model = audit_log::ActiveModel {
        action: Set(action.to_string()),
        entity_type: Set(entity_type.to_string()),
        entity_id: Set(entity_id),
        actor_id: Set(actor_id),
        details: Set(details),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    audit_log::Entity::insert(model)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// Like [`record`], but failures are only logged.
pub async fn record_best_effort<C: ConnectionTrait>(
    conn: &C,
    action: &str,
    entity_type: &str,
    entity_id: i32,
    actor_id: Option<i32>,
    details: serde_json::Value,
) {
    if let Err(e) = record(conn, action, entity_type, entity_id, actor_id, details).await {
        tracing::warn!(action, entity_type, entity_id, error = %e, "Failed to write audit log");
    }
}

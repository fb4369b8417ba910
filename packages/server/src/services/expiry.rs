//! Plan expiry job: deactivates lapsed plan assignments and trials.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sea_orm::prelude::Expr;
use sea_orm::*;
use serde_json::json;
use tracing::{error, info, warn};

use crate::cache::tags;
use crate::entity::{business, current_plan, plan, trial, user};
use crate::mail::{send_best_effort, templates};
use crate::models::cron::ExpirePlansResponse;
use crate::services::audit;
use crate::state::AppState;

/// Run the expiry job on a fixed interval as a background task.
pub async fn run_plan_expiry_scheduler(state: AppState, every: Duration) {
    info!(interval_secs = every.as_secs(), "Starting plan expiry scheduler");

    let mut interval = tokio::time::interval(every);

    loop {
        interval.tick().await;

        if let Err(e) = expire_plans(&state).await {
            error!(error = %e, "Plan expiry run failed");
        }
    }
}

/// Deactivate every active plan assignment whose expiry has passed.
///
/// Rows are handled one at a time; a failed row is logged and skipped, and a
/// failed notification never undoes the deactivation.
pub async fn expire_plans(state: &AppState) -> Result<ExpirePlansResponse, DbErr> {
    let db = &state.db;
    let now = Utc::now();

    let lapsed = current_plan::Entity::find()
        .filter(current_plan::Column::IsActive.eq(true))
        .filter(current_plan::Column::ExpiresAt.lt(now))
        .order_by_asc(current_plan::Column::ExpiresAt)
        .all(db)
        .await?;

    let mut stats = ExpirePlansResponse {
        processed: lapsed.len() as u64,
        ..Default::default()
    };

    for cp in lapsed {
        match expire_one(db, &cp, now).await {
            Ok(true) => stats.expired += 1,
            Ok(false) => continue,
            Err(e) => {
                error!(business_id = cp.business_id, error = %e, "Failed to expire plan");
                continue;
            }
        }

        state.cache.invalidate_tags(&[
            tags::business(cp.business_id),
            tags::BUSINESSES.to_string(),
            tags::PRODUCTS.to_string(),
        ]);

        match notify_owner(state, &cp).await {
            Ok(true) => {}
            Ok(false) => stats.email_failures += 1,
            Err(e) => {
                warn!(business_id = cp.business_id, error = %e, "Could not load expiry email data");
                stats.email_failures += 1;
            }
        }
    }

    let stale_trials = trial::Entity::update_many()
        .col_expr(trial::Column::IsActive, Expr::value(false))
        .filter(trial::Column::IsActive.eq(true))
        .filter(trial::Column::ExpiresAt.lt(now))
        .exec(db)
        .await?
        .rows_affected;

    info!(
        processed = stats.processed,
        expired = stats.expired,
        email_failures = stats.email_failures,
        stale_trials,
        "Plan expiry run finished"
    );

    Ok(stats)
}

/// Returns false when another run already handled the row.
async fn expire_one(
    db: &DatabaseConnection,
    cp: &current_plan::Model,
    now: DateTime<Utc>,
) -> Result<bool, DbErr> {
    let txn = db.begin().await?;

    let updated = current_plan::Entity::update_many()
        .col_expr(current_plan::Column::IsActive, Expr::value(false))
        .col_expr(current_plan::Column::UpdatedAt, Expr::value(now))
        .filter(current_plan::Column::Id.eq(cp.id))
        .filter(current_plan::Column::IsActive.eq(true))
        .filter(current_plan::Column::ExpiresAt.lt(now))
        .exec(&txn)
        .await?;
    if updated.rows_affected == 0 {
        return Ok(false);
    }

    if cp.is_trial {
        trial::Entity::update_many()
            .col_expr(trial::Column::IsActive, Expr::value(false))
            .filter(trial::Column::BusinessId.eq(cp.business_id))
            .filter(trial::Column::IsActive.eq(true))
            .exec(&txn)
            .await?;
    }

    audit::record(
        &txn,
        if cp.is_trial {
            audit::TRIAL_EXPIRED
        } else {
            audit::PLAN_EXPIRED
        },
        "business",
        cp.business_id,
        None,
        json!({ "plan_id": cp.plan_id, "expires_at": cp.expires_at }),
    )
    .await?;

    txn.commit().await?;
    info!(business_id = cp.business_id, plan_id = cp.plan_id, "Plan expired");
    Ok(true)
}

/// Returns whether the email went out.
async fn notify_owner(state: &AppState, cp: &current_plan::Model) -> Result<bool, DbErr> {
    let Some(biz) = business::Entity::find_by_id(cp.business_id)
        .one(&state.db)
        .await?
    else {
        return Ok(false);
    };
    let Some(owner) = user::Entity::find_by_id(biz.owner_id).one(&state.db).await? else {
        return Ok(false);
    };
    let Some(expired_plan) = plan::Entity::find_by_id(cp.plan_id).one(&state.db).await? else {
        return Ok(false);
    };

    Ok(send_best_effort(
        state.mailer.as_ref(),
        templates::plan_expired(&owner.email, &biz.name, expired_plan.tier),
    )
    .await)
}

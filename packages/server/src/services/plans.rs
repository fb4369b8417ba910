//! Effective plan resolution and usage bookkeeping.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use lules_common::PlanTier;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tracing::debug;

use crate::entity::{current_plan, plan};
use crate::error::AppError;

/// The plan that currently bounds a business, plus its assignment row if any.
#[derive(Debug, Clone)]
pub struct EffectivePlan {
    pub plan: plan::Model,
    pub current: Option<current_plan::Model>,
}

/// An assignment counts while it is active and either never expires or expires in the future.
pub fn is_effective(is_active: bool, expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    is_active && expires_at.is_none_or(|at| at > now)
}

pub async fn find_plan_by_tier<C: ConnectionTrait>(
    conn: &C,
    tier: PlanTier,
) -> Result<plan::Model, AppError> {
    plan::Entity::find()
        .filter(plan::Column::Tier.eq(tier))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::Internal(format!("plan {tier} is not seeded")))
}

/// Active assignment if it is still valid, otherwise the FREE plan.
pub async fn resolve_effective_plan<C: ConnectionTrait>(
    conn: &C,
    business_id: i32,
) -> Result<EffectivePlan, AppError> {
    let current = current_plan::Entity::find()
        .filter(current_plan::Column::BusinessId.eq(business_id))
        .one(conn)
        .await?;

    let now = Utc::now();
    let effective_plan_id = current
        .as_ref()
        .filter(|cp| is_effective(cp.is_active, cp.expires_at, now))
        .map(|cp| cp.plan_id);

    if let Some(plan_id) = effective_plan_id
        && let Some(plan) = plan::Entity::find_by_id(plan_id).one(conn).await?
    {
        debug!(business_id, tier = %plan.tier, "Using assigned plan");
        return Ok(EffectivePlan { plan, current });
    }

    debug!(business_id, "Falling back to FREE plan");
    let plan = find_plan_by_tier(conn, PlanTier::Free).await?;
    Ok(EffectivePlan { plan, current })
}

/// Effective tier of each business in `business_ids`; businesses without a valid plan map to FREE.
pub async fn effective_tiers<C: ConnectionTrait>(
    conn: &C,
    business_ids: &[i32],
) -> Result<HashMap<i32, PlanTier>, AppError> {
    if business_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let tiers_by_plan: HashMap<i32, PlanTier> = plan::Entity::find()
        .all(conn)
        .await?
        .into_iter()
        .map(|p| (p.id, p.tier))
        .collect();

    let now = Utc::now();
    let mut tiers: HashMap<i32, PlanTier> = business_ids
        .iter()
        .map(|&id| (id, PlanTier::Free))
        .collect();

    let assignments = current_plan::Entity::find()
        .filter(current_plan::Column::BusinessId.is_in(business_ids.iter().copied()))
        .all(conn)
        .await?;

    for cp in assignments {
        if is_effective(cp.is_active, cp.expires_at, now)
            && let Some(&tier) = tiers_by_plan.get(&cp.plan_id)
        {
            tiers.insert(cp.business_id, tier);
        }
    }

    Ok(tiers)
}

/// Point a business at `plan_id`, creating its assignment row if missing.
pub async fn assign_plan<C: ConnectionTrait>(
    conn: &C,
    business_id: i32,
    plan_id: i32,
    expires_at: Option<DateTime<Utc>>,
    is_trial: bool,
) -> Result<(), DbErr> {
    let now = Utc::now();
    let model = current_plan::ActiveModel {
        business_id: Set(business_id),
        plan_id: Set(plan_id),
        is_active: Set(true),
        is_trial: Set(is_trial),
        expires_at: Set(expires_at),
        products_used: Set(0),
        images_used: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    current_plan::Entity::insert(model)
        .on_conflict(
            OnConflict::column(current_plan::Column::BusinessId)
                .update_columns([
                    current_plan::Column::PlanId,
                    current_plan::Column::IsActive,
                    current_plan::Column::IsTrial,
                    current_plan::Column::ExpiresAt,
                    current_plan::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// Shift the usage counters of a business by the given deltas, never below zero.
pub async fn adjust_usage<C: ConnectionTrait>(
    conn: &C,
    business_id: i32,
    products_delta: i32,
    images_delta: i32,
) -> Result<(), DbErr> {
    if products_delta == 0 && images_delta == 0 {
        return Ok(());
    }

    current_plan::Entity::update_many()
        .col_expr(
            current_plan::Column::ProductsUsed,
            Expr::cust_with_values("GREATEST(products_used + ?, 0)", [products_delta]),
        )
        .col_expr(
            current_plan::Column::ImagesUsed,
            Expr::cust_with_values("GREATEST(images_used + ?, 0)", [images_delta]),
        )
        .col_expr(current_plan::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(current_plan::Column::BusinessId.eq(business_id))
        .exec(conn)
        .await?;
    Ok(())
}

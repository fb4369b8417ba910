use axum::Json;
use axum::extract::{Path, State};
use lules_common::PlanTier;
use sea_orm::*;
use tracing::instrument;

use crate::cache::{CacheLife, tags};
use crate::entity::plan;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::handlers::business::owned_business;
use crate::models::plan::{PlanComparison, PlanResponse, compare_plans};
use crate::services::plans;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Plans",
    operation_id = "listPlans",
    summary = "List subscription plans",
    description = "Returns the FREE, BASIC and PREMIUM plans with their limits, cheapest first. Public and cached.",
    responses(
        (status = 200, description = "Plans", body = Vec<PlanResponse>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_plans(State(state): State<AppState>) -> Result<Json<Vec<PlanResponse>>, AppError> {
    let db = state.db.clone();
    let plans = state
        .cache
        .get_or_load(
            "plans:all",
            &[tags::PLANS.to_string()],
            CacheLife::Hours,
            || async move {
                let mut rows = plan::Entity::find().all(&db).await?;
                rows.sort_by_key(|p| p.tier.priority());
                Ok::<_, AppError>(rows.into_iter().map(PlanResponse::from).collect::<Vec<_>>())
            },
        )
        .await?;

    Ok(Json(plans))
}

#[utoipa::path(
    get,
    path = "/compare/{tier}",
    tag = "Plans",
    operation_id = "comparePlans",
    summary = "Compare the caller's plan with another tier",
    description = "Compares the effective plan of the caller's business with `tier`, feature by feature.",
    params(("tier" = PlanTier, Path, description = "Target tier: FREE, BASIC or PREMIUM")),
    responses(
        (status = 200, description = "Comparison", body = PlanComparison),
        (status = 400, description = "Unknown tier (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Caller has no business (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, tier = %tier))]
pub async fn compare(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(tier): Path<String>,
) -> Result<Json<PlanComparison>, AppError> {
    let tier = tier
        .parse::<PlanTier>()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let owner_business = owned_business(&state.db, auth_user.user_id).await?;
    let effective = plans::resolve_effective_plan(&state.db, owner_business.id).await?;
    let target = plans::find_plan_by_tier(&state.db, tier).await?;

    Ok(Json(compare_plans(effective.plan.into(), target.into())))
}

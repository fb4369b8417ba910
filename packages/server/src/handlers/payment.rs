use axum::extract::State;
use axum::{Json, http::StatusCode, response::IntoResponse};
use lules_common::PaymentStatus;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::payment;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::auth::require_active_user;
use crate::handlers::business::{owned_active_business, owned_business};
use crate::models::payment::{CURRENCY, CheckoutRequest, PaymentResponse};
use crate::services::plans;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/",
    tag = "Payments",
    operation_id = "checkout",
    summary = "Start a plan purchase",
    description = "Creates a pending payment for the caller's business at the plan's price. An administrator approves or rejects it. FREE cannot be purchased and only one pending payment per tier is allowed.",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Pending payment created", body = PaymentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Caller has no business (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Payment already pending (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, tier = %payload.tier))]
pub async fn checkout(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CheckoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !payload.tier.is_paid() {
        return Err(AppError::Validation("El plan FREE no requiere pago".into()));
    }
    require_active_user(&state.db, auth_user.user_id).await?;
    let owner_business = owned_active_business(&state.db, auth_user.user_id).await?;

    let pending = payment::Entity::find()
        .filter(payment::Column::BusinessId.eq(owner_business.id))
        .filter(payment::Column::Tier.eq(payload.tier))
        .filter(payment::Column::Status.eq(PaymentStatus::Pending))
        .count(&state.db)
        .await?
        > 0;
    if pending {
        return Err(AppError::Conflict(
            "Ya tienes un pago pendiente para este plan".into(),
        ));
    }

    let target = plans::find_plan_by_tier(&state.db, payload.tier).await?;

    let now = chrono::Utc::now();
    let model = payment::ActiveModel {
        business_id: Set(owner_business.id),
        plan_id: Set(target.id),
        tier: Set(target.tier),
        amount_cents: Set(target.price_cents),
        currency: Set(CURRENCY.to_string()),
        status: Set(PaymentStatus::Pending),
        reviewed_by_id: Set(None),
        reviewed_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(payment_id = model.id, business_id = owner_business.id, "Checkout created");

    Ok((StatusCode::CREATED, Json(PaymentResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Payments",
    operation_id = "listMyPayments",
    summary = "List the caller's payments",
    description = "Payments of the caller's business, newest first.",
    responses(
        (status = 200, description = "Payments", body = Vec<PaymentResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Caller has no business (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn my_payments(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<PaymentResponse>>, AppError> {
    let owner_business = owned_business(&state.db, auth_user.user_id).await?;

    let data = payment::Entity::find()
        .filter(payment::Column::BusinessId.eq(owner_business.id))
        .order_by_desc(payment::Column::CreatedAt)
        .order_by_desc(payment::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(PaymentResponse::from)
        .collect();

    Ok(Json(data))
}

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::{Json, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use lules_common::{PaymentStatus, permission};
use sea_orm::prelude::Expr;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{banned_business, banned_user, business, payment, product, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::dashboard::*;
use crate::models::moderation::*;
use crate::models::payment::{PaymentListQuery, PaymentListResponse, PaymentResponse};
use crate::models::plan::{GrantTrialRequest, TrialResponse, validate_grant_trial};
use crate::models::shared::{Pagination, non_blank, page_params};
use crate::services::billing::BillingService;
use crate::services::moderation::ModerationService;
use crate::state::AppState;

// Moderation

#[utoipa::path(
    post,
    path = "/users/{id}/ban",
    tag = "Admin",
    operation_id = "banUser",
    summary = "Ban a user",
    description = "Records the ban and flags the user as banned in one transaction, then emails the user. Requires `BAN_USERS`. Admins cannot ban themselves.",
    params(("id" = i32, Path, description = "User ID")),
    request_body = BanRequest,
    responses(
        (status = 200, description = "User banned", body = ModerationResponse),
        (status = 400, description = "Self-ban or validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "User already banned (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(admin_id = auth_user.user_id, id))]
pub async fn ban_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<BanRequest>,
) -> Result<Json<ModerationResponse>, AppError> {
    validate_ban_request(&payload)?;
    let reason = non_blank(payload.reason);

    let target = ModerationService::new(&state)
        .ban_user(auth_user.user_id, id, reason)
        .await?;

    Ok(Json(ModerationResponse {
        message: "El usuario fue baneado correctamente".into(),
        target_id: target.id,
        is_banned: target.is_banned,
    }))
}

#[utoipa::path(
    delete,
    path = "/users/{id}/ban",
    tag = "Admin",
    operation_id = "unbanUser",
    summary = "Unban a user",
    description = "Deletes the ban record and clears the user's banned flag in one transaction. Requires `BAN_USERS`.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User unbanned", body = ModerationResponse),
        (status = 400, description = "Self-unban (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "User is not banned (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(admin_id = auth_user.user_id, id))]
pub async fn unban_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ModerationResponse>, AppError> {
    let target = ModerationService::new(&state)
        .unban_user(auth_user.user_id, id)
        .await?;

    Ok(Json(ModerationResponse {
        message: "El usuario fue desbaneado correctamente".into(),
        target_id: target.id,
        is_banned: target.is_banned,
    }))
}

#[utoipa::path(
    post,
    path = "/businesses/{id}/ban",
    tag = "Admin",
    operation_id = "banBusiness",
    summary = "Ban a business",
    description = "Records the ban and flags the business as banned in one transaction, then emails the owner. Requires `BAN_USERS`. An admin cannot ban a business they own.",
    params(("id" = i32, Path, description = "Business ID")),
    request_body = BanRequest,
    responses(
        (status = 200, description = "Business banned", body = ModerationResponse),
        (status = 400, description = "Self-ban or validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Business not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Business already banned (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(admin_id = auth_user.user_id, id))]
pub async fn ban_business(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<BanRequest>,
) -> Result<Json<ModerationResponse>, AppError> {
    validate_ban_request(&payload)?;
    let reason = non_blank(payload.reason);

    let target = ModerationService::new(&state)
        .ban_business(auth_user.user_id, id, reason)
        .await?;

    Ok(Json(ModerationResponse {
        message: "El negocio fue baneado correctamente".into(),
        target_id: target.id,
        is_banned: target.is_banned,
    }))
}

#[utoipa::path(
    delete,
    path = "/businesses/{id}/ban",
    tag = "Admin",
    operation_id = "unbanBusiness",
    summary = "Unban a business",
    description = "Deletes the ban record and clears the business's banned flag in one transaction. Requires `BAN_USERS`.",
    params(("id" = i32, Path, description = "Business ID")),
    responses(
        (status = 200, description = "Business unbanned", body = ModerationResponse),
        (status = 400, description = "Own business (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Business not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Business is not banned (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(admin_id = auth_user.user_id, id))]
pub async fn unban_business(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ModerationResponse>, AppError> {
    let target = ModerationService::new(&state)
        .unban_business(auth_user.user_id, id)
        .await?;

    Ok(Json(ModerationResponse {
        message: "El negocio fue desbaneado correctamente".into(),
        target_id: target.id,
        is_banned: target.is_banned,
    }))
}

#[utoipa::path(
    get,
    path = "/banned/users",
    tag = "Admin",
    operation_id = "listBannedUsers",
    summary = "List banned users",
    description = "Banned users with the admin who banned them, newest ban first. Requires `BAN_USERS`.",
    params(BannedListQuery),
    responses(
        (status = 200, description = "Banned users", body = BannedUserListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(admin_id = auth_user.user_id))]
pub async fn list_banned_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<BannedListQuery>,
) -> Result<Json<BannedUserListResponse>, AppError> {
    auth_user.require_permission(permission::BAN_USERS)?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let select = banned_user::Entity::find();
    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;
    let bans = select
        .order_by_desc(banned_user::Column::CreatedAt)
        .order_by_desc(banned_user::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let users: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(bans.iter().map(|b| b.user_id)))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let data = bans
        .into_iter()
        .filter_map(|ban| {
            let banned = users.get(&ban.user_id)?;
            Some(BannedUserResponse {
                user_id: ban.user_id,
                email: banned.email.clone(),
                name: banned.name.clone(),
                banned_by_id: ban.banned_by_id,
                reason: ban.reason,
                banned_at: ban.created_at,
            })
        })
        .collect();

    Ok(Json(BannedUserListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/banned/businesses",
    tag = "Admin",
    operation_id = "listBannedBusinesses",
    summary = "List banned businesses",
    description = "Banned businesses with the admin who banned them, newest ban first. Requires `BAN_USERS`.",
    params(BannedListQuery),
    responses(
        (status = 200, description = "Banned businesses", body = BannedBusinessListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(admin_id = auth_user.user_id))]
pub async fn list_banned_businesses(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<BannedListQuery>,
) -> Result<Json<BannedBusinessListResponse>, AppError> {
    auth_user.require_permission(permission::BAN_USERS)?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let select = banned_business::Entity::find();
    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;
    let bans = select
        .order_by_desc(banned_business::Column::CreatedAt)
        .order_by_desc(banned_business::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let businesses: HashMap<i32, business::Model> = business::Entity::find()
        .filter(business::Column::Id.is_in(bans.iter().map(|b| b.business_id)))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|b| (b.id, b))
        .collect();

    let data = bans
        .into_iter()
        .filter_map(|ban| {
            let banned = businesses.get(&ban.business_id)?;
            Some(BannedBusinessResponse {
                business_id: ban.business_id,
                name: banned.name.clone(),
                slug: banned.slug.clone(),
                banned_by_id: ban.banned_by_id,
                reason: ban.reason,
                banned_at: ban.created_at,
            })
        })
        .collect();

    Ok(Json(BannedBusinessListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

// Billing

#[utoipa::path(
    get,
    path = "/payments",
    tag = "Admin",
    operation_id = "listPayments",
    summary = "List payments",
    description = "All payments, newest first, optionally filtered by status. Requires `MANAGE_PAYMENTS`.",
    params(PaymentListQuery),
    responses(
        (status = 200, description = "Payments", body = PaymentListResponse),
        (status = 400, description = "Unknown status (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(admin_id = auth_user.user_id))]
pub async fn list_payments(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaymentListQuery>,
) -> Result<Json<PaymentListResponse>, AppError> {
    auth_user.require_permission(permission::MANAGE_PAYMENTS)?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = payment::Entity::find();
    if let Some(ref status) = query.status {
        let status = status
            .parse::<PaymentStatus>()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        select = select.filter(payment::Column::Status.eq(status));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;
    let data = select
        .order_by_desc(payment::Column::CreatedAt)
        .order_by_desc(payment::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(PaymentResponse::from)
        .collect();

    Ok(Json(PaymentListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    post,
    path = "/payments/{id}/approve",
    tag = "Admin",
    operation_id = "approvePayment",
    summary = "Approve a pending payment",
    description = "Marks the payment approved and activates its plan for 30 days in one transaction, then emails the owner. Requires `MANAGE_PAYMENTS`.",
    params(("id" = i32, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment approved", body = PaymentResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Payment not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Payment already processed (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(admin_id = auth_user.user_id, id))]
pub async fn approve_payment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<PaymentResponse>, AppError> {
    let model = BillingService::new(&state)
        .approve_payment(auth_user.user_id, id)
        .await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    post,
    path = "/payments/{id}/reject",
    tag = "Admin",
    operation_id = "rejectPayment",
    summary = "Reject a pending payment",
    description = "Marks the payment rejected and emails the owner. Requires `MANAGE_PAYMENTS`.",
    params(("id" = i32, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment rejected", body = PaymentResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Payment not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Payment already processed (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(admin_id = auth_user.user_id, id))]
pub async fn reject_payment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<PaymentResponse>, AppError> {
    let model = BillingService::new(&state)
        .reject_payment(auth_user.user_id, id)
        .await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    post,
    path = "/businesses/{id}/trial",
    tag = "Admin",
    operation_id = "grantTrial",
    summary = "Grant a trial",
    description = "Gives the business a time-boxed paid plan. Each business gets one trial, for a paid tier, of 1 to 90 days. Requires `MANAGE_PLANS`.",
    params(("id" = i32, Path, description = "Business ID")),
    request_body = GrantTrialRequest,
    responses(
        (status = 201, description = "Trial granted", body = TrialResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Business not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Trial already used or paid plan active (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(admin_id = auth_user.user_id, id, tier = %payload.tier))]
pub async fn grant_trial(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<GrantTrialRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_grant_trial(&payload)?;

    let model = BillingService::new(&state)
        .grant_trial(auth_user.user_id, id, payload.tier, payload.days)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(TrialResponse::new(model, payload.tier)),
    ))
}

// Dashboard

#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "Admin",
    operation_id = "getDashboard",
    summary = "Platform dashboard",
    description = "Totals and month-over-month trends for users, businesses, products and approved revenue. Requires `VIEW_DASHBOARD`.",
    responses(
        (status = 200, description = "Dashboard", body = DashboardResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(admin_id = auth_user.user_id))]
pub async fn dashboard(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, AppError> {
    auth_user.require_permission(permission::VIEW_DASHBOARD)?;
    let db = &state.db;

    let (previous, current) = month_windows(Utc::now())
        .ok_or_else(|| AppError::Internal("could not compute month windows".into()))?;

    let totals = DashboardTotals {
        users: user::Entity::find().count(db).await?,
        businesses: business::Entity::find().count(db).await?,
        products: product::Entity::find().count(db).await?,
        revenue_cents: approved_revenue(db, None).await?,
    };

    let trends = DashboardTrends {
        users: monthly_trend::<user::Entity>(db, user::Column::CreatedAt, previous, current)
            .await?,
        businesses: monthly_trend::<business::Entity>(
            db,
            business::Column::CreatedAt,
            previous,
            current,
        )
        .await?,
        products: monthly_trend::<product::Entity>(
            db,
            product::Column::CreatedAt,
            previous,
            current,
        )
        .await?,
        revenue: Trend::new(
            approved_revenue(db, Some((current, None))).await?,
            approved_revenue(db, Some((previous, Some(current)))).await?,
        ),
    };

    Ok(Json(DashboardResponse { totals, trends }))
}

/// Rows created since `current` against rows created in `[previous, current)`.
async fn monthly_trend<E>(
    db: &DatabaseConnection,
    column: E::Column,
    previous: DateTime<Utc>,
    current: DateTime<Utc>,
) -> Result<Trend, DbErr>
where
    E: EntityTrait,
    E::Model: Sync,
{
    let this_month = E::find().filter(column.gte(current)).count(db).await?;
    let last_month = E::find()
        .filter(column.gte(previous))
        .filter(column.lt(current))
        .count(db)
        .await?;
    Ok(Trend::new(this_month as i64, last_month as i64))
}

/// Sum of approved payments, optionally restricted to a review window.
async fn approved_revenue(
    db: &DatabaseConnection,
    window: Option<(DateTime<Utc>, Option<DateTime<Utc>>)>,
) -> Result<i64, DbErr> {
    let mut select = payment::Entity::find()
        .select_only()
        .column_as(
            Expr::cust("CAST(COALESCE(SUM(amount_cents), 0) AS BIGINT)"),
            "total",
        )
        .filter(payment::Column::Status.eq(PaymentStatus::Approved));

    if let Some((from, to)) = window {
        select = select.filter(payment::Column::ReviewedAt.gte(from));
        if let Some(to) = to {
            select = select.filter(payment::Column::ReviewedAt.lt(to));
        }
    }

    let total: Option<i64> = select.into_tuple().one(db).await?;
    Ok(total.unwrap_or(0))
}

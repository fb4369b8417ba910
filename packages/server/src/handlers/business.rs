use axum::extract::{Path, Query, State};
use axum::{Json, http::StatusCode, response::IntoResponse};
use lules_common::PlanTier;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::cache::{CacheLife, tags};
use crate::entity::{business, product};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::auth::require_active_user;
use crate::handlers::category::ensure_category;
use crate::models::business::*;
use crate::models::plan::PlanResponse;
use crate::models::product::ProductListItem;
use crate::models::shared::{Pagination, escape_like, non_blank, page_params};
use crate::services::plans;
use crate::state::AppState;
use crate::utils::slug::{slugify, with_suffix};

const MAX_SLUG_ATTEMPTS: u32 = 50;

#[utoipa::path(
    post,
    path = "/",
    tag = "Businesses",
    operation_id = "createBusiness",
    summary = "Register the caller's business",
    description = "Creates the caller's business on the FREE plan. A user may own a single business. The slug is derived from the name and made unique.",
    request_body = CreateBusinessRequest,
    responses(
        (status = 201, description = "Business created", body = BusinessResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Account banned (ACCOUNT_BANNED)", body = ErrorBody),
        (status = 409, description = "Caller already owns a business (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, name = %payload.name))]
pub async fn create_business(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateBusinessRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_business(&payload)?;
    require_active_user(&state.db, auth_user.user_id).await?;
    ensure_category(&state.db, payload.category_id).await?;

    let already_owns = business::Entity::find()
        .filter(business::Column::OwnerId.eq(auth_user.user_id))
        .count(&state.db)
        .await?
        > 0;
    if already_owns {
        return Err(AppError::Conflict("Ya tienes un negocio registrado".into()));
    }

    let name = payload.name.trim().to_string();
    let slug = available_slug(&state.db, &name).await?;
    let free = plans::find_plan_by_tier(&state.db, PlanTier::Free).await?;

    let now = chrono::Utc::now();
    let txn = state.db.begin().await?;
    let model = business::ActiveModel {
        name: Set(name),
        slug: Set(slug),
        description: Set(payload.description.trim().to_string()),
        phone: Set(non_blank(payload.phone)),
        email: Set(non_blank(payload.email)),
        address: Set(non_blank(payload.address)),
        website: Set(non_blank(payload.website)),
        owner_id: Set(auth_user.user_id),
        category_id: Set(payload.category_id),
        logo_url: Set(None),
        cover_url: Set(None),
        is_active: Set(true),
        is_banned: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::debug!("Business creation race: unique constraint caught on insert");
            AppError::Conflict("Ya tienes un negocio registrado".into())
        }
        _ => AppError::from(e),
    })?;
    plans::assign_plan(&txn, model.id, free.id, None, false).await?;
    txn.commit().await?;

    state.cache.invalidate_tag(tags::BUSINESSES);

    Ok((StatusCode::CREATED, Json(BusinessResponse::from(model))))
}

/// First free slug among `base`, `base-2`, `base-3`...
async fn available_slug(db: &DatabaseConnection, name: &str) -> Result<String, AppError> {
    let mut base = slugify(name);
    if base.is_empty() {
        base = "negocio".into();
    }

    for attempt in 1..=MAX_SLUG_ATTEMPTS {
        let candidate = with_suffix(&base, attempt);
        let taken = business::Entity::find()
            .filter(business::Column::Slug.eq(&candidate))
            .count(db)
            .await?
            > 0;
        if !taken {
            return Ok(candidate);
        }
    }

    Err(AppError::Conflict(
        "Ya existen demasiados negocios con ese nombre".into(),
    ))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Businesses",
    operation_id = "listBusinesses",
    summary = "List public businesses",
    description = "Paginated list of active, non-banned businesses, newest first. Supports name search and a category filter.",
    params(BusinessListQuery),
    responses(
        (status = 200, description = "Businesses", body = BusinessListResponse),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_businesses(
    State(state): State<AppState>,
    Query(query): Query<BusinessListQuery>,
) -> Result<Json<BusinessListResponse>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = business::Entity::find()
        .filter(business::Column::IsActive.eq(true))
        .filter(business::Column::IsBanned.eq(false));

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(business::Column::Name)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }
    if let Some(category_id) = query.category_id {
        select = select.filter(business::Column::CategoryId.eq(category_id));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let data = select
        .order_by_desc(business::Column::CreatedAt)
        .order_by_desc(business::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(BusinessResponse::from)
        .collect();

    Ok(Json(BusinessListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{business}",
    tag = "Businesses",
    operation_id = "getBusinessBySlug",
    summary = "Get a public storefront",
    description = "Returns the business, its effective plan tier and its visible products. Banned or inactive businesses are not found. Cached.",
    params(("business" = String, Path, description = "Business slug")),
    responses(
        (status = 200, description = "Storefront", body = BusinessDetailResponse),
        (status = 404, description = "Business not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(slug = %slug))]
pub async fn get_business(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BusinessDetailResponse>, AppError> {
    let id: i32 = business::Entity::find()
        .select_only()
        .column(business::Column::Id)
        .filter(business::Column::Slug.eq(&slug))
        .into_tuple()
        .one(&state.db)
        .await?
        .ok_or_else(business_not_found)?;

    let db = state.db.clone();
    let detail = state
        .cache
        .get_or_load(
            &format!("business:{id}:detail"),
            &[tags::business(id)],
            CacheLife::Hours,
            || async move { load_storefront(&db, id).await },
        )
        .await?;

    Ok(Json(detail))
}

async fn load_storefront(
    db: &DatabaseConnection,
    id: i32,
) -> Result<BusinessDetailResponse, AppError> {
    let model = business::Entity::find_by_id(id)
        .one(db)
        .await?
        .filter(|b| b.is_active && !b.is_banned)
        .ok_or_else(business_not_found)?;

    let tier = plans::effective_tiers(db, &[id])
        .await?
        .get(&id)
        .copied()
        .unwrap_or_default();

    let products = product::Entity::find()
        .select_only()
        .column(product::Column::Id)
        .column(product::Column::Name)
        .column(product::Column::PriceCents)
        .column(product::Column::BusinessId)
        .column(product::Column::CategoryId)
        .column(product::Column::Featured)
        .column(product::Column::CreatedAt)
        .filter(product::Column::BusinessId.eq(id))
        .filter(product::Column::Active.eq(true))
        .filter(product::Column::IsBanned.eq(false))
        .order_by_desc(product::Column::Featured)
        .order_by_desc(product::Column::CreatedAt)
        .into_model::<ProductListItem>()
        .all(db)
        .await?;

    Ok(BusinessDetailResponse {
        business: model.into(),
        tier,
        products,
    })
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Businesses",
    operation_id = "getMyBusiness",
    summary = "Get the caller's business",
    description = "Owner view of the caller's business with its effective plan and usage counters.",
    responses(
        (status = 200, description = "Caller's business", body = MyBusinessResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Caller has no business (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn my_business(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MyBusinessResponse>, AppError> {
    let model = owned_business(&state.db, auth_user.user_id).await?;
    let effective = plans::resolve_effective_plan(&state.db, model.id).await?;

    let usage = match effective.current {
        Some(ref cp) => PlanUsage {
            products_used: cp.products_used,
            images_used: cp.images_used,
            is_trial: cp.is_trial && cp.plan_id == effective.plan.id,
            expires_at: if cp.plan_id == effective.plan.id {
                cp.expires_at
            } else {
                None
            },
        },
        None => PlanUsage {
            products_used: 0,
            images_used: 0,
            is_trial: false,
            expires_at: None,
        },
    };

    Ok(Json(MyBusinessResponse {
        business: model.into(),
        plan: PlanResponse::from(effective.plan),
        usage,
    }))
}

#[utoipa::path(
    patch,
    path = "/{business}",
    tag = "Businesses",
    operation_id = "updateBusiness",
    summary = "Update the caller's business",
    description = "Partially updates a business using PATCH semantics. Only the owner may update it; banned businesses cannot be edited. The slug does not change.",
    params(("business" = i32, Path, description = "Business ID")),
    request_body = UpdateBusinessRequest,
    responses(
        (status = 200, description = "Business updated", body = BusinessResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Business not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Business is banned (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, id))]
pub async fn update_business(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateBusinessRequest>,
) -> Result<Json<BusinessResponse>, AppError> {
    validate_update_business(&payload)?;

    let model = business::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(business_not_found)?;
    if model.owner_id != auth_user.user_id {
        return Err(AppError::PermissionDenied);
    }
    if model.is_banned {
        return Err(AppError::Conflict("El negocio está suspendido".into()));
    }
    if let Some(category_id) = payload.category_id {
        ensure_category(&state.db, category_id).await?;
    }

    let mut active: business::ActiveModel = model.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description.trim().to_string());
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(non_blank(phone));
    }
    if let Some(email) = payload.email {
        active.email = Set(non_blank(email));
    }
    if let Some(address) = payload.address {
        active.address = Set(non_blank(address));
    }
    if let Some(website) = payload.website {
        active.website = Set(non_blank(website));
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(chrono::Utc::now());

    let updated = active.update(&state.db).await?;

    state
        .cache
        .invalidate_tags(&[tags::business(id), tags::BUSINESSES.to_string()]);

    Ok(Json(updated.into()))
}

/// The business owned by `user_id`.
pub async fn owned_business<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<business::Model, AppError> {
    business::Entity::find()
        .filter(business::Column::OwnerId.eq(user_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Aún no registraste un negocio".into()))
}

/// Like [`owned_business`], but a banned business may not be modified.
pub async fn owned_active_business<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<business::Model, AppError> {
    let model = owned_business(conn, user_id).await?;
    if model.is_banned {
        return Err(AppError::Conflict("El negocio está suspendido".into()));
    }
    Ok(model)
}

fn business_not_found() -> AppError {
    AppError::NotFound("Negocio no encontrado".into())
}


use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::{Json, http::StatusCode, response::IntoResponse};
use lules_common::ImageOwner;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, Query as SeaQuery, SelectStatement};
use sea_orm::*;
use tracing::{instrument, warn};

use crate::cache::{CacheLife, tags};
use crate::entity::{business, image, product};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::auth::require_active_user;
use crate::handlers::business::owned_active_business;
use crate::handlers::category::ensure_category;
use crate::models::image::ImageResponse;
use crate::models::product::*;
use crate::models::shared::{Pagination, escape_like, page_params};
use crate::services::plans;
use crate::state::AppState;

/// Candidates considered when ranking recent products.
const RECENT_CANDIDATES: u64 = 200;

#[utoipa::path(
    post,
    path = "/",
    tag = "Products",
    operation_id = "createProduct",
    summary = "Publish a product",
    description = "Adds a product to the caller's business. The effective plan bounds the number of products, and featured products require a paid plan.",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Plan limit reached (PLAN_LIMIT_REACHED) or account banned (ACCOUNT_BANNED)", body = ErrorBody),
        (status = 404, description = "Caller has no business (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, name = %payload.name))]
pub async fn create_product(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_product(&payload)?;
    require_active_user(&state.db, auth_user.user_id).await?;
    let owner_business = owned_active_business(&state.db, auth_user.user_id).await?;
    ensure_category(&state.db, payload.category_id).await?;

    let effective = plans::resolve_effective_plan(&state.db, owner_business.id).await?;
    let published = product::Entity::find()
        .filter(product::Column::BusinessId.eq(owner_business.id))
        .count(&state.db)
        .await?;
    if published >= std::cmp::Ord::max(effective.plan.max_products, 0) as u64 {
        return Err(AppError::PlanLimitReached(format!(
            "Tu plan {} permite hasta {} productos",
            effective.plan.tier, effective.plan.max_products
        )));
    }
    if payload.featured && !effective.plan.tier.is_paid() {
        return Err(featured_requires_paid_plan());
    }

    let now = chrono::Utc::now();
    let txn = state.db.begin().await?;
    let model = product::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description.trim().to_string()),
        price_cents: Set(payload.price_cents),
        business_id: Set(owner_business.id),
        category_id: Set(payload.category_id),
        active: Set(payload.active.unwrap_or(true)),
        featured: Set(payload.featured),
        is_banned: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    plans::adjust_usage(&txn, owner_business.id, 1, 0).await?;
    txn.commit().await?;

    invalidate_product_tags(&state, &model);

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse::new(model, Vec::new())),
    ))
}

/// Subquery selecting ids of businesses visible to the public.
fn visible_business_ids() -> SelectStatement {
    SeaQuery::select()
        .column(business::Column::Id)
        .from(business::Entity)
        .and_where(business::Column::IsActive.eq(true))
        .and_where(business::Column::IsBanned.eq(false))
        .to_owned()
}

/// Products a visitor may see: active, not banned, of a visible business.
pub fn visible_products() -> Select<product::Entity> {
    product::Entity::find()
        .filter(product::Column::Active.eq(true))
        .filter(product::Column::IsBanned.eq(false))
        .filter(product::Column::BusinessId.in_subquery(visible_business_ids()))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Products",
    operation_id = "listProducts",
    summary = "List public products",
    description = "Paginated list of active, non-banned products of visible businesses, newest first. Supports name search and category, business and featured filters.",
    params(ProductListQuery),
    responses(
        (status = 200, description = "Products", body = ProductListResponse),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<ProductListResponse>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = visible_products();

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(product::Column::Name)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }
    if let Some(category_id) = query.category_id {
        select = select.filter(product::Column::CategoryId.eq(category_id));
    }
    if let Some(business_id) = query.business_id {
        select = select.filter(product::Column::BusinessId.eq(business_id));
    }
    if let Some(featured) = query.featured {
        select = select.filter(product::Column::Featured.eq(featured));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let data = select
        .select_only()
        .column(product::Column::Id)
        .column(product::Column::Name)
        .column(product::Column::PriceCents)
        .column(product::Column::BusinessId)
        .column(product::Column::CategoryId)
        .column(product::Column::Featured)
        .column(product::Column::CreatedAt)
        .order_by_desc(product::Column::CreatedAt)
        .order_by_desc(product::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .into_model::<ProductListItem>()
        .all(&state.db)
        .await?;

    Ok(Json(ProductListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/recent",
    tag = "Products",
    operation_id = "listRecentProducts",
    summary = "Recent products ranked by plan",
    description = "Recent public products ordered by the seller's plan tier (PREMIUM, BASIC, FREE) and then by recency. Cached.",
    params(RecentProductsQuery),
    responses(
        (status = 200, description = "Ranked products", body = Vec<RecentProduct>),
    ),
)]
#[instrument(skip(state, query))]
pub async fn recent_products(
    State(state): State<AppState>,
    Query(query): Query<RecentProductsQuery>,
) -> Result<Json<Vec<RecentProduct>>, AppError> {
    let limit = query.limit.unwrap_or(12).clamp(1, 50);

    let db = state.db.clone();
    let products = state
        .cache
        .get_or_load(
            &format!("products:recent:{limit}"),
            &[tags::PRODUCTS.to_string(), tags::BUSINESSES.to_string()],
            CacheLife::Minutes,
            || async move { load_recent(&db, limit).await },
        )
        .await?;

    Ok(Json(products))
}

async fn load_recent(db: &DatabaseConnection, limit: u64) -> Result<Vec<RecentProduct>, AppError> {
    let candidates = visible_products()
        .order_by_desc(product::Column::CreatedAt)
        .limit(Some(RECENT_CANDIDATES))
        .all(db)
        .await?;

    let mut business_ids: Vec<i32> = candidates.iter().map(|p| p.business_id).collect();
    business_ids.sort_unstable();
    business_ids.dedup();

    let businesses: HashMap<i32, business::Model> = business::Entity::find()
        .filter(business::Column::Id.is_in(business_ids.iter().copied()))
        .all(db)
        .await?
        .into_iter()
        .map(|b| (b.id, b))
        .collect();
    let tiers = plans::effective_tiers(db, &business_ids).await?;

    let mut ranked: Vec<RecentProduct> = candidates
        .into_iter()
        .filter_map(|p| {
            let seller = businesses.get(&p.business_id)?;
            Some(RecentProduct {
                id: p.id,
                name: p.name,
                price_cents: p.price_cents,
                featured: p.featured,
                business_id: p.business_id,
                business_name: seller.name.clone(),
                business_slug: seller.slug.clone(),
                tier: tiers.get(&p.business_id).copied().unwrap_or_default(),
                created_at: p.created_at,
            })
        })
        .collect();

    rank_by_plan_priority(&mut ranked);
    ranked.truncate(limit as usize);
    Ok(ranked)
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Products",
    operation_id = "getProduct",
    summary = "Get a public product",
    description = "Returns a visible product with its images.",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product", body = ProductResponse),
        (status = 404, description = "Product not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProductResponse>, AppError> {
    let model = visible_products()
        .filter(product::Column::Id.eq(id))
        .one(&state.db)
        .await?
        .ok_or_else(product_not_found)?;

    let images = product_images(&state.db, model.id).await?;
    Ok(Json(ProductResponse::new(
        model,
        images.into_iter().map(ImageResponse::from).collect(),
    )))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Products",
    operation_id = "updateProduct",
    summary = "Update a product",
    description = "Partially updates a product of the caller's business. Featuring a product requires a paid plan.",
    params(("id" = i32, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED) or plan limit (PLAN_LIMIT_REACHED)", body = ErrorBody),
        (status = 404, description = "Product not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, id))]
pub async fn update_product(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    validate_update_product(&payload)?;
    let (model, owner_business) = owned_product(&state.db, auth_user.user_id, id).await?;

    if payload.featured == Some(true) && !model.featured {
        let effective = plans::resolve_effective_plan(&state.db, owner_business.id).await?;
        if !effective.plan.tier.is_paid() {
            return Err(featured_requires_paid_plan());
        }
    }
    if let Some(category_id) = payload.category_id {
        ensure_category(&state.db, category_id).await?;
    }

    let mut active: product::ActiveModel = model.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description.trim().to_string());
    }
    if let Some(price_cents) = payload.price_cents {
        active.price_cents = Set(price_cents);
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    if let Some(featured) = payload.featured {
        active.featured = Set(featured);
    }
    if let Some(is_active) = payload.active {
        active.active = Set(is_active);
    }
    active.updated_at = Set(chrono::Utc::now());

    let updated = active.update(&state.db).await?;
    invalidate_product_tags(&state, &updated);

    let images = product_images(&state.db, updated.id).await?;
    Ok(Json(ProductResponse::new(
        updated,
        images.into_iter().map(ImageResponse::from).collect(),
    )))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Products",
    operation_id = "deleteProduct",
    summary = "Delete a product",
    description = "Deletes a product of the caller's business together with its images, in the database and in object storage.",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Product not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, id))]
pub async fn delete_product(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let (model, owner_business) = owned_product(&state.db, auth_user.user_id, id).await?;
    let images = product_images(&state.db, model.id).await?;

    let txn = state.db.begin().await?;
    image::Entity::delete_many()
        .filter(image::Column::OwnerType.eq(ImageOwner::Product))
        .filter(image::Column::OwnerId.eq(model.id))
        .exec(&txn)
        .await?;
    product::Entity::delete_by_id(model.id).exec(&txn).await?;
    plans::adjust_usage(&txn, owner_business.id, -1, -(images.len() as i32)).await?;
    txn.commit().await?;

    for img in &images {
        if let Err(e) = state.object_store.delete(&img.key).await {
            warn!(key = %img.key, error = %e, "Failed to delete product image object");
        }
    }

    invalidate_product_tags(&state, &model);
    Ok(StatusCode::NO_CONTENT)
}

/// Load a product and its business, checking the caller owns it.
pub async fn owned_product<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    product_id: i32,
) -> Result<(product::Model, business::Model), AppError> {
    let model = product::Entity::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or_else(product_not_found)?;
    let owner_business = business::Entity::find_by_id(model.business_id)
        .one(conn)
        .await?
        .ok_or_else(product_not_found)?;
    if owner_business.owner_id != user_id {
        return Err(AppError::PermissionDenied);
    }
    if owner_business.is_banned {
        return Err(AppError::Conflict("El negocio está suspendido".into()));
    }
    Ok((model, owner_business))
}

pub async fn product_images<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
) -> Result<Vec<image::Model>, DbErr> {
    image::Entity::find()
        .filter(image::Column::OwnerType.eq(ImageOwner::Product))
        .filter(image::Column::OwnerId.eq(product_id))
        .order_by_asc(image::Column::Id)
        .all(conn)
        .await
}

pub fn invalidate_product_tags(state: &AppState, model: &product::Model) {
    state.cache.invalidate_tags(&[
        tags::product(model.id),
        tags::business(model.business_id),
        tags::PRODUCTS.to_string(),
    ]);
}

fn product_not_found() -> AppError {
    AppError::NotFound("Producto no encontrado".into())
}

fn featured_requires_paid_plan() -> AppError {
    AppError::PlanLimitReached("Los productos destacados requieren un plan pago".into())
}

use axum::extract::{Path, Query, State};
use axum::{Json, http::StatusCode, response::IntoResponse};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{answer, business, post, product, review};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::auth::require_active_user;
use crate::handlers::product::visible_products;
use crate::models::community::*;
use crate::models::shared::{Pagination, escape_like, non_blank, page_params};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Community",
    operation_id = "listPosts",
    summary = "List community posts",
    description = "Paginated list of active posts, newest first, with an optional title search.",
    params(PostListQuery),
    responses(
        (status = 200, description = "Posts", body = PostListResponse),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<PostListResponse>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = post::Entity::find().filter(post::Column::IsActive.eq(true));
    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(post::Column::Title)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;
    let data = select
        .order_by_desc(post::Column::CreatedAt)
        .order_by_desc(post::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(PostResponse::from)
        .collect();

    Ok(Json(PostListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Community",
    operation_id = "createPost",
    summary = "Ask the community",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = PostResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Account banned (ACCOUNT_BANNED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn create_post(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_post(&payload)?;
    require_active_user(&state.db, auth_user.user_id).await?;

    let model = post::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        content: Set(payload.content.trim().to_string()),
        author_id: Set(auth_user.user_id),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(PostResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Community",
    operation_id = "getPost",
    summary = "Get a post with its answers",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post and answers, oldest answer first", body = PostDetailResponse),
        (status = 404, description = "Post not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<PostDetailResponse>, AppError> {
    let model = find_active_post(&state.db, id).await?;
    let answers = answer::Entity::find()
        .filter(answer::Column::PostId.eq(model.id))
        .order_by_asc(answer::Column::CreatedAt)
        .order_by_asc(answer::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(AnswerResponse::from)
        .collect();

    Ok(Json(PostDetailResponse {
        post: model.into(),
        answers,
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/answers",
    tag = "Community",
    operation_id = "createAnswer",
    summary = "Answer a post",
    params(("id" = i32, Path, description = "Post ID")),
    request_body = CreateAnswerRequest,
    responses(
        (status = 201, description = "Answer created", body = AnswerResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Account banned (ACCOUNT_BANNED)", body = ErrorBody),
        (status = 404, description = "Post not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, id))]
pub async fn create_answer(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<CreateAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_answer(&payload)?;
    require_active_user(&state.db, auth_user.user_id).await?;
    let parent = find_active_post(&state.db, id).await?;

    let model = answer::ActiveModel {
        content: Set(payload.content.trim().to_string()),
        post_id: Set(parent.id),
        author_id: Set(auth_user.user_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(AnswerResponse::from(model))))
}

async fn find_active_post(db: &DatabaseConnection, id: i32) -> Result<post::Model, AppError> {
    post::Entity::find_by_id(id)
        .filter(post::Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Publicación no encontrada".into()))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Reviews",
    operation_id = "listReviews",
    summary = "List reviews of a product or business",
    description = "Exactly one of `product_id` or `business_id` is required. The average covers every review of the target, not just the page.",
    params(ReviewListQuery),
    responses(
        (status = 200, description = "Reviews, newest first", body = ReviewListResponse),
        (status = 400, description = "Missing or ambiguous target (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_reviews(
    State(state): State<AppState>,
    Query(query): Query<ReviewListQuery>,
) -> Result<Json<ReviewListResponse>, AppError> {
    let target = review_target(query.product_id, query.business_id)?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let select = reviews_of(target);
    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let average: Option<f64> = reviews_of(target)
        .select_only()
        .column_as(Expr::cust("CAST(AVG(rating) AS DOUBLE PRECISION)"), "average")
        .into_tuple::<Option<f64>>()
        .one(&state.db)
        .await?
        .flatten();

    let data = select
        .order_by_desc(review::Column::CreatedAt)
        .order_by_desc(review::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(ReviewResponse::from)
        .collect();

    Ok(Json(ReviewListResponse {
        data,
        average_rating: average.map(|avg| (avg * 10.0).round() / 10.0),
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Reviews",
    operation_id = "createReview",
    summary = "Review a product or business",
    description = "One review per author and target. Owners cannot review their own business or its products.",
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review created", body = ReviewResponse),
        (status = 400, description = "Validation error or own target (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Account banned (ACCOUNT_BANNED)", body = ErrorBody),
        (status = 404, description = "Target not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already reviewed (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, rating = payload.rating))]
pub async fn create_review(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let target = validate_create_review(&payload)?;
    require_active_user(&state.db, auth_user.user_id).await?;

    let owner_business_id = match target {
        ReviewTarget::Product(id) => {
            visible_products()
                .filter(product::Column::Id.eq(id))
                .one(&state.db)
                .await?
                .ok_or_else(|| AppError::NotFound("Producto no encontrado".into()))?
                .business_id
        }
        ReviewTarget::Business(id) => id,
    };
    let reviewed_business = business::Entity::find_by_id(owner_business_id)
        .filter(business::Column::IsActive.eq(true))
        .filter(business::Column::IsBanned.eq(false))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Negocio no encontrado".into()))?;
    if reviewed_business.owner_id == auth_user.user_id {
        return Err(AppError::Validation(
            "No puedes reseñar tu propio negocio".into(),
        ));
    }

    let already_reviewed = reviews_of(target)
        .filter(review::Column::AuthorId.eq(auth_user.user_id))
        .count(&state.db)
        .await?
        > 0;
    if already_reviewed {
        return Err(already_reviewed_error());
    }

    let (product_id, business_id) = match target {
        ReviewTarget::Product(id) => (Some(id), None),
        ReviewTarget::Business(id) => (None, Some(id)),
    };
    let model = review::ActiveModel {
        rating: Set(payload.rating),
        comment: Set(non_blank(payload.comment)),
        author_id: Set(auth_user.user_id),
        product_id: Set(product_id),
        business_id: Set(business_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => already_reviewed_error(),
        _ => AppError::from(e),
    })?;

    Ok((StatusCode::CREATED, Json(ReviewResponse::from(model))))
}

fn reviews_of(target: ReviewTarget) -> Select<review::Entity> {
    match target {
        ReviewTarget::Product(id) => review::Entity::find().filter(review::Column::ProductId.eq(id)),
        ReviewTarget::Business(id) => {
            review::Entity::find().filter(review::Column::BusinessId.eq(id))
        }
    }
}

fn already_reviewed_error() -> AppError {
    AppError::Conflict("Ya dejaste una reseña para este elemento".into())
}

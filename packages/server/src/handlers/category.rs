use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use lules_common::permission;
use sea_orm::*;
use tracing::instrument;

use crate::cache::{CacheLife, tags};
use crate::entity::category;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::category::{CategoryResponse, CreateCategoryRequest, validate_create_category};
use crate::state::AppState;
use crate::utils::slug::slugify;

#[utoipa::path(
    get,
    path = "/",
    tag = "Categories",
    operation_id = "listCategories",
    summary = "List categories",
    description = "Returns every category ordered by name. Public and cached.",
    responses(
        (status = 200, description = "Categories", body = Vec<CategoryResponse>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, AppError> {
    let db = state.db.clone();
    let categories = state
        .cache
        .get_or_load(
            "categories:all",
            &[tags::CATEGORIES.to_string()],
            CacheLife::Weeks,
            || async move {
                let rows = category::Entity::find()
                    .order_by_asc(category::Column::Name)
                    .all(&db)
                    .await?;
                Ok::<_, AppError>(rows.into_iter().map(CategoryResponse::from).collect::<Vec<_>>())
            },
        )
        .await?;

    Ok(Json(categories))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Categories",
    operation_id = "createCategory",
    summary = "Create a category",
    description = "Creates a category; the slug is derived from the name. Requires `MANAGE_CATEGORIES`.",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Category exists (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_category(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(permission::MANAGE_CATEGORIES)?;
    validate_create_category(&payload)?;

    let name = payload.name.trim().to_string();
    let slug = slugify(&name);
    if slug.is_empty() {
        return Err(AppError::Validation(
            "El nombre debe contener letras o números".into(),
        ));
    }

    let model = category::ActiveModel {
        name: Set(name),
        slug: Set(slug),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("La categoría ya existe".into())
        }
        _ => AppError::from(e),
    })?;

    state.cache.invalidate_tag(tags::CATEGORIES);

    Ok((StatusCode::CREATED, Json(CategoryResponse::from(model))))
}

/// Fail with a validation error unless `id` names an existing category.
pub async fn ensure_category<C: ConnectionTrait>(conn: &C, id: i32) -> Result<(), AppError> {
    let exists = category::Entity::find_by_id(id).count(conn).await? > 0;
    if !exists {
        return Err(AppError::Validation("La categoría no existe".into()));
    }
    Ok(())
}

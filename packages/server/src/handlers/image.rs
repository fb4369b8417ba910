use std::time::Duration;

use axum::extract::{Path, State};
use axum::{Json, http::StatusCode, response::IntoResponse};
use lules_common::storage::{PresignedUpload, key};
use lules_common::{ImageOwner, permission};
use sea_orm::prelude::Expr;
use sea_orm::*;
use tracing::{info, instrument, warn};

use crate::cache::tags;
use crate::entity::{business, image, product};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::auth::require_active_user;
use crate::handlers::product::{invalidate_product_tags, owned_product};
use crate::models::image::*;
use crate::services::plans;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/presign",
    tag = "Uploads",
    operation_id = "presignUpload",
    summary = "Get a presigned upload URL",
    description = "Validates the announced file (image content type, non-empty, below the configured maximum size) and returns a time-limited URL for a direct PUT to object storage.",
    request_body = PresignRequest,
    responses(
        (status = 200, description = "Presigned upload", body = PresignedUpload),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Account banned (ACCOUNT_BANNED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, size = payload.size))]
pub async fn presign_upload(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<PresignRequest>,
) -> Result<Json<PresignedUpload>, AppError> {
    validate_presign(&payload)?;
    key::validate_upload(
        payload.size,
        &payload.content_type,
        state.config.storage.max_upload_size,
    )?;
    require_active_user(&state.db, auth_user.user_id).await?;

    let object_key =
        key::generate_upload_key(auth_user.user_id, &payload.filename, &payload.content_type);
    let presigned = state
        .object_store
        .presign_put(
            &object_key,
            &payload.content_type,
            Duration::from_secs(state.config.storage.presign_expiry_secs),
        )
        .await?;

    Ok(Json(presigned))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Images",
    operation_id = "registerImage",
    summary = "Attach an uploaded image",
    description = "Registers an object uploaded through a presigned URL as a product image, business logo or business cover. The key must belong to the caller and exist in storage. Product images are bounded by the plan; logo and cover replace the previous image.",
    request_body = RegisterImageRequest,
    responses(
        (status = 201, description = "Image registered", body = ImageResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED) or plan limit (PLAN_LIMIT_REACHED)", body = ErrorBody),
        (status = 404, description = "Owner not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Image already registered (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, owner = %payload.owner, owner_id = payload.owner_id))]
pub async fn register_image(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterImageRequest>,
) -> Result<impl IntoResponse, AppError> {
    key::ensure_owned_key(&payload.key, auth_user.user_id)?;
    require_active_user(&state.db, auth_user.user_id).await?;

    let already_registered = image::Entity::find()
        .filter(image::Column::Key.eq(&payload.key))
        .count(&state.db)
        .await?
        > 0;
    if already_registered {
        return Err(AppError::Conflict("La imagen ya fue registrada".into()));
    }
    if !state.object_store.exists(&payload.key).await? {
        return Err(AppError::Validation(
            "El archivo todavía no fue subido".into(),
        ));
    }

    let model = match payload.owner {
        ImageOwner::Product => attach_product_image(&state, &auth_user, &payload).await?,
        ImageOwner::BusinessLogo | ImageOwner::BusinessCover => {
            replace_business_image(&state, &auth_user, &payload).await?
        }
    };

    Ok((StatusCode::CREATED, Json(ImageResponse::from(model))))
}

fn new_image(
    state: &AppState,
    payload: &RegisterImageRequest,
    uploaded_by_id: i32,
) -> image::ActiveModel {
    image::ActiveModel {
        key: Set(payload.key.clone()),
        url: Set(state.object_store.public_url(&payload.key)),
        owner_type: Set(payload.owner),
        owner_id: Set(payload.owner_id),
        uploaded_by_id: Set(uploaded_by_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
}

async fn attach_product_image(
    state: &AppState,
    auth_user: &AuthUser,
    payload: &RegisterImageRequest,
) -> Result<image::Model, AppError> {
    let (target, owner_business) =
        owned_product(&state.db, auth_user.user_id, payload.owner_id).await?;

    let effective = plans::resolve_effective_plan(&state.db, owner_business.id).await?;
    let attached = image::Entity::find()
        .filter(image::Column::OwnerType.eq(ImageOwner::Product))
        .filter(image::Column::OwnerId.eq(target.id))
        .count(&state.db)
        .await?;
    if attached >= std::cmp::Ord::max(effective.plan.max_images_per_product, 0) as u64 {
        return Err(AppError::PlanLimitReached(format!(
            "Tu plan {} permite hasta {} imágenes por producto",
            effective.plan.tier, effective.plan.max_images_per_product
        )));
    }

    let txn = state.db.begin().await?;
    let model = new_image(state, payload, auth_user.user_id)
        .insert(&txn)
        .await
        .map_err(map_duplicate_key)?;
    plans::adjust_usage(&txn, owner_business.id, 0, 1).await?;
    txn.commit().await?;

    invalidate_product_tags(state, &target);
    Ok(model)
}

async fn replace_business_image(
    state: &AppState,
    auth_user: &AuthUser,
    payload: &RegisterImageRequest,
) -> Result<image::Model, AppError> {
    let target = business::Entity::find_by_id(payload.owner_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Negocio no encontrado".into()))?;
    if target.owner_id != auth_user.user_id {
        return Err(AppError::PermissionDenied);
    }
    if target.is_banned {
        return Err(AppError::Conflict("El negocio está suspendido".into()));
    }

    let previous = image::Entity::find()
        .filter(image::Column::OwnerType.eq(payload.owner))
        .filter(image::Column::OwnerId.eq(target.id))
        .all(&state.db)
        .await?;

    let txn = state.db.begin().await?;
    if !previous.is_empty() {
        image::Entity::delete_many()
            .filter(image::Column::Id.is_in(previous.iter().map(|img| img.id)))
            .exec(&txn)
            .await?;
    }
    let model = new_image(state, payload, auth_user.user_id)
        .insert(&txn)
        .await
        .map_err(map_duplicate_key)?;
    set_business_image_url(&txn, target.id, payload.owner, Some(model.url.clone())).await?;
    txn.commit().await?;

    for old in &previous {
        if let Err(e) = state.object_store.delete(&old.key).await {
            warn!(key = %old.key, error = %e, "Failed to delete replaced image object");
        }
    }
    if !previous.is_empty() {
        info!(business_id = target.id, owner = %payload.owner, "Replaced business image");
    }

    state
        .cache
        .invalidate_tags(&[tags::business(target.id), tags::BUSINESSES.to_string()]);
    Ok(model)
}

async fn set_business_image_url<C: ConnectionTrait>(
    conn: &C,
    business_id: i32,
    slot: ImageOwner,
    url: Option<String>,
) -> Result<(), DbErr> {
    let column = match slot {
        ImageOwner::BusinessLogo => business::Column::LogoUrl,
        ImageOwner::BusinessCover => business::Column::CoverUrl,
        ImageOwner::Product => return Ok(()),
    };
    business::Entity::update_many()
        .col_expr(column, Expr::value(url))
        .col_expr(business::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(business::Column::Id.eq(business_id))
        .exec(conn)
        .await?;
    Ok(())
}

fn map_duplicate_key(e: DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("La imagen ya fue registrada".into())
        }
        _ => AppError::from(e),
    }
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Images",
    operation_id = "deleteImage",
    summary = "Delete an image",
    description = "Removes the stored object and then the image row. Allowed for the owner of the parent business or holders of `MANAGE_CONTENT`.",
    params(("id" = i32, Path, description = "Image ID")),
    responses(
        (status = 204, description = "Image deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED) or owner banned (ACCOUNT_BANNED)", body = ErrorBody),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, id))]
pub async fn delete_image(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let model = image::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Imagen no encontrada".into()))?;

    let parent_product = match model.owner_type {
        ImageOwner::Product => product::Entity::find_by_id(model.owner_id).one(&state.db).await?,
        _ => None,
    };
    // A product image whose product is gone has no owning business.
    let business_id = match model.owner_type {
        ImageOwner::Product => parent_product.as_ref().map(|p| p.business_id),
        _ => Some(model.owner_id),
    };
    let owner_id: Option<i32> = match business_id {
        Some(business_id) => {
            business::Entity::find_by_id(business_id)
                .select_only()
                .column(business::Column::OwnerId)
                .into_tuple()
                .one(&state.db)
                .await?
        }
        None => None,
    };

    let is_owner = owner_id == Some(auth_user.user_id);
    if is_owner {
        require_active_user(&state.db, auth_user.user_id).await?;
    } else {
        auth_user.require_permission(permission::MANAGE_CONTENT)?;
    }

    state.object_store.delete(&model.key).await?;

    let txn = state.db.begin().await?;
    image::Entity::delete_by_id(model.id).exec(&txn).await?;
    match (model.owner_type, business_id) {
        (ImageOwner::Product, Some(business_id)) => {
            plans::adjust_usage(&txn, business_id, 0, -1).await?
        }
        (ImageOwner::Product, None) => {
            warn!(
                image_id = model.id,
                product_id = model.owner_id,
                "Deleting orphaned product image"
            );
        }
        (slot, Some(business_id)) => {
            set_business_image_url(&txn, business_id, slot, None).await?
        }
        (_, None) => {}
    }
    txn.commit().await?;

    info!(image_id = model.id, by_owner = is_owner, "Image deleted");

    match (&parent_product, business_id) {
        (Some(p), _) => invalidate_product_tags(&state, p),
        (None, Some(business_id)) => state
            .cache
            .invalidate_tags(&[tags::business(business_id), tags::BUSINESSES.to_string()]),
        (None, None) => {}
    }
    Ok(StatusCode::NO_CONTENT)
}

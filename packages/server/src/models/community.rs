use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::entity::{answer, post, review};
use crate::error::AppError;

use super::shared::{Pagination, validate_optional_text, validate_text};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreatePostRequest {
    #[schema(example = "¿Dónde consigo harina integral?")]
    pub title: String,
    pub content: String,
}

pub fn validate_create_post(payload: &CreatePostRequest) -> Result<(), AppError> {
    validate_text(&payload.title, "título", 200)?;
    validate_text(&payload.content, "contenido", 5000)
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateAnswerRequest {
    pub content: String,
}

pub fn validate_create_answer(payload: &CreateAnswerRequest) -> Result<(), AppError> {
    validate_text(&payload.content, "contenido", 5000)
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct PostResponse {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub author_id: i32,
    pub created_at: DateTime<Utc>,
}

impl From<post::Model> for PostResponse {
    fn from(m: post::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            content: m.content,
            author_id: m.author_id,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct AnswerResponse {
    pub id: i32,
    pub post_id: i32,
    pub author_id: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<answer::Model> for AnswerResponse {
    fn from(m: answer::Model) -> Self {
        Self {
            id: m.id,
            post_id: m.post_id,
            author_id: m.author_id,
            content: m.content,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct PostDetailResponse {
    pub post: PostResponse,
    pub answers: Vec<AnswerResponse>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PostListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Case-insensitive search on the title.
    pub search: Option<String>,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct PostListResponse {
    pub data: Vec<PostResponse>,
    pub pagination: Pagination,
}

/// Review of exactly one product or one business.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateReviewRequest {
    /// 1 to 5.
    #[schema(example = 5)]
    pub rating: i16,
    pub comment: Option<String>,
    pub product_id: Option<i32>,
    pub business_id: Option<i32>,
}

/// What a review is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewTarget {
    Product(i32),
    Business(i32),
}

/// Validate the payload and resolve its single target.
pub fn validate_create_review(payload: &CreateReviewRequest) -> Result<ReviewTarget, AppError> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::Validation(
            "La calificación debe estar entre 1 y 5".into(),
        ));
    }
    validate_optional_text(payload.comment.as_deref(), "comentario", 2000)?;
    review_target(payload.product_id, payload.business_id)
}

pub fn review_target(
    product_id: Option<i32>,
    business_id: Option<i32>,
) -> Result<ReviewTarget, AppError> {
    match (product_id, business_id) {
        (Some(id), None) => Ok(ReviewTarget::Product(id)),
        (None, Some(id)) => Ok(ReviewTarget::Business(id)),
        _ => Err(AppError::Validation(
            "Indica un producto o un negocio, no ambos".into(),
        )),
    }
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ReviewResponse {
    pub id: i32,
    pub rating: i16,
    pub comment: Option<String>,
    pub author_id: i32,
    pub product_id: Option<i32>,
    pub business_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<review::Model> for ReviewResponse {
    fn from(m: review::Model) -> Self {
        Self {
            id: m.id,
            rating: m.rating,
            comment: m.comment,
            author_id: m.author_id,
            product_id: m.product_id,
            business_id: m.business_id,
            created_at: m.created_at,
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReviewListQuery {
    pub product_id: Option<i32>,
    pub business_id: Option<i32>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ReviewListResponse {
    pub data: Vec<ReviewResponse>,
    /// Average rating over all reviews of the target, `null` when there are none.
    pub average_rating: Option<f64>,
    pub pagination: Pagination,
}

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lules_common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

use crate::mail::MailError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_MISSING`,
    /// `TOKEN_INVALID`, `INVALID_CREDENTIALS`, `PERMISSION_DENIED`, `ACCOUNT_BANNED`,
    /// `NOT_FOUND`, `CONFLICT`, `EMAIL_TAKEN`, `PLAN_LIMIT_REACHED`, `INTERNAL_ERROR`.
    #[schema(example = "CONFLICT")]
    pub code: &'static str,
    /// Human-readable error description, in Spanish.
    #[schema(example = "El negocio ya está baneado")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    PermissionDenied,
    AccountBanned,
    NotFound(String),
    Conflict(String),
    EmailTaken,
    PlanLimitReached(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_MISSING",
                    message: "Se requiere autenticación".into(),
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_INVALID",
                    message: "Token inválido o expirado".into(),
                },
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "INVALID_CREDENTIALS",
                    message: "Correo o contraseña incorrectos".into(),
                },
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "PERMISSION_DENIED",
                    message: "No tienes permisos para realizar esta acción".into(),
                },
            ),
            AppError::AccountBanned => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "ACCOUNT_BANNED",
                    message: "Tu cuenta ha sido suspendida".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    message: msg,
                },
            ),
            AppError::EmailTaken => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "EMAIL_TAKEN",
                    message: "El correo ya está registrado".into(),
                },
            ),
            AppError::PlanLimitReached(msg) => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "PLAN_LIMIT_REACHED",
                    message: msg,
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "Ocurrió un error crítico. Inténtalo de nuevo más tarde.".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Rejected(msg) => AppError::Validation(msg),
            StorageError::InvalidKey(key) => {
                tracing::warn!(key, "Rejected foreign or malformed object key");
                AppError::Validation("Clave de archivo inválida".into())
            }
            StorageError::NotFound(_) => AppError::NotFound("Archivo no encontrado".into()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<MailError> for AppError {
    fn from(err: MailError) -> Self {
        AppError::Internal(err.to_string())
    }
}

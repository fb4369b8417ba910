use serde::{Deserialize, Serialize};

use crate::entity::user;
use crate::error::AppError;

use super::shared::validate_text;

/// Request body for user registration.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// Account email, stored lowercase.
    #[schema(example = "ana@lules.market")]
    pub email: String,
    /// Display name (1-100 characters).
    #[schema(example = "Ana Pérez")]
    pub name: String,
    /// Password (8-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

/// Lowercase and trim an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let valid = email.len() <= 254
        && email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
        })
        && !email.chars().any(char::is_whitespace);
    if !valid {
        return Err(AppError::Validation("El correo electrónico no es válido".into()));
    }
    Ok(())
}

pub fn validate_register_request(payload: &RegisterRequest) -> Result<(), AppError> {
    validate_email(&normalize_email(&payload.email))?;
    validate_text(&payload.name, "nombre", 100)?;
    if payload.password.len() < 8 || payload.password.len() > 128 {
        return Err(AppError::Validation(
            "La contraseña debe tener entre 8 y 128 caracteres".into(),
        ));
    }
    Ok(())
}

/// Request body for user login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    #[schema(example = "ana@lules.market")]
    pub email: String,
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.email.trim().is_empty() {
        return Err(AppError::Validation("El correo es obligatorio".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("La contraseña es obligatoria".into()));
    }
    Ok(())
}

/// Successful registration response.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "ana@lules.market")]
    pub email: String,
    #[schema(example = "Ana Pérez")]
    pub name: String,
}

impl From<user::Model> for RegisterResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}

/// Successful login response.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// JWT bearer token.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
    pub user: MeResponse,
}

/// Current authenticated user's profile.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct MeResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "ana@lules.market")]
    pub email: String,
    #[schema(example = "Ana Pérez")]
    pub name: String,
    #[schema(example = "user")]
    pub role: String,
    #[schema(example = json!([]))]
    pub permissions: Vec<String>,
}

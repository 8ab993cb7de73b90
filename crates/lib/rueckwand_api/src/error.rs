//! Application error types.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};
use rueckwand_core::artifact::ArtifactError;
use rueckwand_core::auth::AuthError;
use rueckwand_core::catalog::CatalogError;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Message for every token failure; which check failed is not disclosed.
pub const COULD_NOT_VALIDATE: &str = "Could not validate credentials";

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database unavailable: {0}")]
    DbUnavailable(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                m.as_str(),
            ),
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, "bad_request", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::DbUnavailable(m) => {
                (StatusCode::SERVICE_UNAVAILABLE, "db_unavailable", m.as_str())
            }
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Internal(detail) => {
                error!("internal error: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".into()),
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => AppError::DbUnavailable(e.to_string()),
            _ => AppError::Internal(e.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentialsFormat => {
                AppError::Unauthorized("Your entered username is not a valid email".into())
            }
            AuthError::InvalidCredentials => {
                AppError::Unauthorized("Incorrect email or password".into())
            }
            AuthError::MissingToken | AuthError::InvalidToken => {
                AppError::Unauthorized(COULD_NOT_VALIDATE.into())
            }
            AuthError::SessionNotFound => AppError::BadRequest(
                "Session not found - you are already logged out".into(),
            ),
            AuthError::NotFound(msg) => AppError::NotFound(msg),
            AuthError::Conflict(msg) => AppError::BadRequest(msg),
            AuthError::ValidationError(msg) => AppError::Validation(msg),
            AuthError::DbError(e) => AppError::from(e),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound(msg) => AppError::NotFound(msg),
            CatalogError::Artifact(e) => AppError::from(e),
            CatalogError::DbError(e) => AppError::from(e),
        }
    }
}

impl From<ArtifactError> for AppError {
    fn from(e: ArtifactError) -> Self {
        if e.is_client_error() {
            AppError::BadRequest(e.to_string())
        } else {
            AppError::Internal(e.to_string())
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_failures_share_one_message() {
        for e in [AuthError::MissingToken, AuthError::InvalidToken] {
            match AppError::from(e) {
                AppError::Unauthorized(m) => assert_eq!(m, COULD_NOT_VALIDATE),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn unauthorized_carries_bearer_challenge() {
        let resp = AppError::Unauthorized("x".into()).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers()[WWW_AUTHENTICATE], "Bearer");
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let resp = AppError::Internal("secret detail".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn exhausted_session_insert_is_server_error() {
        let e = AuthError::Internal("could not allocate a unique token id".into());
        let resp = AppError::from(e).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn catalog_errors_map_by_cause() {
        let missing = CatalogError::NotFound("Material not found".into());
        assert!(matches!(AppError::from(missing), AppError::NotFound(m) if m == "Material not found"));
        let render = CatalogError::Artifact(ArtifactError::Task("join".into()));
        assert!(matches!(AppError::from(render), AppError::Internal(_)));
    }

    #[test]
    fn artifact_size_errors_are_bad_requests() {
        let e = ArtifactError::InvalidSize {
            width: 0,
            height: 10,
        };
        assert!(matches!(AppError::from(e), AppError::BadRequest(_)));
    }
}

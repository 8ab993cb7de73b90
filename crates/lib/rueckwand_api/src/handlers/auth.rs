//! Login and logout handlers.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::{Form, Json};
use rueckwand_core::auth::AuthError;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::bearer_token;
use crate::models::{DetailResponse, LoginForm, TokenResponse};

/// `POST /login`: exchange email and password for a bearer token.
pub async fn login_handler(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Json<TokenResponse>> {
    let issued = state
        .authenticator
        .login(&form.username, &form.password)
        .await?;
    Ok(Json(TokenResponse::bearer(issued.access_token)))
}

/// `POST /logout`: revoke the session behind the presented token.
///
/// Runs outside the auth middleware so that a second logout reports the
/// session as already gone instead of a generic 401.
pub async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<DetailResponse>> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::from(AuthError::MissingToken))?;
    match state.authenticator.logout(token).await {
        Ok(_) => Ok(Json(DetailResponse::new("Logged out successfully"))),
        Err(AuthError::InvalidToken) => Err(AppError::BadRequest("Invalid token".into())),
        Err(e) => Err(e.into()),
    }
}

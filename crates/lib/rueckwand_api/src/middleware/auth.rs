//! Authentication middleware: bearer token extraction and session-backed
//! identity resolution.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use rueckwand_core::models::auth::User;
use tracing::debug;

use crate::AppState;
use crate::error::AppError;

/// The user resolved from the request's bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Token from an `Authorization: Bearer <token>` header. The scheme is
/// matched case-insensitively; anything else counts as no token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Axum middleware: resolves the bearer token to a live session and its user,
/// and injects [`CurrentUser`] into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = state
        .authenticator
        .resolve(bearer_token(request.headers()))
        .await
        .inspect_err(|e| debug!("request rejected: {e}"))?;

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

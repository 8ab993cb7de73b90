//! Token session handlers. Callers only ever see their own sessions.

use axum::extract::{Path, State};
use axum::{Extension, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::CurrentUser;
use crate::models::{DetailResponse, SessionResponse};

/// `GET /token-sessions`: sessions of the authenticated user.
pub async fn list_sessions_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> AppResult<Json<Vec<SessionResponse>>> {
    let sessions = state.authenticator.list_sessions(&user).await?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

/// `GET /token-sessions/{session_id}`
pub async fn get_session_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(session_id): Path<i64>,
) -> AppResult<Json<SessionResponse>> {
    let session = state.authenticator.get_session(&user, session_id).await?;
    Ok(Json(session.into()))
}

/// `DELETE /token-sessions/{session_id}`: revoke and remove a session.
pub async fn delete_session_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(session_id): Path<i64>,
) -> AppResult<Json<DetailResponse>> {
    state
        .authenticator
        .delete_session(&user, session_id)
        .await?;
    Ok(Json(DetailResponse::new(format!(
        "Token session with id={session_id} deleted"
    ))))
}

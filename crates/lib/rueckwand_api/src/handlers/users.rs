//! User management handlers.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use rueckwand_core::auth::AuthError;
use rueckwand_core::auth::password::hash_password;
use rueckwand_core::models::auth::UserChanges;
use tracing::info;
use validator::Validate;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::models::{CreateUserRequest, DetailResponse, UpdateUserRequest, UserResponse};

const EMAIL_IN_USE: &str = "Email already in use";

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".into())
}

fn email_conflict(e: AuthError) -> AppError {
    match e {
        AuthError::Conflict(_) => AppError::BadRequest(EMAIL_IN_USE.into()),
        other => other.into(),
    }
}

/// `POST /users`: register a new user. Public.
pub async fn create_user_handler(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    body.validate()?;
    if state.store.users.find_by_email(&body.email).await?.is_some() {
        return Err(AppError::BadRequest(EMAIL_IN_USE.into()));
    }
    let hash = hash_password(&body.password)?;
    let user = state
        .store
        .users
        .create(&body.email, &hash, body.is_active)
        .await
        .map_err(email_conflict)?;
    info!(user_id = user.id, "user registered");
    Ok(Json(user.into()))
}

/// `GET /users`
pub async fn list_users_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users = state.store.users.list().await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// `GET /users/{user_id}`
pub async fn get_user_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .store
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(user.into()))
}

/// `PATCH /users/{user_id}`: a new password is hashed before storing.
pub async fn update_user_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
    Json(body): Json<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    body.validate()?;
    let password_hash = body.password.as_deref().map(hash_password).transpose()?;
    let changes = UserChanges {
        email: body.email,
        password_hash,
        is_active: body.is_active,
    };
    let user = state
        .store
        .users
        .update(user_id, &changes)
        .await
        .map_err(email_conflict)?
        .ok_or_else(user_not_found)?;
    Ok(Json(user.into()))
}

/// `DELETE /users/{user_id}`: removes the user and all of its sessions.
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<DetailResponse>> {
    if !state.store.users.delete(user_id).await? {
        return Err(user_not_found());
    }
    info!(user_id, "user deleted");
    Ok(Json(DetailResponse::new(format!("User with id={user_id} deleted"))))
}

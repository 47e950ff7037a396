use axum::extract::State;
use axum::response::Response;
use serde::Serialize;

use crate::auth::{hash_password, normalize_email, validate_password, verify_password, AuthUser};
use crate::models::user::{Credentials, PasswordChange};
use crate::models::{Profile, User};
use crate::utils::error::{AppError, AppResult};
use crate::utils::extract::Json;
use crate::utils::response::{created, empty_success, success};
use crate::AppState;

pub async fn sign_up(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> AppResult<Response> {
    let email = normalize_email(&credentials.email)?;
    validate_password(&credentials.password)?;

    let hash = hash_password(&credentials.password).await?;
    let user = state.store.create_user(&email, &hash).await?;
    tracing::info!(user_id = %user.id, "User signed up");

    let session = state.start_session(user).await?;
    Ok(created(session, "Account created"))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> AppResult<Response> {
    let invalid = || AppError::AuthError("Invalid login credentials".to_string());

    let email = normalize_email(&credentials.email).map_err(|_| invalid())?;
    let user = state.store.user_by_email(&email).await?.ok_or_else(invalid)?;
    if !verify_password(&credentials.password, &user.password_hash).await? {
        return Err(invalid());
    }

    let session = state.start_session(user).await?;
    Ok(success(session, "Signed in"))
}

pub async fn sign_out(State(state): State<AppState>, user: AuthUser) -> AppResult<Response> {
    state.store.delete_session(&user.token).await?;
    tracing::info!(user_id = %user.id(), "Session revoked");
    Ok(empty_success("Signed out"))
}

#[derive(Serialize)]
struct CurrentUser {
    user: User,
    profile: Profile,
}

pub async fn current_user(user: AuthUser) -> Response {
    success(
        CurrentUser {
            user: user.user,
            profile: user.profile,
        },
        "User retrieved",
    )
}

pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(change): Json<PasswordChange>,
) -> AppResult<Response> {
    validate_password(&change.password)?;
    let hash = hash_password(&change.password).await?;

    state.store.update_password(user.id(), &hash).await?;
    state
        .store
        .delete_other_sessions(user.id(), &user.token)
        .await?;

    tracing::info!(user_id = %user.id(), "Password changed, other sessions revoked");
    Ok(empty_success("Password updated"))
}

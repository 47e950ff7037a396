//! Privileged operations called by the web client with the user's own token.

use axum::extract::State;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::notify::{goodbye_email, new_submission_email};
use crate::utils::error::{AppError, AppResult};
use crate::utils::extract::Json;
use crate::utils::response::success;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountDeleted {
    pub success: bool,
    pub message: String,
    pub user_id: Uuid,
    pub email: String,
}

/// Deletes the calling account, then says goodbye by email if possible.
pub async fn delete_user(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<AccountDeleted>> {
    let user_id = user.id();
    let email = user.user.email;

    if !state.store.delete_user(user_id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    tracing::info!(%user_id, "Account deleted");

    if state.mailer.is_configured() {
        if let Err(e) = state.mailer.send(goodbye_email(&state.config, &email)).await {
            tracing::warn!(%user_id, "Goodbye email failed: {e}");
        }
    } else {
        tracing::debug!("Email not configured, skipping goodbye email");
    }

    Ok(Json(AccountDeleted {
        success: true,
        message: "User deleted successfully".to_string(),
        user_id,
        email,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct NotifyRequest {
    pub user_email: Option<String>,
}

#[derive(Serialize)]
struct Notified {
    id: String,
}

/// Emails the moderation address about a new submission.
pub async fn notify_albo(
    State(state): State<AppState>,
    body: Option<Json<NotifyRequest>>,
) -> AppResult<Response> {
    let user_email = body
        .and_then(|Json(request)| request.user_email)
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty())
        .ok_or_else(|| AppError::ValidationError("user_email is required".to_string()))?;

    if !state.mailer.is_configured() {
        return Err(AppError::InternalServerError(
            "RESEND_API_KEY is not configured".to_string(),
        ));
    }

    let id = state
        .mailer
        .send(new_submission_email(&state.config, &user_email))
        .await?;

    Ok(success(Notified { id }, "Notification sent"))
}

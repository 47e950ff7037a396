use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Profile, Role, Session, User};
use crate::utils::error::{AppError, AppResult};
use crate::AppState;

/// Number of characters in a session token.
const TOKEN_LENGTH: usize = 64;
const MIN_PASSWORD_LEN: usize = 8;

/// Hashing and verification run on the blocking pool.
pub async fn hash_password(password: &str) -> AppResult<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    })
    .await
    .map_err(|e| AppError::InternalServerError(format!("password hashing task failed: {e}")))?
}

pub async fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let (password, hash) = (password.to_owned(), hash.to_owned());
    tokio::task::spawn_blocking(move || {
        PasswordHash::new(&hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    })
    .await
    .map_err(|e| AppError::InternalServerError(format!("password check task failed: {e}")))
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::ValidationError(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Trims and lower-cases an email, rejecting obviously invalid ones.
pub fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AppError::ValidationError("A valid email is required".into())),
    }
}

fn new_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(parts: &Parts) -> AppResult<&str> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::AuthError("Authorization header missing".into()))?
        .to_str()
        .map_err(|_| AppError::AuthError("Malformed authorization header".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .unwrap_or(header)
        .trim();

    if token.is_empty() {
        return Err(AppError::AuthError("Bearer token missing".into()));
    }
    Ok(token)
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: User,
    pub profile: Profile,
}

impl AppState {
    /// Issues a new bearer session for `user`.
    pub async fn start_session(&self, user: User) -> AppResult<SessionResponse> {
        let session = Session {
            token: new_token(),
            user_id: user.id,
            expires_at: Utc::now() + self.config.session_ttl(),
        };
        self.store.create_session(&session).await?;
        let profile = self.ensure_profile(&user).await?;

        tracing::info!(user_id = %user.id, "Session started");

        Ok(SessionResponse {
            access_token: session.token,
            token_type: "bearer",
            expires_at: session.expires_at,
            user,
            profile,
        })
    }

    /// Returns the user's profile, creating it on first access.
    pub async fn ensure_profile(&self, user: &User) -> AppResult<Profile> {
        if let Some(profile) = self.store.profile(user.id).await? {
            return Ok(profile);
        }

        let role = if self.config.is_bootstrap_admin(&user.email) {
            Role::Admin
        } else {
            Role::User
        };
        tracing::info!(user_id = %user.id, ?role, "Creating missing profile");
        self.store.create_profile(user.id, &user.email, role).await
    }

    /// Resolves a bearer token to its user, dropping it if it has expired.
    pub async fn authenticate(&self, token: &str) -> AppResult<AuthUser> {
        let invalid = || AppError::AuthError("Invalid or expired token".into());

        let session = self.store.session(token).await?.ok_or_else(invalid)?;
        if !session.is_valid() {
            self.store.delete_session(token).await?;
            return Err(invalid());
        }

        let user = self
            .store
            .user_by_id(session.user_id)
            .await?
            .ok_or_else(invalid)?;
        let profile = self.ensure_profile(&user).await?;

        Ok(AuthUser {
            user,
            profile,
            token: session.token,
        })
    }
}

/// A signed-in caller.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub profile: Profile,
    pub token: String,
}

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.to_string();
        state.authenticate(&token).await
    }
}

/// A signed-in caller whose profile has the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.profile.is_admin() {
            return Err(AppError::Forbidden("Admin role required".into()));
        }
        Ok(AdminUser(user))
    }
}

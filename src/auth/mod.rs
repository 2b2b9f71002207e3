//! Session-based authentication module.
//!
//! Passwords are stored as Argon2 hashes. A session is an opaque random token
//! handed to the client; only its SHA-256 hash is kept in the database.
//! Handlers ask for a [`CurrentUser`], [`OptionalCurrentUser`] or [`AdminUser`]
//! and the extractor resolves the token against the repository.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::UserProfile;
use crate::AppState;

/// Header name for the admin API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Alternative to the `Authorization` header for clients that cannot set it.
pub const SESSION_HEADER: &str = "x-session-token";

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// 32 random bytes, hex encoded.
pub fn generate_session_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Open a session for `user`. Returns the token and its expiry timestamp.
pub async fn open_session(
    repo: &Repository,
    user: &UserProfile,
    ttl_hours: i64,
) -> Result<(String, String), AppError> {
    // every sign-in sweeps the sessions that ran out
    let purged = repo.purge_expired_sessions().await?;
    if purged > 0 {
        tracing::debug!(purged, "Expired sessions purged");
    }

    let token = generate_session_token();
    let expires_at = crate::db::format_timestamp(Utc::now() + Duration::hours(ttl_hours));

    repo.create_session(&user.uid, &hash_token(&token), &expires_at)
        .await?;

    tracing::debug!(user_id = %user.uid, "Session opened");
    Ok((token, expires_at))
}

/// Perform constant-time string comparison.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Token from `Authorization: Bearer` or the session header.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "));

    bearer
        .or_else(|| headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// The user behind the request's session. Rejects with `UNAUTHORIZED`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: UserProfile,
    /// Hash of the presented token, used to end the session on logout
    pub token_hash: String,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Sign in to continue".to_string()))?;

        let token_hash = hash_token(&token);
        let user = state
            .repo
            .find_session_user(&token_hash)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Session expired or invalid".to_string()))?;

        Ok(Self { user, token_hash })
    }
}

/// Like [`CurrentUser`], but anonymous requests pass through.
#[derive(Debug, Clone)]
pub struct OptionalCurrentUser(pub Option<UserProfile>);

impl FromRequestParts<AppState> for OptionalCurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(current) => Ok(Self(Some(current.user))),
            Err(AppError::Unauthorized(_)) => Ok(Self(None)),
            Err(e) => Err(e),
        }
    }
}

/// An administrator session, or a request carrying the admin API key.
/// The key grants access without a user, hence the `Option`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Option<UserProfile>);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(expected) = &state.config.admin_api_key {
            let provided = parts
                .headers
                .get(API_KEY_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
                .or_else(|| extract_token(&parts.headers));

            if let Some(provided) = provided {
                if constant_time_compare(&provided, expected) {
                    return Ok(Self(None));
                }
            }
        }

        let current = CurrentUser::from_request_parts(parts, state).await?;
        if !current.user.is_admin {
            return Err(AppError::Forbidden("Administrator access required".to_string()));
        }

        Ok(Self(Some(current.user)))
    }
}

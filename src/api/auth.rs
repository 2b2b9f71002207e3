//! Account and session endpoints.

use axum::extract::State;
use serde::Serialize;

use super::{required, success, ApiResult, AppJson};
use crate::auth::{self, CurrentUser};
use crate::db::NewUser;
use crate::errors::AppError;
use crate::models::{
    is_valid_email, normalize_email, AuthResponse, LoginRequest, PasswordResetRequest,
    RegisterRequest, UserProfile,
};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PasswordResetResponse {
    pub email: String,
    pub message: String,
}

/// POST /api/auth/register - Create an account and sign it in.
pub async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    let email = normalize_email(&request.email);
    if !is_valid_email(&email) {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    auth::validate_password(&request.password)?;
    let name = required(&request.name, "Name")?;
    let surname = required(&request.surname, "Surname")?;

    let user = state
        .repo
        .create_user(&NewUser {
            is_admin: state.config.is_admin_email(&email),
            email,
            password_hash: auth::hash_password(&request.password)?,
            name,
            surname,
            birth_date: request.birth_date.trim().to_string(),
            gender: request.gender.trim().to_string(),
            email_verified: false,
            photo_url: None,
        })
        .await?;

    let (token, expires_at) =
        auth::open_session(&state.repo, &user, state.config.session_ttl_hours).await?;

    success(AuthResponse {
        token,
        expires_at,
        user,
    })
}

/// POST /api/auth/login - Exchange email and password for a session.
pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let Some((user, password_hash)) = state.repo.find_credentials(&request.email).await? else {
        return Err(AppError::InvalidCredentials);
    };

    if !auth::verify_password(&request.password, &password_hash)? {
        tracing::debug!(user_id = %user.uid, "Login rejected");
        return Err(AppError::InvalidCredentials);
    }

    let user = state.repo.touch_last_login(&user.uid).await?;
    let (token, expires_at) =
        auth::open_session(&state.repo, &user, state.config.session_ttl_hours).await?;

    success(AuthResponse {
        token,
        expires_at,
        user,
    })
}

/// POST /api/auth/logout - End the current session.
pub async fn logout(State(state): State<AppState>, current: CurrentUser) -> ApiResult<bool> {
    success(state.repo.delete_session(&current.token_hash).await?)
}

/// GET /api/auth/me - The signed-in account.
pub async fn current_user(current: CurrentUser) -> ApiResult<UserProfile> {
    success(current.user)
}

/// POST /api/auth/verify-email - Mark the signed-in account's email verified.
pub async fn verify_email(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<UserProfile> {
    success(state.repo.set_email_verified(&current.user.uid).await?)
}

/// POST /api/auth/password-reset - Request a reset for a known email.
/// No mail is sent.
pub async fn request_password_reset(
    State(state): State<AppState>,
    AppJson(request): AppJson<PasswordResetRequest>,
) -> ApiResult<PasswordResetResponse> {
    let email = normalize_email(&request.email);
    if state.repo.get_user_by_email(&email).await?.is_none() {
        return Err(AppError::NotFound(
            "No account is registered with this email".to_string(),
        ));
    }

    tracing::info!("Password reset requested");

    success(PasswordResetResponse {
        message: format!("Password reset instructions sent to {}", email),
        email,
    })
}

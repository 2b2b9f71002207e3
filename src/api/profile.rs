//! Profile page endpoints.

use axum::extract::State;
use chrono::Utc;

use super::{required, success, ApiResult, AppJson};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{age_on, ProfileResponse, UpdateProfileRequest, UserProfile};
use crate::AppState;

/// GET /api/profile - The signed-in user with their reports.
///
/// Reports submitted under the user's email but not yet linked are linked first.
pub async fn get_profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<ProfileResponse> {
    let uid = current.user.uid.clone();
    state.repo.reconcile_email_reports(&current.user).await?;

    let user = state
        .repo
        .get_user(&uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;
    let reports = state.repo.reports_for_user(&uid).await?;

    success(ProfileResponse {
        age: age_on(&user.birth_date, Utc::now().date_naive()),
        report_count: reports.len(),
        reports,
        user,
    })
}

/// PUT /api/profile - Edit name, surname, birth date and gender.
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    AppJson(request): AppJson<UpdateProfileRequest>,
) -> ApiResult<UserProfile> {
    let trimmed = UpdateProfileRequest {
        name: request.name.as_deref().map(|v| required(v, "Name")).transpose()?,
        surname: request
            .surname
            .as_deref()
            .map(|v| required(v, "Surname"))
            .transpose()?,
        birth_date: request
            .birth_date
            .as_deref()
            .map(|v| required(v, "Birth date"))
            .transpose()?,
        gender: request
            .gender
            .as_deref()
            .map(|v| required(v, "Gender"))
            .transpose()?,
    };

    success(state.repo.update_profile(&current.user.uid, &trimmed).await?)
}

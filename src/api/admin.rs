//! Admin dashboard endpoints. Every handler requires an [`AdminUser`].

use axum::extract::{Path, State};

use super::{required, success, ApiResult, AppJson};
use crate::auth::{self, AdminUser};
use crate::models::{
    is_valid_email, AdminStats, ContactMessage, CreateTeamProfileRequest, Dashboard,
    ImportSummary, LegacyUserImport, TeamProfile, UserProfile,
};
use crate::AppState;

/// How many contacts and reports the dashboard shows.
const DASHBOARD_RECENT: i64 = 5;

/// GET /api/admin/stats
pub async fn get_stats(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<AdminStats> {
    success(state.repo.get_stats().await?)
}

/// GET /api/admin/dashboard - Counts plus the latest contacts and reports.
pub async fn get_dashboard(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Dashboard> {
    success(Dashboard {
        stats: state.repo.get_stats().await?,
        recent_contacts: state.repo.list_contacts(Some(DASHBOARD_RECENT)).await?,
        recent_reports: state.repo.recent_reports(DASHBOARD_RECENT).await?,
    })
}

/// GET /api/admin/contacts - All contact messages, newest first.
pub async fn list_contacts(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Vec<ContactMessage>> {
    success(state.repo.list_contacts(None).await?)
}

/// PUT /api/admin/contacts/:id/read
pub async fn mark_contact_read(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<ContactMessage> {
    success(state.repo.mark_contact_read(&id).await?)
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Vec<UserProfile>> {
    success(state.repo.list_users().await?)
}

/// POST /api/admin/users/:id/promote - Grant the administrator role.
pub async fn promote_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<UserProfile> {
    let user = state.repo.set_admin(&id, true).await?;
    tracing::info!(
        user_id = %id,
        by = admin.as_ref().map(|a| a.uid.as_str()).unwrap_or("api-key"),
        "User promoted to admin"
    );
    success(user)
}

/// POST /api/admin/users/:id/demote - Revoke the administrator role.
pub async fn demote_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<UserProfile> {
    let user = state.repo.set_admin(&id, false).await?;
    tracing::info!(
        user_id = %id,
        by = admin.as_ref().map(|a| a.uid.as_str()).unwrap_or("api-key"),
        "Admin role revoked"
    );
    success(user)
}

/// DELETE /api/admin/users/:id - Delete an account. Its reports are kept.
pub async fn delete_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<String> {
    state.repo.delete_user(&id).await?;
    success(id)
}

/// POST /api/admin/users/import - Import accounts exported from local storage.
///
/// Plaintext passwords are hashed on the way in. Existing emails, malformed
/// emails and empty passwords are skipped.
pub async fn import_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    AppJson(import): AppJson<LegacyUserImport>,
) -> ApiResult<ImportSummary> {
    let mut summary = ImportSummary::default();

    for legacy in &import.users {
        if !is_valid_email(&legacy.email) || legacy.password.is_empty() {
            summary.skipped.push(legacy.email.clone());
            continue;
        }

        let is_admin = legacy.is_admin || state.config.is_admin_email(&legacy.email);
        let password_hash = auth::hash_password(&legacy.password)?;

        match state
            .repo
            .import_legacy_user(legacy, password_hash, is_admin)
            .await?
        {
            Some(linked) => {
                tracing::debug!(legacy_uid = ?legacy.uid, linked, "Imported legacy account");
                summary.imported += 1;
                summary.linked_reports += linked as usize;
            }
            None => summary.skipped.push(legacy.email.clone()),
        }
    }

    tracing::info!(
        imported = summary.imported,
        skipped = summary.skipped.len(),
        logged_user = ?import.logged_user,
        "Legacy accounts imported"
    );

    success(summary)
}

/// POST /api/admin/team - Add a team profile.
pub async fn create_team_member(
    State(state): State<AppState>,
    _admin: AdminUser,
    AppJson(request): AppJson<CreateTeamProfileRequest>,
) -> ApiResult<TeamProfile> {
    let request = CreateTeamProfileRequest {
        name: required(&request.name, "Name")?,
        description: request.description.trim().to_string(),
        ..request
    };
    success(state.repo.create_team_member(&request).await?)
}

/// DELETE /api/admin/team/:id
pub async fn delete_team_member(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<String> {
    state.repo.delete_team_member(&id).await?;
    success(id)
}

//! Contact form and public team roster.

use axum::extract::State;

use super::{required, success, ApiResult, AppJson};
use crate::errors::AppError;
use crate::models::{is_valid_email, ContactMessage, CreateContactRequest, TeamProfile};
use crate::AppState;

/// POST /api/contact - Send a message through the contact form.
pub async fn send_contact(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateContactRequest>,
) -> ApiResult<ContactMessage> {
    let request = CreateContactRequest {
        name: required(&request.name, "Name")?,
        email: required(&request.email, "Email")?,
        message: required(&request.message, "Message")?,
    };
    if !is_valid_email(&request.email) {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }

    let message = state.repo.create_contact(&request).await?;
    tracing::info!(contact_id = %message.id, "Contact message received");

    success(message)
}

/// GET /api/team - The team roster.
pub async fn list_team(State(state): State<AppState>) -> ApiResult<Vec<TeamProfile>> {
    success(state.repo.list_team().await?)
}

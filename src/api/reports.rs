//! Report API endpoints.

use axum::extract::{Multipart, Path, State};

use super::uploads::next_field;
use super::{success, ApiResult, AppJson};
use crate::auth::OptionalCurrentUser;
use crate::db::NewReport;
use crate::errors::AppError;
use crate::models::{
    default_description, normalize_email, split_severity, validate_coordinates, AddCommentRequest,
    CreateReportRequest, Report, UpdateReportRequest, UserProfile,
};
use crate::storage::StoredObject;
use crate::AppState;

/// GET /api/reports - List all reports.
pub async fn list_reports(State(state): State<AppState>) -> ApiResult<Vec<Report>> {
    success(state.repo.list_reports().await?)
}

/// GET /api/reports/:id - Get a single report.
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Report> {
    match state.repo.get_report(&id).await? {
        Some(report) => success(report),
        None => Err(AppError::NotFound(format!("Report {} not found", id))),
    }
}

/// POST /api/reports - Create a report. A signed-in submitter becomes its owner.
pub async fn create_report(
    State(state): State<AppState>,
    OptionalCurrentUser(user): OptionalCurrentUser,
    AppJson(request): AppJson<CreateReportRequest>,
) -> ApiResult<Report> {
    let new_report = prepare_new_report(request, user.as_ref())?;
    success(store_new_report(&state, new_report).await?)
}

/// PUT /api/reports/:id - Update a report.
pub async fn update_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(request): AppJson<UpdateReportRequest>,
) -> ApiResult<Report> {
    success(apply_update(&state, &id, request).await?)
}

/// DELETE /api/reports/:id - Delete a report.
pub async fn delete_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<String> {
    state.repo.delete_report(&id).await?;

    if let Err(e) = state.search.remove_report(&id).await {
        tracing::warn!("Failed to remove report from index: {}", e);
    }

    success(id)
}

/// POST /api/reports/:id/comments - Append a comment.
pub async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(request): AppJson<AddCommentRequest>,
) -> ApiResult<Report> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("Comment cannot be empty".to_string()));
    }

    let report = state.repo.add_comment(&id, text).await?;
    reindex(&state, &report).await;

    success(report)
}

struct PendingImage {
    file_name: String,
    content_type: String,
    data: Vec<u8>,
}

/// POST /api/reports/submit - Sidebar form submission.
///
/// Multipart fields: `report` (JSON), optional `image` file, and optional `id`
/// to edit an existing report instead of creating one. The image is stored
/// only after the report payload has been validated.
pub async fn submit_report(
    State(state): State<AppState>,
    OptionalCurrentUser(user): OptionalCurrentUser,
    mut multipart: Multipart,
) -> ApiResult<Report> {
    let mut report_json = None;
    let mut report_id = None;
    let mut image = None;

    while let Some(field) = next_field(&mut multipart).await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "report" => report_json = Some(read_text(field).await?),
            "id" => {
                report_id = Some(read_text(field).await?.trim().to_string()).filter(|s| !s.is_empty())
            }
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read image: {}", e)))?;
                // an empty file input still sends the part
                if !data.is_empty() {
                    image = Some(PendingImage {
                        file_name,
                        content_type,
                        data: data.to_vec(),
                    });
                }
            }
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let report_json =
        report_json.ok_or_else(|| AppError::Validation("Missing report field".to_string()))?;

    match report_id {
        Some(id) => {
            let mut request: UpdateReportRequest = serde_json::from_str(&report_json)
                .map_err(|e| AppError::Validation(format!("Invalid report: {}", e)))?;
            validate_update(&request)?;

            let stored = match image {
                Some(image) => Some(store_image(&state, image).await?),
                None => None,
            };
            if let Some(object) = &stored {
                request.image_url = Some(Some(object.url.clone()));
            }

            let result = apply_update(&state, &id, request).await;
            if let (Err(_), Some(object)) = (&result, &stored) {
                discard_image(&state, &object.key).await;
            }
            success(result?)
        }
        None => {
            let request: CreateReportRequest = serde_json::from_str(&report_json)
                .map_err(|e| AppError::Validation(format!("Invalid report: {}", e)))?;
            let mut new_report = prepare_new_report(request, user.as_ref())?;

            let stored = match image {
                Some(image) => Some(store_image(&state, image).await?),
                None => None,
            };
            if let Some(object) = &stored {
                new_report.image_url = Some(object.url.clone());
            }

            let result = store_new_report(&state, new_report).await;
            if let (Err(_), Some(object)) = (&result, &stored) {
                discard_image(&state, &object.key).await;
            }
            success(result?)
        }
    }
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read form field: {}", e)))
}

async fn store_image(state: &AppState, image: PendingImage) -> Result<StoredObject, AppError> {
    state
        .storage
        .put_image(&image.file_name, &image.content_type, &image.data)
        .await
}

/// Drop an image whose report was never saved.
async fn discard_image(state: &AppState, key: &str) {
    if let Err(e) = state.storage.remove(key).await {
        tracing::warn!(key = %key, "Failed to remove orphaned image: {}", e);
    }
}

/// Validate a creation payload and fill in its defaults.
fn prepare_new_report(
    request: CreateReportRequest,
    user: Option<&UserProfile>,
) -> Result<NewReport, AppError> {
    let (latitude, longitude) = validate_coordinates(request.latitude, request.longitude)?;
    let (severity, status) = split_severity(request.severity, request.status);

    let description = match request.description.trim() {
        "" => default_description(request.barrier_type),
        text => text.to_string(),
    };

    let submitter_email = user
        .map(|u| u.email.clone())
        .or(request.submitter_email)
        .map(|e| normalize_email(&e))
        .filter(|e| !e.is_empty());

    Ok(NewReport {
        street: request.street.trim().to_string(),
        description,
        extra_info: request
            .extra_info
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        image_url: request.image_url.filter(|s| !s.trim().is_empty()),
        latitude,
        longitude,
        barrier_type: request.barrier_type,
        severity,
        status,
        comments: request
            .comments
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        submitter_id: user.map(|u| u.uid.clone()),
        submitter_email,
    })
}

async fn store_new_report(state: &AppState, new_report: NewReport) -> Result<Report, AppError> {
    let report = state.repo.create_report(&new_report).await?;
    reindex(state, &report).await;
    Ok(report)
}

/// Coordinates sent with an edit must still place the report on the map.
fn validate_update(request: &UpdateReportRequest) -> Result<(), AppError> {
    if request.latitude.is_some() || request.longitude.is_some() {
        // an absent coordinate keeps its stored value
        validate_coordinates(
            request.latitude.or(Some(0.0)),
            request.longitude.or(Some(0.0)),
        )?;
    }
    Ok(())
}

async fn apply_update(
    state: &AppState,
    id: &str,
    mut request: UpdateReportRequest,
) -> Result<Report, AppError> {
    validate_update(&request)?;

    request.description = request
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    request.street = request.street.map(|s| s.trim().to_string());

    let (severity, status) = split_severity(request.severity, request.status);
    let report = state
        .repo
        .update_report(id, &request, severity, status)
        .await?;

    reindex(state, &report).await;
    Ok(report)
}

async fn reindex(state: &AppState, report: &Report) {
    if let Err(e) = state.search.index_report(report).await {
        tracing::warn!("Failed to index report: {}", e);
    }
}

//! Image upload endpoint.

use axum::extract::{multipart::Field, Multipart, State};
use serde::Serialize;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::storage::StoredObject;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub key: String,
}

/// POST /api/uploads - Store an image sent as the multipart `file` field.
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<UploadResponse> {
    while let Some(field) = next_field(&mut multipart).await? {
        if field.name() == Some("file") {
            let object = store_image_field(&state, field).await?;
            return success(UploadResponse {
                url: object.url,
                key: object.key,
            });
        }
    }

    Err(AppError::Validation("No file provided".to_string()))
}

pub(crate) async fn next_field(multipart: &mut Multipart) -> Result<Option<Field<'_>>, AppError> {
    multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read multipart body: {}", e)))
}

/// Write a multipart file field to the object store.
pub(crate) async fn store_image_field(
    state: &AppState,
    field: Field<'_>,
) -> Result<StoredObject, AppError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read file data: {}", e)))?;

    state
        .storage
        .put_image(&file_name, &content_type, &data)
        .await
}

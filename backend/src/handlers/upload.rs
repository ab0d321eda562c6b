//! Upload HTTP handlers

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::error::{AppError, AppResult};
use crate::external::ImagePayload;
use crate::middleware::CurrentUser;
use crate::services::upload::{Base64UploadInput, UploadService, UploadedFile, UploadedImages};
use crate::AppState;

/// Store one multipart `file` and return its public URL
pub async fn upload_file(
    State(state): State<AppState>,
    _user: CurrentUser,
    multipart: Multipart,
) -> AppResult<Json<UploadedFile>> {
    let file = read_image(multipart).await?;
    let service = UploadService::new(state.storage.clone());
    Ok(Json(service.upload_file(file).await?))
}

/// Store base64 images (ML crops) and map their names to URLs
pub async fn upload_base64(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(input): Json<Base64UploadInput>,
) -> AppResult<Json<UploadedImages>> {
    let service = UploadService::new(state.storage.clone());
    Ok(Json(service.upload_base64(input).await?))
}

/// Pull the `file` field out of a multipart body
pub(crate) async fn read_image(mut multipart: Multipart) -> AppResult<ImagePayload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationError(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::ValidationError(format!("Failed to read file: {}", e)))?;

        return Ok(ImagePayload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(AppError::validation(
        "file",
        "No file uploaded",
        "Tidak ada berkas yang diunggah",
    ))
}

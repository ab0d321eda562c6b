//! Image upload service backed by object storage

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use shared::{validate_file_name, validate_image_content_type, validate_name};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::external::{ImagePayload, ObjectStorageClient};

#[derive(Clone)]
pub struct UploadService {
    storage: ObjectStorageClient,
}

/// One base64 image, usually a crop returned by the detection service
#[derive(Debug, Serialize, Deserialize)]
pub struct Base64Image {
    pub base64: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct Base64UploadInput {
    #[validate(length(min = 1, message = "At least one image is required"))]
    pub images: Vec<Base64Image>,
}

#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct UploadedImages {
    pub urls: BTreeMap<String, String>,
}

impl UploadService {
    pub fn new(storage: ObjectStorageClient) -> Self {
        Self { storage }
    }

    pub async fn upload_file(&self, file: ImagePayload) -> AppResult<UploadedFile> {
        validate_image_content_type(&file.content_type)
            .map_err(|m| AppError::invalid_field("file", m))?;
        validate_file_name(&file.file_name).map_err(|m| AppError::invalid_field("file", m))?;
        if file.bytes.is_empty() {
            return Err(AppError::invalid_field("file", "File is empty"));
        }

        let url = self
            .storage
            .upload(file.bytes, &file.file_name, &file.content_type)
            .await?;
        Ok(UploadedFile { url })
    }

    /// Store every image as `<name>.png` and map names to public URLs
    pub async fn upload_base64(&self, input: Base64UploadInput) -> AppResult<UploadedImages> {
        input.validate()?;

        let mut urls = BTreeMap::new();
        for image in input.images {
            validate_name(&image.name).map_err(|m| AppError::invalid_field("name", m))?;
            let file_name = format!("{}.png", image.name);
            validate_file_name(&file_name).map_err(|m| AppError::invalid_field("name", m))?;

            let bytes = decode_image(&image.base64)?;
            let url = self.storage.upload(bytes, &file_name, "image/png").await?;
            urls.insert(image.name, url);
        }

        tracing::info!(count = urls.len(), "Base64 images uploaded");
        Ok(UploadedImages { urls })
    }
}

/// Decode base64, accepting an optional `data:...;base64,` prefix
pub fn decode_image(encoded: &str) -> AppResult<Vec<u8>> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::invalid_field("base64", &format!("Invalid base64 data: {}", e)))?;
    if bytes.is_empty() {
        return Err(AppError::invalid_field("base64", "Image is empty"));
    }
    Ok(bytes)
}

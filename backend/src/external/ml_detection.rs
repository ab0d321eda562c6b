//! Food Detection Client
//!
//! Client for the tray and food detection ML service.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{multipart, Client};

use crate::config::MlConfig;
use crate::error::{AppError, AppResult};

/// Client for the food detection microservice
#[derive(Clone)]
pub struct MlDetectionClient {
    api_url: String,
    http_client: Client,
}

/// Image sent for detection
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// How a tray photo is cropped before food detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayMode {
    /// Per-compartment crops, used for the food list
    Smallest,
    /// Whole tray crop, used for the annotated image
    Largest,
}

impl TrayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrayMode::Smallest => "smallest",
            TrayMode::Largest => "largest",
        }
    }
}

impl MlDetectionClient {
    /// Create a new detection client
    pub fn new(config: &MlConfig) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create ML HTTP client: {}", e)))?;

        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// `{api_url}/predict/{endpoint}` with the JSON query parameters
    pub fn predict_url(&self, endpoint: &str) -> String {
        format!("{}/predict/{}", self.api_url, endpoint)
    }

    /// `{api_url}/predict/{endpoint}/image`
    pub fn image_url(&self, endpoint: &str) -> String {
        format!("{}/predict/{}/image", self.api_url, endpoint)
    }

    /// Run detection and return the raw JSON document
    pub async fn predict(
        &self,
        endpoint: &str,
        conf_threshold: f64,
        image: &ImagePayload,
    ) -> AppResult<serde_json::Value> {
        let url = self.predict_url(endpoint);
        let conf = conf_threshold.to_string();
        tracing::debug!(url = %url, bytes = image.bytes.len(), "Calling detection service");

        let response = self
            .http_client
            .post(&url)
            .query(&[
                ("conf_threshold", conf.as_str()),
                ("tray_mode", TrayMode::Smallest.as_str()),
                ("include_images", "1"),
            ])
            .multipart(form(image)?)
            .send()
            .await
            .map_err(|e| AppError::MlService {
                status: None,
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(status = %status, body = %body, "Detection service rejected request");
            return Err(AppError::MlService {
                status: Some(status.as_u16()),
                message: body,
            });
        }

        response.json().await.map_err(|e| AppError::MlService {
            status: None,
            message: format!("Failed to parse response: {}", e),
        })
    }

    /// Fetch the annotated tray image as base64
    pub async fn annotated_image(
        &self,
        endpoint: &str,
        conf_threshold: f64,
        image: &ImagePayload,
    ) -> AppResult<String> {
        let conf = conf_threshold.to_string();

        let response = self
            .http_client
            .post(self.image_url(endpoint))
            .query(&[
                ("conf_threshold", conf.as_str()),
                ("tray_mode", TrayMode::Largest.as_str()),
            ])
            .multipart(form(image)?)
            .send()
            .await
            .map_err(|e| AppError::MlService {
                status: None,
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(AppError::MlService {
                status: Some(response.status().as_u16()),
                message: "Annotated image unavailable".to_string(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| AppError::MlService {
            status: None,
            message: format!("Failed to read image: {}", e),
        })?;

        Ok(STANDARD.encode(bytes))
    }
}

fn form(image: &ImagePayload) -> AppResult<multipart::Form> {
    let part = multipart::Part::bytes(image.bytes.clone())
        .file_name(image.file_name.clone())
        .mime_str(&image.content_type)
        .map_err(|e| AppError::ValidationError(format!("Invalid content type: {}", e)))?;

    Ok(multipart::Form::new().part("file", part))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_url: &str) -> MlConfig {
        MlConfig {
            api_url: api_url.to_string(),
            timeout_secs: 5,
            default_endpoint: "pipeline".to_string(),
            default_conf_threshold: 0.6,
            max_detected_foods: 5,
        }
    }

    #[test]
    fn test_urls_strip_trailing_slash() {
        let client = MlDetectionClient::new(&config("http://ml:5000/")).unwrap();
        assert_eq!(client.predict_url("pipeline"), "http://ml:5000/predict/pipeline");
        assert_eq!(client.image_url("food"), "http://ml:5000/predict/food/image");
    }

    #[test]
    fn test_tray_modes() {
        assert_eq!(TrayMode::Smallest.as_str(), "smallest");
        assert_eq!(TrayMode::Largest.as_str(), "largest");
    }
}

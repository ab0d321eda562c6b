//! Detection HTTP handler

use axum::{
    extract::{Multipart, Query, State},
    Json,
};

use crate::error::AppResult;
use crate::handlers::upload::read_image;
use crate::middleware::CurrentUser;
use crate::services::detection::{DetectionOutcome, DetectionQuery, DetectionService};
use crate::AppState;

/// Detect foods on a tray photo and evaluate them
pub async fn detect(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<DetectionQuery>,
    multipart: Multipart,
) -> AppResult<Json<DetectionOutcome>> {
    let image = read_image(multipart).await?;
    tracing::debug!(
        user_id = %user.user_id,
        file = %image.file_name,
        bytes = image.bytes.len(),
        "Detection requested"
    );

    let service = DetectionService::new(state.db.clone(), state.ml.clone(), state.config.ml.clone());
    let outcome = service.detect(image, query, &state.rules).await?;
    Ok(Json(outcome))
}

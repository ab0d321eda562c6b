//! Nutrition evaluation HTTP handlers

use axum::{extract::State, Json};
use serde::Deserialize;
use shared::nutrition::{NutritionReport, PortionSize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::nutrition::{EvaluateInput, NutritionService};
use crate::AppState;

/// `?portion=small&threshold_id=...` on evaluation endpoints
#[derive(Debug, Default, Deserialize)]
pub struct EvaluationQuery {
    #[serde(default)]
    pub portion: PortionSize,
    pub threshold_id: Option<Uuid>,
}

/// Totals and verdict for an arbitrary food list
pub async fn evaluate_nutrition(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(input): Json<EvaluateInput>,
) -> AppResult<Json<NutritionReport>> {
    let service = NutritionService::new(state.db.clone());
    let report = service.evaluate(input, &state.rules).await?;
    Ok(Json(report))
}

//! Dashboard HTTP handler

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::dashboard::{Dashboard, DashboardService};
use crate::AppState;

/// Counts, recent daily menus and the default AKG
pub async fn get_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Dashboard>> {
    let service = DashboardService::new(state.db.clone());
    let dashboard = service.summary(&user, &state.rules).await?;
    Ok(Json(dashboard))
}

//! Profile HTTP handlers

use axum::{extract::State, response::IntoResponse, Json};

use crate::middleware::CurrentUser;
use crate::services::profile::{ProfileService, UpdateProfileInput};
use crate::AppState;

pub async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> impl IntoResponse {
    let service = ProfileService::new(state.db.clone());

    match service.get(&user).await {
        Ok(profile) => Json(profile).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<UpdateProfileInput>,
) -> impl IntoResponse {
    let service = ProfileService::new(state.db.clone());

    match service.update(&user, input).await {
        Ok(profile) => Json(profile).into_response(),
        Err(e) => e.into_response(),
    }
}

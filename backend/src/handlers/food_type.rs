//! Food catalog HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::middleware::CurrentUser;
use crate::services::food_type::{CreateFoodTypeInput, FoodTypeService, UpdateFoodTypeInput};
use crate::AppState;

/// List the catalog ordered by name
pub async fn list_food_types(State(state): State<AppState>, _user: CurrentUser) -> impl IntoResponse {
    let service = FoodTypeService::new(state.db.clone());

    match service.list().await {
        Ok(food_types) => Json(food_types).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_food_type(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let service = FoodTypeService::new(state.db.clone());

    match service.get(id).await {
        Ok(food_type) => Json(food_type).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_food_type(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateFoodTypeInput>,
) -> impl IntoResponse {
    if let Err(e) = user.require_admin() {
        return e.into_response();
    }
    let service = FoodTypeService::new(state.db.clone());

    match service.create(input).await {
        Ok(food_type) => (StatusCode::CREATED, Json(food_type)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_food_type(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateFoodTypeInput>,
) -> impl IntoResponse {
    if let Err(e) = user.require_admin() {
        return e.into_response();
    }
    let service = FoodTypeService::new(state.db.clone());

    match service.update(id, input).await {
        Ok(food_type) => Json(food_type).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_food_type(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(e) = user.require_admin() {
        return e.into_response();
    }
    let service = FoodTypeService::new(state.db.clone());

    match service.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

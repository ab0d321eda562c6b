//! AKG threshold HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::middleware::CurrentUser;
use crate::services::akg::{AkgService, CreateAkgInput, UpdateAkgInput};
use crate::AppState;

/// List AKG records ordered by name
pub async fn list_akg(State(state): State<AppState>, _user: CurrentUser) -> impl IntoResponse {
    let service = AkgService::new(state.db.clone());

    match service.list().await {
        Ok(records) => Json(records).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_akg(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let service = AkgService::new(state.db.clone());

    match service.get(id).await {
        Ok(akg) => Json(akg).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_akg(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateAkgInput>,
) -> impl IntoResponse {
    if let Err(e) = user.require_admin() {
        return e.into_response();
    }
    let service = AkgService::new(state.db.clone());

    match service.create(input).await {
        Ok(akg) => (StatusCode::CREATED, Json(akg)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_akg(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateAkgInput>,
) -> impl IntoResponse {
    if let Err(e) = user.require_admin() {
        return e.into_response();
    }
    let service = AkgService::new(state.db.clone());

    match service.update(id, input).await {
        Ok(akg) => Json(akg).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_akg(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(e) = user.require_admin() {
        return e.into_response();
    }
    let service = AkgService::new(state.db.clone());

    match service.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

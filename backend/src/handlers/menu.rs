//! Menu template HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::handlers::nutrition::EvaluationQuery;
use crate::middleware::CurrentUser;
use crate::services::menu::{CreateMenuInput, MenuService, PromoteDailyMenuInput, UpdateMenuInput};
use crate::AppState;

/// List menus, newest first
pub async fn list_menus(State(state): State<AppState>, _user: CurrentUser) -> impl IntoResponse {
    let service = MenuService::new(state.db.clone());

    match service.list().await {
        Ok(menus) => Json(menus).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_menu(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let service = MenuService::new(state.db.clone());

    match service.get(id).await {
        Ok(menu) => Json(menu).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_menu(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateMenuInput>,
) -> impl IntoResponse {
    if let Err(e) = user.require_admin() {
        return e.into_response();
    }
    let service = MenuService::new(state.db.clone());

    match service.create(input).await {
        Ok(menu) => (StatusCode::CREATED, Json(menu)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_menu(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateMenuInput>,
) -> impl IntoResponse {
    if let Err(e) = user.require_admin() {
        return e.into_response();
    }
    let service = MenuService::new(state.db.clone());

    match service.update(id, input).await {
        Ok(menu) => Json(menu).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_menu(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(e) = user.require_admin() {
        return e.into_response();
    }
    let service = MenuService::new(state.db.clone());

    match service.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Totals and AKG verdict of a menu
pub async fn evaluate_menu(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(query): Query<EvaluationQuery>,
) -> impl IntoResponse {
    let service = MenuService::new(state.db.clone());

    match service
        .evaluate(id, query.portion, query.threshold_id, &state.rules)
        .await
    {
        Ok(report) => Json(report).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Save a recorded daily menu as a reusable menu
pub async fn promote_daily_menu(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(daily_menu_id): Path<Uuid>,
    input: Option<Json<PromoteDailyMenuInput>>,
) -> impl IntoResponse {
    if let Err(e) = user.require_admin() {
        return e.into_response();
    }
    let input = input.map(|Json(body)| body).unwrap_or_default();
    let service = MenuService::new(state.db.clone());

    match service.promote_daily_menu(daily_menu_id, &user, input).await {
        Ok(menu) => (StatusCode::CREATED, Json(menu)).into_response(),
        Err(e) => e.into_response(),
    }
}

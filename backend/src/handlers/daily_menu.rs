//! Daily menu HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::handlers::nutrition::EvaluationQuery;
use crate::middleware::CurrentUser;
use crate::services::daily_menu::{
    CreateDailyMenuInput, DailyMenuFilter, DailyMenuService, UpdateDailyMenuInput,
};
use crate::AppState;

/// List daily menus, optionally for one day
pub async fn list_daily_menus(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<DailyMenuFilter>,
) -> impl IntoResponse {
    let service = DailyMenuService::new(state.db.clone());

    match service.list(&user, &filter).await {
        Ok(daily_menus) => Json(daily_menus).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_daily_menu(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let service = DailyMenuService::new(state.db.clone());

    match service.get(id, &user).await {
        Ok(daily_menu) => Json(daily_menu).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Record what was served, for the current user
pub async fn create_daily_menu(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateDailyMenuInput>,
) -> impl IntoResponse {
    let service = DailyMenuService::new(state.db.clone());

    match service.create(&user, input).await {
        Ok(daily_menu) => (StatusCode::CREATED, Json(daily_menu)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_daily_menu(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateDailyMenuInput>,
) -> impl IntoResponse {
    let service = DailyMenuService::new(state.db.clone());

    match service.update(id, &user, input).await {
        Ok(daily_menu) => Json(daily_menu).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_daily_menu(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let service = DailyMenuService::new(state.db.clone());

    match service.delete(id, &user).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn evaluate_daily_menu(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Query(query): Query<EvaluationQuery>,
) -> impl IntoResponse {
    let service = DailyMenuService::new(state.db.clone());

    match service
        .evaluate(id, &user, query.portion, query.threshold_id, &state.rules)
        .await
    {
        Ok(report) => Json(report).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Daily menus as CSV
pub async fn export_daily_menus(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<DailyMenuFilter>,
) -> impl IntoResponse {
    let service = DailyMenuService::new(state.db.clone());

    match service.export_csv(&user, &filter, &state.rules).await {
        Ok(csv) => (
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"daily_menus.csv\"",
                ),
            ],
            csv,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

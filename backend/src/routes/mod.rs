//! Route definitions for the MBG nutrition monitor

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes(state.clone()))
        // Everything else needs a bearer token
        .merge(protected_routes(state))
}

/// Authentication routes
fn auth_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            post(handlers::create_user)
                .route_layer(middleware::from_fn_with_state(state, auth_middleware)),
        )
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .route("/dashboard", get(handlers::get_dashboard))
        .nest("/food-types", food_type_routes())
        .nest("/akg", akg_routes())
        .nest("/menus", menu_routes())
        .nest("/daily-menus", daily_menu_routes())
        .route("/nutrition/evaluate", post(handlers::evaluate_nutrition))
        .route("/detect", post(handlers::detect))
        .route("/upload", post(handlers::upload_file))
        .route("/upload/base64", post(handlers::upload_base64))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Food catalog routes
fn food_type_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_food_types).post(handlers::create_food_type),
        )
        .route(
            "/:id",
            get(handlers::get_food_type)
                .put(handlers::update_food_type)
                .delete(handlers::delete_food_type),
        )
}

/// AKG threshold routes
fn akg_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_akg).post(handlers::create_akg))
        .route(
            "/:id",
            get(handlers::get_akg)
                .put(handlers::update_akg)
                .delete(handlers::delete_akg),
        )
}

/// Menu template routes
fn menu_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_menus).post(handlers::create_menu))
        .route(
            "/:id",
            get(handlers::get_menu)
                .put(handlers::update_menu)
                .delete(handlers::delete_menu),
        )
        .route("/:id/evaluation", get(handlers::evaluate_menu))
        .route(
            "/from-daily-menu/:id",
            post(handlers::promote_daily_menu),
        )
}

/// Daily menu routes
fn daily_menu_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_daily_menus).post(handlers::create_daily_menu),
        )
        .route("/export", get(handlers::export_daily_menus))
        .route(
            "/:id",
            get(handlers::get_daily_menu)
                .put(handlers::update_daily_menu)
                .delete(handlers::delete_daily_menu),
        )
        .route("/:id/evaluation", get(handlers::evaluate_daily_menu))
}

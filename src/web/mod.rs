use axum::{
    http::Method,
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db::services::RecipeService;
use crate::server::config::ServerConfig;
use crate::web::middleware::auth;
use crate::web::routes::*;

pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DatabaseConnection,
    pub recipe_service: Arc<RecipeService>,
    pub config: Arc<ServerConfig>,
}

async fn health_check_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn create_axum_router(db_pool: DatabaseConnection, config: Arc<ServerConfig>) -> Router {
    let recipe_service = Arc::new(RecipeService::with_database_catalog(
        db_pool.clone(),
        config.max_cooking_time,
    ));

    let app_state = Arc::new(AppState {
        db_pool,
        recipe_service,
        config,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .merge(auth_routes::create_auth_router())
        .merge(user_routes::create_user_router())
        .merge(tag_routes::create_tag_router())
        .merge(ingredient_routes::create_ingredient_router())
        .merge(recipe_routes::create_recipe_router())
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth::resolve_actor,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

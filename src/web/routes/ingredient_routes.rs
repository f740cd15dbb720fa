use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::db::entities::ingredient;
use crate::db::services::{ingredient_service, ServiceError};
use crate::web::extract::{ValidJson, ValidQuery};
use crate::web::models::catalog_models::{IngredientPayload, IngredientSearchQuery};
use crate::web::models::Actor;
use crate::web::{AppError, AppState};

async fn list_ingredients_handler(
    State(app_state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<IngredientSearchQuery>,
) -> Result<Json<Vec<ingredient::Model>>, AppError> {
    let ingredients = app_state
        .recipe_service
        .catalog()
        .find_ingredients_by_prefix(query.name.as_deref())
        .await?;
    Ok(Json(ingredients))
}

async fn get_ingredient_handler(
    State(app_state): State<Arc<AppState>>,
    Path(ingredient_id): Path<i32>,
) -> Result<Json<ingredient::Model>, AppError> {
    let ingredient = app_state
        .recipe_service
        .catalog()
        .find_ingredient(ingredient_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Ingredient", ingredient_id))?;
    Ok(Json(ingredient))
}

async fn create_ingredient_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
    ValidJson(payload): ValidJson<IngredientPayload>,
) -> Result<(StatusCode, Json<ingredient::Model>), AppError> {
    let ingredient =
        ingredient_service::create_ingredient(&app_state.db_pool, &actor, payload).await?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}

async fn update_ingredient_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
    Path(ingredient_id): Path<i32>,
    ValidJson(payload): ValidJson<IngredientPayload>,
) -> Result<Json<ingredient::Model>, AppError> {
    let ingredient =
        ingredient_service::update_ingredient(&app_state.db_pool, &actor, ingredient_id, payload)
            .await?;
    Ok(Json(ingredient))
}

async fn delete_ingredient_handler(
    Extension(actor): Extension<Actor>,
    State(app_state): State<Arc<AppState>>,
    Path(ingredient_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    ingredient_service::delete_ingredient(&app_state.db_pool, &actor, ingredient_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn create_ingredient_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/ingredients",
            get(list_ingredients_handler).post(create_ingredient_handler),
        )
        .route(
            "/api/ingredients/{id}",
            get(get_ingredient_handler)
                .put(update_ingredient_handler)
                .patch(update_ingredient_handler)
                .delete(delete_ingredient_handler),
        )
}

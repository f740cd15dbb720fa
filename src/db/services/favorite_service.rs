use chrono::Utc;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, Set};
use tracing::info;

use crate::db::entities::{favorite, recipe};
use crate::db::services::error::{map_write_error, ServiceError};
use crate::db::services::recipe_service::RecipeShort;
use crate::services::policy::Actor;

const ALREADY_FAVORITED: &str = "Recipe is already in favorites.";

pub async fn is_favorited(
    db: &DatabaseConnection,
    user_id: i32,
    recipe_id: i32,
) -> Result<bool, DbErr> {
    Ok(favorite::Entity::find_by_id((user_id, recipe_id))
        .one(db)
        .await?
        .is_some())
}

/// Marks `recipe_id` as a favorite of the caller.
pub async fn add_favorite(
    db: &DatabaseConnection,
    actor: &Actor,
    recipe_id: i32,
) -> Result<RecipeShort, ServiceError> {
    let user = actor.require_user()?;
    let recipe = recipe::Entity::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Recipe", recipe_id))?;
    if is_favorited(db, user.id, recipe_id).await? {
        return Err(ServiceError::AlreadyExists(ALREADY_FAVORITED.to_string()));
    }

    let entry = favorite::ActiveModel {
        user_id: Set(user.id),
        recipe_id: Set(recipe_id),
        created_at: Set(Utc::now()),
    };
    favorite::Entity::insert(entry)
        .exec_without_returning(db)
        .await
        .map_err(|e| map_write_error(e, ALREADY_FAVORITED))?;
    info!(user_id = user.id, recipe_id, "Recipe added to favorites.");
    Ok(RecipeShort::from(&recipe))
}

/// Removing a favorite that does not exist is not an error.
pub async fn remove_favorite(
    db: &DatabaseConnection,
    actor: &Actor,
    recipe_id: i32,
) -> Result<(), ServiceError> {
    let user = actor.require_user()?;
    recipe::Entity::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Recipe", recipe_id))?;
    let result = favorite::Entity::delete_by_id((user.id, recipe_id))
        .exec(db)
        .await?;
    if result.rows_affected > 0 {
        info!(user_id = user.id, recipe_id, "Recipe removed from favorites.");
    }
    Ok(())
}

use chrono::Utc;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::db::entities::{ingredient, recipe, recipe_ingredient, shopping_cart};
use crate::db::services::error::{map_write_error, ServiceError};
use crate::db::services::recipe_service::RecipeShort;
use crate::services::policy::Actor;

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";
const ALREADY_IN_CART: &str = "Recipe is already in the shopping cart.";

/// One summed ingredient across every recipe in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromQueryResult)]
pub struct ShoppingListItem {
    pub ingredient_id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

pub async fn is_in_cart(
    db: &DatabaseConnection,
    user_id: i32,
    recipe_id: i32,
) -> Result<bool, DbErr> {
    Ok(shopping_cart::Entity::find_by_id((user_id, recipe_id))
        .one(db)
        .await?
        .is_some())
}

pub async fn add_to_cart(
    db: &DatabaseConnection,
    actor: &Actor,
    recipe_id: i32,
) -> Result<RecipeShort, ServiceError> {
    let user = actor.require_user()?;
    let recipe = recipe::Entity::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Recipe", recipe_id))?;
    if is_in_cart(db, user.id, recipe_id).await? {
        return Err(ServiceError::AlreadyExists(ALREADY_IN_CART.to_string()));
    }

    let entry = shopping_cart::ActiveModel {
        user_id: Set(user.id),
        recipe_id: Set(recipe_id),
        created_at: Set(Utc::now()),
    };
    shopping_cart::Entity::insert(entry)
        .exec_without_returning(db)
        .await
        .map_err(|e| map_write_error(e, ALREADY_IN_CART))?;
    info!(user_id = user.id, recipe_id, "Recipe added to shopping cart.");
    Ok(RecipeShort::from(&recipe))
}

/// Removing a recipe that is not in the cart is not an error.
pub async fn remove_from_cart(
    db: &DatabaseConnection,
    actor: &Actor,
    recipe_id: i32,
) -> Result<(), ServiceError> {
    let user = actor.require_user()?;
    recipe::Entity::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Recipe", recipe_id))?;
    let result = shopping_cart::Entity::delete_by_id((user.id, recipe_id))
        .exec(db)
        .await?;
    if result.rows_affected > 0 {
        info!(user_id = user.id, recipe_id, "Recipe removed from shopping cart.");
    }
    Ok(())
}

/// Sums ingredient amounts over every recipe in the user's cart, one row per
/// ingredient, ordered by name then unit.
pub async fn build_shopping_list(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<ShoppingListItem>, DbErr> {
    let items = recipe_ingredient::Entity::find()
        .select_only()
        .column_as(ingredient::Column::Id, "ingredient_id")
        .column(ingredient::Column::Name)
        .column(ingredient::Column::MeasurementUnit)
        .column_as(
            Expr::col((recipe_ingredient::Entity, recipe_ingredient::Column::Amount)).sum(),
            "total_amount",
        )
        .join(JoinType::InnerJoin, recipe_ingredient::Relation::Ingredient.def())
        .filter(
            recipe_ingredient::Column::RecipeId.in_subquery(
                Query::select()
                    .column(shopping_cart::Column::RecipeId)
                    .from(shopping_cart::Entity)
                    .and_where(shopping_cart::Column::UserId.eq(user_id))
                    .to_owned(),
            ),
        )
        .group_by(ingredient::Column::Id)
        .group_by(ingredient::Column::Name)
        .group_by(ingredient::Column::MeasurementUnit)
        .order_by_asc(ingredient::Column::Name)
        .order_by_asc(ingredient::Column::MeasurementUnit)
        .into_model::<ShoppingListItem>()
        .all(db)
        .await?;
    debug!(user_id, rows = items.len(), "Shopping list built.");
    Ok(items)
}

pub fn render_shopping_list(items: &[ShoppingListItem]) -> String {
    let mut out = String::from("Shopping list:\n");
    for item in items {
        out.push_str(&format!(
            "{} ({}) - {}\n",
            item.name, item.measurement_unit, item.total_amount
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i32, name: &str, unit: &str, total: i64) -> ShoppingListItem {
        ShoppingListItem {
            ingredient_id: id,
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            total_amount: total,
        }
    }

    #[test]
    fn renders_header_and_one_line_per_item() {
        let text = render_shopping_list(&[item(1, "Flour", "g", 500), item(2, "Milk", "ml", 250)]);
        assert_eq!(text, "Shopping list:\nFlour (g) - 500\nMilk (ml) - 250\n");
    }

    #[test]
    fn empty_cart_renders_only_header() {
        assert_eq!(render_shopping_list(&[]), "Shopping list:\n");
    }
}

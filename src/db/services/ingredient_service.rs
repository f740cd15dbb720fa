use sea_orm::sea_query::{Expr, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use tracing::info;

use crate::db::entities::{ingredient, recipe_ingredient};
use crate::db::services::error::{map_write_error, ServiceError, ValidationError};
use crate::services::policy::{ensure_can_manage_catalog, Actor};
use crate::web::models::catalog_models::IngredientPayload;

const MAX_NAME_LENGTH: usize = 200;
const MAX_UNIT_LENGTH: usize = 200;

// --- Ingredient Service Functions ---

/// Lists ingredients ordered by name, optionally restricted to names starting
/// with `name_prefix` (case-insensitive).
pub async fn list_ingredients(
    db: &DatabaseConnection,
    name_prefix: Option<&str>,
) -> Result<Vec<ingredient::Model>, DbErr> {
    let mut query = ingredient::Entity::find();
    if let Some(prefix) = name_prefix.map(str::trim).filter(|p| !p.is_empty()) {
        let pattern = format!("{}%", escape_like(&search_key(prefix)));
        query = query.filter(
            Expr::col((ingredient::Entity, ingredient::Column::SearchName))
                .like(LikeExpr::new(pattern).escape('\\')),
        );
    }
    query
        .order_by_asc(ingredient::Column::Name)
        .order_by_asc(ingredient::Column::Id)
        .all(db)
        .await
}

/// Case-folded form of an ingredient name. Folding happens here rather than
/// in SQL because SQLite's `LOWER` only folds ASCII.
pub fn search_key(name: &str) -> String {
    name.to_lowercase()
}

pub async fn get_ingredient(
    db: &DatabaseConnection,
    ingredient_id: i32,
) -> Result<Option<ingredient::Model>, DbErr> {
    ingredient::Entity::find_by_id(ingredient_id).one(db).await
}

pub async fn get_ingredients_by_ids(
    db: &DatabaseConnection,
    ids: &[i32],
) -> Result<Vec<ingredient::Model>, DbErr> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    ingredient::Entity::find()
        .filter(ingredient::Column::Id.is_in(ids.iter().copied()))
        .all(db)
        .await
}

pub fn validate_ingredient(payload: &IngredientPayload) -> Result<(), ValidationError> {
    let name = payload.name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::InvalidField {
            field: "name",
            message: format!("Ingredient name must be between 1 and {MAX_NAME_LENGTH} characters."),
        });
    }
    let unit = payload.measurement_unit.trim();
    if unit.is_empty() || unit.chars().count() > MAX_UNIT_LENGTH {
        return Err(ValidationError::InvalidField {
            field: "measurement_unit",
            message: format!("Measurement unit must be between 1 and {MAX_UNIT_LENGTH} characters."),
        });
    }
    Ok(())
}

async fn find_by_name_and_unit(
    db: &DatabaseConnection,
    name: &str,
    unit: &str,
) -> Result<Option<ingredient::Model>, DbErr> {
    ingredient::Entity::find()
        .filter(ingredient::Column::Name.eq(name))
        .filter(ingredient::Column::MeasurementUnit.eq(unit))
        .one(db)
        .await
}

/// Creates a catalog ingredient. Restricted to moderators and admins.
pub async fn create_ingredient(
    db: &DatabaseConnection,
    actor: &Actor,
    payload: IngredientPayload,
) -> Result<ingredient::Model, ServiceError> {
    ensure_can_manage_catalog(actor)?;
    validate_ingredient(&payload)?;
    let name = payload.name.trim().to_string();
    let unit = payload.measurement_unit.trim().to_string();

    if find_by_name_and_unit(db, &name, &unit).await?.is_some() {
        return Err(duplicate(&name, &unit));
    }

    let created = ingredient::ActiveModel {
        search_name: Set(search_key(&name)),
        name: Set(name.clone()),
        measurement_unit: Set(unit.clone()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| map_write_error(e, &duplicate_message(&name, &unit)))?;
    info!(ingredient_id = created.id, name = %created.name, "Ingredient created.");
    Ok(created)
}

pub async fn update_ingredient(
    db: &DatabaseConnection,
    actor: &Actor,
    ingredient_id: i32,
    payload: IngredientPayload,
) -> Result<ingredient::Model, ServiceError> {
    ensure_can_manage_catalog(actor)?;
    let existing = get_ingredient(db, ingredient_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Ingredient", ingredient_id))?;
    validate_ingredient(&payload)?;
    let name = payload.name.trim().to_string();
    let unit = payload.measurement_unit.trim().to_string();

    if let Some(other) = find_by_name_and_unit(db, &name, &unit).await? {
        if other.id != ingredient_id {
            return Err(duplicate(&name, &unit));
        }
    }

    let mut active: ingredient::ActiveModel = existing.into();
    active.search_name = Set(search_key(&name));
    active.name = Set(name.clone());
    active.measurement_unit = Set(unit.clone());
    active
        .update(db)
        .await
        .map_err(|e| map_write_error(e, &duplicate_message(&name, &unit)))
}

/// Deletes an ingredient that no recipe uses. Removing one that is still
/// referenced would leave recipes with a shorter ingredient list than their
/// authors submitted, so that case is a conflict.
pub async fn delete_ingredient(
    db: &DatabaseConnection,
    actor: &Actor,
    ingredient_id: i32,
) -> Result<(), ServiceError> {
    ensure_can_manage_catalog(actor)?;
    get_ingredient(db, ingredient_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Ingredient", ingredient_id))?;

    let usages = recipe_ingredient::Entity::find()
        .filter(recipe_ingredient::Column::IngredientId.eq(ingredient_id))
        .count(db)
        .await?;
    if usages > 0 {
        return Err(ServiceError::Conflict(format!(
            "Ingredient {ingredient_id} is used by {usages} recipe(s)."
        )));
    }

    ingredient::Entity::delete_by_id(ingredient_id)
        .exec(db)
        .await
        .map_err(|e| map_write_error(e, "Ingredient already exists."))?;
    info!(ingredient_id, "Ingredient deleted.");
    Ok(())
}

/// Used by the bulk import: returns the existing row when the
/// (name, measurement_unit) pair is already present. The flag is `true` when
/// a row was inserted.
pub async fn get_or_create_ingredient(
    db: &DatabaseConnection,
    name: &str,
    unit: &str,
) -> Result<(ingredient::Model, bool), DbErr> {
    if let Some(existing) = find_by_name_and_unit(db, name, unit).await? {
        return Ok((existing, false));
    }
    let created = ingredient::ActiveModel {
        search_name: Set(search_key(name)),
        name: Set(name.to_string()),
        measurement_unit: Set(unit.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok((created, true))
}

fn duplicate_message(name: &str, unit: &str) -> String {
    format!("Ingredient '{name}' measured in '{unit}' already exists.")
}

fn duplicate(name: &str, unit: &str) -> ServiceError {
    ServiceError::AlreadyExists(duplicate_message(name, unit))
}

/// Escapes LIKE wildcards so user input matches literally.
pub(crate) fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

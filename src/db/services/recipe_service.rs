//! Recipe aggregate: a recipe row plus its ingredient lines and tags.
//!
//! Every write replaces the whole aggregate inside one transaction, so readers
//! never observe a recipe whose lists are half-updated. Validation and
//! reference checks run before the transaction is opened.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    FromQueryResult, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::db::entities::{
    favorite, ingredient, recipe, recipe_ingredient, recipe_tag, shopping_cart, tag, user,
};
use crate::db::services::catalog::{CatalogRepository, DbCatalog};
use crate::db::services::error::{map_write_error, ServiceError, ValidationError};
use crate::db::services::follow_service;
use crate::db::services::user_service::UserProfile;
use crate::services::policy::{ensure_can_mutate_recipe, Actor};
use crate::web::models::recipe_models::RecipePayload;

pub const MAX_NAME_LENGTH: usize = 200;

/// An ingredient line joined with its catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientAmount {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, FromQueryResult)]
struct IngredientAmountRow {
    recipe_id: i32,
    id: i32,
    name: String,
    measurement_unit: String,
    amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeAggregate {
    pub recipe: recipe::Model,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<tag::Model>,
}

impl RecipeAggregate {
    pub fn ingredient_ids(&self) -> HashSet<i32> {
        self.ingredients.iter().map(|i| i.id).collect()
    }

    pub fn tag_ids(&self) -> HashSet<i32> {
        self.tags.iter().map(|t| t.id).collect()
    }
}

/// Compact representation used by favorites, the cart and subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeShort {
    pub id: i32,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<&recipe::Model> for RecipeShort {
    fn from(recipe: &recipe::Model) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.clone(),
            image: recipe.image.clone(),
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Full recipe as returned to a particular viewer.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeView {
    pub id: i32,
    pub tags: Vec<tag::Model>,
    pub author: UserProfile,
    pub ingredients: Vec<IngredientAmount>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

/// Recipe list filters. The two flags only apply to an authenticated caller
/// and only when set.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author: Option<i32>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Structural checks that need no database access.
pub fn validate_payload(
    payload: &RecipePayload,
    max_cooking_time: i32,
) -> Result<(), ValidationError> {
    if payload.ingredients.is_empty() {
        return Err(ValidationError::EmptyIngredientList);
    }
    let mut seen = HashSet::new();
    for line in &payload.ingredients {
        if !seen.insert(line.id) {
            return Err(ValidationError::DuplicateIngredient(line.id));
        }
        if line.amount < 1 {
            return Err(ValidationError::InvalidAmount {
                ingredient_id: line.id,
                amount: line.amount,
            });
        }
    }

    if payload.tags.is_empty() {
        return Err(ValidationError::EmptyTagList);
    }
    let mut seen = HashSet::new();
    for &tag_id in &payload.tags {
        if !seen.insert(tag_id) {
            return Err(ValidationError::DuplicateTag(tag_id));
        }
    }

    if payload.cooking_time < 1 || payload.cooking_time > max_cooking_time {
        return Err(ValidationError::InvalidCookingTime {
            value: payload.cooking_time,
            max: max_cooking_time,
        });
    }

    let name_length = payload.name.trim().chars().count();
    if name_length == 0 || name_length > MAX_NAME_LENGTH {
        return Err(ValidationError::InvalidName {
            max: MAX_NAME_LENGTH,
        });
    }
    if payload.text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }
    if payload.image.trim().is_empty() {
        return Err(ValidationError::MissingImage);
    }
    Ok(())
}

#[derive(Clone)]
pub struct RecipeService {
    db: DatabaseConnection,
    catalog: Arc<dyn CatalogRepository>,
    max_cooking_time: i32,
}

impl RecipeService {
    pub fn new(
        db: DatabaseConnection,
        catalog: Arc<dyn CatalogRepository>,
        max_cooking_time: i32,
    ) -> Self {
        Self {
            db,
            catalog,
            max_cooking_time,
        }
    }

    /// Service backed by the ingredient and tag tables of `db`.
    pub fn with_database_catalog(db: DatabaseConnection, max_cooking_time: i32) -> Self {
        let catalog = Arc::new(DbCatalog::new(db.clone()));
        Self::new(db, catalog, max_cooking_time)
    }

    pub fn max_cooking_time(&self) -> i32 {
        self.max_cooking_time
    }

    pub fn catalog(&self) -> &dyn CatalogRepository {
        self.catalog.as_ref()
    }

    /// Ingredient ids must exist (`NotFound` otherwise) and tag ids must
    /// exist (`UnknownTag` otherwise).
    async fn check_references(&self, payload: &RecipePayload) -> Result<(), ServiceError> {
        let ingredient_ids: Vec<i32> = payload.ingredients.iter().map(|l| l.id).collect();
        let known: HashSet<i32> = self
            .catalog
            .find_ingredients(&ingredient_ids)
            .await?
            .into_iter()
            .map(|i| i.id)
            .collect();
        if let Some(missing) = ingredient_ids.iter().find(|id| !known.contains(*id)) {
            return Err(ServiceError::not_found("Ingredient", *missing));
        }

        let known: HashSet<i32> = self
            .catalog
            .find_tags(&payload.tags)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();
        if let Some(missing) = payload.tags.iter().find(|id| !known.contains(*id)) {
            return Err(ValidationError::UnknownTag(*missing).into());
        }
        Ok(())
    }

    pub async fn create_recipe(
        &self,
        actor: &Actor,
        payload: RecipePayload,
    ) -> Result<RecipeAggregate, ServiceError> {
        let author = actor.require_user()?;
        validate_payload(&payload, self.max_cooking_time)?;
        self.check_references(&payload).await?;

        let txn = self.db.begin().await?;
        let created = recipe::ActiveModel {
            author_id: Set(author.id),
            name: Set(payload.name.trim().to_string()),
            image: Set(payload.image.clone()),
            text: Set(payload.text.clone()),
            cooking_time: Set(payload.cooking_time),
            pub_date: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| map_write_error(e, "Recipe already exists."))?;
        replace_associations(&txn, created.id, &payload).await?;
        let aggregate = load_aggregate(&txn, created).await?;
        txn.commit().await?;

        info!(
            recipe_id = aggregate.recipe.id,
            author_id = author.id,
            "Recipe created."
        );
        Ok(aggregate)
    }

    /// Replaces every field and both lists of an existing recipe. Permission
    /// is checked before the payload is validated.
    pub async fn update_recipe(
        &self,
        actor: &Actor,
        recipe_id: i32,
        payload: RecipePayload,
    ) -> Result<RecipeAggregate, ServiceError> {
        actor.require_user()?;
        let existing = self.find_recipe(recipe_id).await?;
        ensure_can_mutate_recipe(actor, &existing)?;
        validate_payload(&payload, self.max_cooking_time)?;
        self.check_references(&payload).await?;

        let txn = self.db.begin().await?;
        let mut active: recipe::ActiveModel = existing.into();
        active.name = Set(payload.name.trim().to_string());
        active.image = Set(payload.image.clone());
        active.text = Set(payload.text.clone());
        active.cooking_time = Set(payload.cooking_time);
        let updated = active.update(&txn).await?;
        replace_associations(&txn, recipe_id, &payload).await?;
        let aggregate = load_aggregate(&txn, updated).await?;
        txn.commit().await?;

        info!(recipe_id, "Recipe updated.");
        Ok(aggregate)
    }

    /// Deletes the recipe with its lines, tags and every favorite or cart
    /// entry pointing at it.
    pub async fn delete_recipe(&self, actor: &Actor, recipe_id: i32) -> Result<(), ServiceError> {
        actor.require_user()?;
        let existing = self.find_recipe(recipe_id).await?;
        ensure_can_mutate_recipe(actor, &existing)?;

        let txn = self.db.begin().await?;
        recipe_ingredient::Entity::delete_many()
            .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        recipe_tag::Entity::delete_many()
            .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        favorite::Entity::delete_many()
            .filter(favorite::Column::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        shopping_cart::Entity::delete_many()
            .filter(shopping_cart::Column::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        recipe::Entity::delete_by_id(recipe_id).exec(&txn).await?;
        txn.commit().await?;

        info!(recipe_id, "Recipe deleted.");
        Ok(())
    }

    pub async fn find_recipe(&self, recipe_id: i32) -> Result<recipe::Model, ServiceError> {
        recipe::Entity::find_by_id(recipe_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Recipe", recipe_id))
    }

    pub async fn get_recipe(&self, recipe_id: i32) -> Result<RecipeAggregate, ServiceError> {
        let recipe = self.find_recipe(recipe_id).await?;
        Ok(load_aggregate(&self.db, recipe).await?)
    }

    /// Recipes matching `filter`, newest first.
    pub async fn list_recipes(
        &self,
        actor: &Actor,
        filter: &RecipeFilter,
    ) -> Result<Vec<recipe::Model>, ServiceError> {
        let mut query = recipe::Entity::find();

        if let Some(author_id) = filter.author {
            query = query.filter(recipe::Column::AuthorId.eq(author_id));
        }

        if !filter.tags.is_empty() {
            let tag_ids: Vec<i32> = self
                .catalog
                .find_tags_by_slugs(&filter.tags)
                .await?
                .into_iter()
                .map(|t| t.id)
                .collect();
            if tag_ids.is_empty() {
                return Ok(Vec::new());
            }
            query = query.filter(
                recipe::Column::Id.in_subquery(
                    Query::select()
                        .column(recipe_tag::Column::RecipeId)
                        .from(recipe_tag::Entity)
                        .and_where(recipe_tag::Column::TagId.is_in(tag_ids))
                        .to_owned(),
                ),
            );
        }

        if let Some(user_id) = actor.user_id() {
            if filter.is_favorited {
                query = query.filter(
                    recipe::Column::Id.in_subquery(
                        Query::select()
                            .column(favorite::Column::RecipeId)
                            .from(favorite::Entity)
                            .and_where(favorite::Column::UserId.eq(user_id))
                            .to_owned(),
                    ),
                );
            }
            if filter.is_in_shopping_cart {
                query = query.filter(
                    recipe::Column::Id.in_subquery(
                        Query::select()
                            .column(shopping_cart::Column::RecipeId)
                            .from(shopping_cart::Entity)
                            .and_where(shopping_cart::Column::UserId.eq(user_id))
                            .to_owned(),
                    ),
                );
            }
        }

        let recipes = query
            .order_by_desc(recipe::Column::PubDate)
            .order_by_desc(recipe::Column::Id)
            .all(&self.db)
            .await?;
        debug!(count = recipes.len(), ?filter, "Recipes listed.");
        Ok(recipes)
    }

    pub async fn load_aggregates(
        &self,
        recipes: Vec<recipe::Model>,
    ) -> Result<Vec<RecipeAggregate>, DbErr> {
        load_aggregates(&self.db, recipes).await
    }

    /// Attaches author profiles and the viewer's favorite and cart flags.
    pub async fn describe(
        &self,
        viewer: &Actor,
        aggregates: Vec<RecipeAggregate>,
    ) -> Result<Vec<RecipeView>, ServiceError> {
        let recipe_ids: Vec<i32> = aggregates.iter().map(|a| a.recipe.id).collect();
        let author_ids: Vec<i32> = aggregates
            .iter()
            .map(|a| a.recipe.author_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let (favorited, in_cart, followed) = match viewer.user_id() {
            Some(user_id) => (
                favorite::Entity::find()
                    .filter(favorite::Column::UserId.eq(user_id))
                    .filter(favorite::Column::RecipeId.is_in(recipe_ids.iter().copied()))
                    .all(&self.db)
                    .await?
                    .into_iter()
                    .map(|f| f.recipe_id)
                    .collect::<HashSet<_>>(),
                shopping_cart::Entity::find()
                    .filter(shopping_cart::Column::UserId.eq(user_id))
                    .filter(shopping_cart::Column::RecipeId.is_in(recipe_ids.iter().copied()))
                    .all(&self.db)
                    .await?
                    .into_iter()
                    .map(|c| c.recipe_id)
                    .collect::<HashSet<_>>(),
                follow_service::followed_among(&self.db, user_id, &author_ids).await?,
            ),
            None => Default::default(),
        };

        let authors: HashMap<i32, user::Model> = user::Entity::find()
            .filter(user::Column::Id.is_in(author_ids.iter().copied()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        aggregates
            .into_iter()
            .map(|aggregate| {
                let recipe = aggregate.recipe;
                let author = authors
                    .get(&recipe.author_id)
                    .ok_or_else(|| ServiceError::not_found("User", recipe.author_id))?;
                Ok(RecipeView {
                    id: recipe.id,
                    tags: aggregate.tags,
                    author: UserProfile::new(author, followed.contains(&author.id)),
                    ingredients: aggregate.ingredients,
                    is_favorited: favorited.contains(&recipe.id),
                    is_in_shopping_cart: in_cart.contains(&recipe.id),
                    name: recipe.name,
                    image: recipe.image,
                    text: recipe.text,
                    cooking_time: recipe.cooking_time,
                    pub_date: recipe.pub_date,
                })
            })
            .collect()
    }

    pub async fn describe_one(
        &self,
        viewer: &Actor,
        aggregate: RecipeAggregate,
    ) -> Result<RecipeView, ServiceError> {
        let recipe_id = aggregate.recipe.id;
        self.describe(viewer, vec![aggregate])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::not_found("Recipe", recipe_id))
    }
}

/// Deletes and re-inserts the ingredient lines and tag links of a recipe.
async fn replace_associations<C: ConnectionTrait>(
    db: &C,
    recipe_id: i32,
    payload: &RecipePayload,
) -> Result<(), ServiceError> {
    recipe_ingredient::Entity::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;
    recipe_tag::Entity::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;

    let lines = payload
        .ingredients
        .iter()
        .map(|line| recipe_ingredient::ActiveModel {
            recipe_id: Set(recipe_id),
            ingredient_id: Set(line.id),
            amount: Set(line.amount),
        });
    recipe_ingredient::Entity::insert_many(lines)
        .exec_without_returning(db)
        .await
        .map_err(|e| map_write_error(e, "An ingredient is listed more than once."))?;

    let links = payload.tags.iter().map(|&tag_id| recipe_tag::ActiveModel {
        recipe_id: Set(recipe_id),
        tag_id: Set(tag_id),
    });
    recipe_tag::Entity::insert_many(links)
        .exec_without_returning(db)
        .await
        .map_err(|e| map_write_error(e, "A tag is listed more than once."))?;
    Ok(())
}

async fn load_aggregate<C: ConnectionTrait>(
    db: &C,
    recipe: recipe::Model,
) -> Result<RecipeAggregate, DbErr> {
    let recipe_id = recipe.id;
    load_aggregates(db, vec![recipe])
        .await?
        .pop()
        .ok_or_else(|| DbErr::RecordNotFound(format!("Recipe {recipe_id} not found.")))
}

/// Loads ingredient lines and tags for all `recipes` with two queries,
/// preserving the input order.
pub async fn load_aggregates<C: ConnectionTrait>(
    db: &C,
    recipes: Vec<recipe::Model>,
) -> Result<Vec<RecipeAggregate>, DbErr> {
    if recipes.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = recipes.iter().map(|r| r.id).collect();

    let rows = recipe_ingredient::Entity::find()
        .select_only()
        .column(recipe_ingredient::Column::RecipeId)
        .column_as(ingredient::Column::Id, "id")
        .column(ingredient::Column::Name)
        .column(ingredient::Column::MeasurementUnit)
        .column(recipe_ingredient::Column::Amount)
        .join(JoinType::InnerJoin, recipe_ingredient::Relation::Ingredient.def())
        .filter(recipe_ingredient::Column::RecipeId.is_in(ids.iter().copied()))
        .order_by_asc(ingredient::Column::Name)
        .into_model::<IngredientAmountRow>()
        .all(db)
        .await?;
    let mut ingredients: HashMap<i32, Vec<IngredientAmount>> = HashMap::new();
    for row in rows {
        ingredients
            .entry(row.recipe_id)
            .or_default()
            .push(IngredientAmount {
                id: row.id,
                name: row.name,
                measurement_unit: row.measurement_unit,
                amount: row.amount,
            });
    }

    let links = recipe_tag::Entity::find()
        .find_also_related(tag::Entity)
        .filter(recipe_tag::Column::RecipeId.is_in(ids.iter().copied()))
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await?;
    let mut tags: HashMap<i32, Vec<tag::Model>> = HashMap::new();
    for (link, tag) in links {
        if let Some(tag) = tag {
            tags.entry(link.recipe_id).or_default().push(tag);
        }
    }

    Ok(recipes
        .into_iter()
        .map(|recipe| RecipeAggregate {
            ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
            tags: tags.remove(&recipe.id).unwrap_or_default(),
            recipe,
        })
        .collect())
}

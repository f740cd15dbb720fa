use serde::{Deserialize, Serialize};

use super::deserialize_flag;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientLine {
    pub id: i32,
    pub amount: i32,
}

/// Body of recipe create and update. Update replaces every field, including
/// the full ingredient and tag lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipePayload {
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub ingredients: Vec<IngredientLine>,
    pub tags: Vec<i32>,
}

/// Query string of `GET /api/recipes/`. `tags` may repeat.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    pub author: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_favorited: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_in_shopping_cart: bool,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionQuery {
    pub recipes_limit: Option<u64>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientPayload {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagPayload {
    pub name: String,
    pub color: String,
    pub slug: String,
}

/// `GET /api/ingredients/?name=sug`
#[derive(Debug, Default, Deserialize)]
pub struct IngredientSearchQuery {
    pub name: Option<String>,
}

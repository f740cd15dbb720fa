//! Bulk seeding of the ingredient and tag catalogs from JSON files.

use std::path::Path;

use sea_orm::DatabaseConnection;
use thiserror::Error;
use tracing::info;

use crate::db::services::error::ServiceError;
use crate::db::services::{ingredient_service, tag_service};
use crate::web::models::catalog_models::{IngredientPayload, TagPayload};

pub const INGREDIENTS_FILE: &str = "ingredients.json";
pub const TAGS_FILE: &str = "tags.json";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("Invalid entry in {path}: {source}")]
    Service {
        path: String,
        source: ServiceError,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub ingredients_created: usize,
    pub ingredients_existing: usize,
    pub tags_created: usize,
    pub tags_existing: usize,
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, ImportError> {
    let display = path.display().to_string();
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ImportError::Io {
            path: display.clone(),
            source,
        })?;
    serde_json::from_str(&contents).map_err(|source| ImportError::Parse {
        path: display,
        source,
    })
}

/// Loads `ingredients.json` and `tags.json` from `dir`. Existing rows are left
/// untouched, so running the import twice is harmless. A missing file is
/// skipped.
pub async fn import_catalog(
    db: &DatabaseConnection,
    dir: &Path,
) -> Result<ImportSummary, ImportError> {
    let mut summary = ImportSummary::default();

    let ingredients_path = dir.join(INGREDIENTS_FILE);
    if ingredients_path.exists() {
        let display = ingredients_path.display().to_string();
        for entry in read_json::<IngredientPayload>(&ingredients_path).await? {
            ingredient_service::validate_ingredient(&entry).map_err(|e| ImportError::Service {
                path: display.clone(),
                source: e.into(),
            })?;
            let (_, created) = ingredient_service::get_or_create_ingredient(
                db,
                entry.name.trim(),
                entry.measurement_unit.trim(),
            )
            .await
            .map_err(|e| ImportError::Service {
                path: display.clone(),
                source: e.into(),
            })?;
            if created {
                summary.ingredients_created += 1;
            } else {
                summary.ingredients_existing += 1;
            }
        }
    }

    let tags_path = dir.join(TAGS_FILE);
    if tags_path.exists() {
        let display = tags_path.display().to_string();
        for entry in read_json::<TagPayload>(&tags_path).await? {
            let (_, created) = tag_service::get_or_create_tag(db, &entry)
                .await
                .map_err(|source| ImportError::Service {
                    path: display.clone(),
                    source,
                })?;
            if created {
                summary.tags_created += 1;
            } else {
                summary.tags_existing += 1;
            }
        }
    }

    info!(
        ingredients_created = summary.ingredients_created,
        ingredients_existing = summary.ingredients_existing,
        tags_created = summary.tags_created,
        tags_existing = summary.tags_existing,
        "Catalog import finished."
    );
    Ok(summary)
}

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DbErr};

use crate::db::entities::{ingredient, tag};
use crate::db::services::{ingredient_service, tag_service};

/// Read access to the ingredient and tag catalogs. The recipe service only
/// needs lookups, so it depends on this trait rather than on the tables.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_ingredient(&self, id: i32) -> Result<Option<ingredient::Model>, DbErr>;
    async fn find_ingredients(&self, ids: &[i32]) -> Result<Vec<ingredient::Model>, DbErr>;
    async fn find_ingredients_by_prefix(
        &self,
        prefix: Option<&str>,
    ) -> Result<Vec<ingredient::Model>, DbErr>;
    async fn find_tag(&self, id: i32) -> Result<Option<tag::Model>, DbErr>;
    async fn find_tags(&self, ids: &[i32]) -> Result<Vec<tag::Model>, DbErr>;
    async fn find_tags_by_slugs(&self, slugs: &[String]) -> Result<Vec<tag::Model>, DbErr>;
}

#[derive(Clone)]
pub struct DbCatalog {
    db: DatabaseConnection,
}

impl DbCatalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogRepository for DbCatalog {
    async fn find_ingredient(&self, id: i32) -> Result<Option<ingredient::Model>, DbErr> {
        ingredient_service::get_ingredient(&self.db, id).await
    }

    async fn find_ingredients(&self, ids: &[i32]) -> Result<Vec<ingredient::Model>, DbErr> {
        ingredient_service::get_ingredients_by_ids(&self.db, ids).await
    }

    async fn find_ingredients_by_prefix(
        &self,
        prefix: Option<&str>,
    ) -> Result<Vec<ingredient::Model>, DbErr> {
        ingredient_service::list_ingredients(&self.db, prefix).await
    }

    async fn find_tag(&self, id: i32) -> Result<Option<tag::Model>, DbErr> {
        tag_service::get_tag(&self.db, id).await
    }

    async fn find_tags(&self, ids: &[i32]) -> Result<Vec<tag::Model>, DbErr> {
        tag_service::get_tags_by_ids(&self.db, ids).await
    }

    async fn find_tags_by_slugs(&self, slugs: &[String]) -> Result<Vec<tag::Model>, DbErr> {
        tag_service::get_tags_by_slugs(&self.db, slugs).await
    }
}

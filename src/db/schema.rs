use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Schema};
use tracing::{debug, info};

use crate::db::entities::{
    favorite, follow, ingredient, recipe, recipe_ingredient, recipe_tag, shopping_cart, tag, user,
};

/// Creates every table (and the composite unique indexes the entities cannot
/// express) if it does not exist yet. Tables are created parents-first so the
/// foreign keys resolve on Postgres.
pub async fn create_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    create_table(db, user::Entity).await?;
    create_table(db, ingredient::Entity).await?;
    create_table(db, tag::Entity).await?;
    create_table(db, recipe::Entity).await?;
    create_table(db, recipe_ingredient::Entity).await?;
    create_table(db, recipe_tag::Entity).await?;
    create_table(db, favorite::Entity).await?;
    create_table(db, shopping_cart::Entity).await?;
    create_table(db, follow::Entity).await?;

    for index in composite_indexes() {
        db.execute(db.get_database_backend().build(&index)).await?;
    }

    info!("Database schema is up to date.");
    Ok(())
}

async fn create_table<C, E>(db: &C, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();

    debug!(table = entity.table_name(), "Ensuring table exists.");
    db.execute(backend.build(&statement)).await?;
    Ok(())
}

fn composite_indexes() -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .name("uq_ingredients_name_measurement_unit")
            .table(ingredient::Entity)
            .col(ingredient::Column::Name)
            .col(ingredient::Column::MeasurementUnit)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_ingredients_search_name")
            .table(ingredient::Entity)
            .col(ingredient::Column::SearchName)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_recipes_author_id")
            .table(recipe::Entity)
            .col(recipe::Column::AuthorId)
            .if_not_exists()
            .to_owned(),
    ]
}

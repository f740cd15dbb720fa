mod common;

use common::{create_ingredient, Fixture};
use foodgram::db::services::import_service::{import_catalog, ImportSummary};
use foodgram::db::services::{ingredient_service, tag_service, ServiceError, ValidationError};
use foodgram::web::models::catalog_models::{IngredientPayload, TagPayload};

fn ingredient(name: &str, unit: &str) -> IngredientPayload {
    IngredientPayload {
        name: name.to_string(),
        measurement_unit: unit.to_string(),
    }
}

fn tag(name: &str, color: &str, slug: &str) -> TagPayload {
    TagPayload {
        name: name.to_string(),
        color: color.to_string(),
        slug: slug.to_string(),
    }
}

#[tokio::test]
async fn ingredient_prefix_search_ignores_case() {
    let fx = Fixture::new().await;
    create_ingredient(&fx.db, "sugar syrup", "ml").await;
    create_ingredient(&fx.db, "brown sugar", "g").await;

    let names = |list: Vec<foodgram::db::entities::ingredient::Model>| {
        list.into_iter()
            .map(|i| format!("{} ({})", i.name, i.measurement_unit))
            .collect::<Vec<_>>()
    };

    let found = ingredient_service::list_ingredients(&fx.db, Some("SUG"))
        .await
        .unwrap();
    assert_eq!(
        names(found),
        vec!["Sugar (g)", "Sugar (tbsp)", "sugar syrup (ml)"]
    );

    let all = ingredient_service::list_ingredients(&fx.db, None).await.unwrap();
    assert_eq!(all.len(), 6);

    // Wildcards in the input match literally.
    assert!(ingredient_service::list_ingredients(&fx.db, Some("%"))
        .await
        .unwrap()
        .is_empty());

    create_ingredient(&fx.db, "Молоко", "мл").await;
    create_ingredient(&fx.db, "Crème fraîche", "g").await;
    for prefix in ["Мол", "мол", "МОЛОКО"] {
        let found = ingredient_service::list_ingredients(&fx.db, Some(prefix))
            .await
            .unwrap();
        assert_eq!(names(found), vec!["Молоко (мл)"], "prefix {prefix}");
    }
    let found = ingredient_service::list_ingredients(&fx.db, Some("CRÈME"))
        .await
        .unwrap();
    assert_eq!(names(found), vec!["Crème fraîche (g)"]);
}

#[tokio::test]
async fn renamed_ingredient_is_found_by_new_name() {
    let fx = Fixture::new().await;
    ingredient_service::update_ingredient(
        &fx.db,
        &fx.admin_actor(),
        fx.eggs.id,
        ingredient("Яйца", "шт"),
    )
    .await
    .unwrap();

    let found = ingredient_service::list_ingredients(&fx.db, Some("яй"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, fx.eggs.id);
    assert!(ingredient_service::list_ingredients(&fx.db, Some("egg"))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn catalog_writes_require_elevated_role() {
    let fx = Fixture::new().await;
    assert!(matches!(
        ingredient_service::create_ingredient(&fx.db, &fx.author_actor(), ingredient("Rice", "g")).await,
        Err(ServiceError::Forbidden)
    ));
    assert!(matches!(
        tag_service::create_tag(&fx.db, &fx.author_actor(), tag("Vegan", "#00ff00", "vegan")).await,
        Err(ServiceError::Forbidden)
    ));

    let rice = ingredient_service::create_ingredient(&fx.db, &fx.admin_actor(), ingredient(" Rice ", "g"))
        .await
        .unwrap();
    assert_eq!(rice.name, "Rice");
}

#[tokio::test]
async fn duplicate_catalog_entries_conflict() {
    let fx = Fixture::new().await;
    assert!(matches!(
        ingredient_service::create_ingredient(&fx.db, &fx.admin_actor(), ingredient("Flour", "g")).await,
        Err(ServiceError::AlreadyExists(_))
    ));
    // Same name, different unit is a different ingredient.
    ingredient_service::create_ingredient(&fx.db, &fx.admin_actor(), ingredient("Flour", "cup"))
        .await
        .unwrap();

    assert!(matches!(
        tag_service::create_tag(&fx.db, &fx.admin_actor(), tag("Brunch", "#e26c2d", "brunch")).await,
        Err(ServiceError::AlreadyExists(msg)) if msg.contains("color")
    ));
    assert!(matches!(
        tag_service::create_tag(&fx.db, &fx.admin_actor(), tag("Brunch", "#123456", "breakfast")).await,
        Err(ServiceError::AlreadyExists(msg)) if msg.contains("slug")
    ));
    assert!(matches!(
        tag_service::create_tag(&fx.db, &fx.admin_actor(), tag("Brunch", "blue", "brunch")).await,
        Err(ServiceError::Validation(ValidationError::InvalidColor(_)))
    ));
}

#[tokio::test]
async fn catalog_entries_in_use_cannot_be_deleted() {
    let fx = Fixture::new().await;
    fx.service
        .create_recipe(&fx.author_actor(), fx.pancakes())
        .await
        .unwrap();

    assert!(matches!(
        ingredient_service::delete_ingredient(&fx.db, &fx.admin_actor(), fx.flour.id).await,
        Err(ServiceError::Conflict(_))
    ));
    assert!(matches!(
        tag_service::delete_tag(&fx.db, &fx.admin_actor(), fx.breakfast.id).await,
        Err(ServiceError::Conflict(_))
    ));

    ingredient_service::delete_ingredient(&fx.db, &fx.admin_actor(), fx.sugar_tbsp.id)
        .await
        .unwrap();
    tag_service::delete_tag(&fx.db, &fx.admin_actor(), fx.dinner.id)
        .await
        .unwrap();
    assert!(tag_service::get_tag(&fx.db, fx.dinner.id).await.unwrap().is_none());
}

#[tokio::test]
async fn update_tag_keeps_its_own_values() {
    let fx = Fixture::new().await;
    let updated = tag_service::update_tag(
        &fx.db,
        &fx.admin_actor(),
        fx.breakfast.id,
        tag("Early breakfast", "#E26C2D", "breakfast"),
    )
    .await
    .unwrap();
    assert_eq!(updated.name, "Early breakfast");
    assert_eq!(updated.color, "#e26c2d");
}

#[tokio::test]
async fn import_is_get_or_create() {
    let db = common::setup_db().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("ingredients.json"),
        r#"[{"name": "flour", "measurement_unit": "g"}, {"name": "milk", "measurement_unit": "ml"}]"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("tags.json"),
        r##"[{"name": "Lunch", "color": "#49B64E", "slug": "lunch"}]"##,
    )
    .unwrap();

    let first = import_catalog(&db, dir.path()).await.unwrap();
    assert_eq!(
        first,
        ImportSummary {
            ingredients_created: 2,
            ingredients_existing: 0,
            tags_created: 1,
            tags_existing: 0,
        }
    );

    let second = import_catalog(&db, dir.path()).await.unwrap();
    assert_eq!(second.ingredients_created, 0);
    assert_eq!(second.ingredients_existing, 2);
    assert_eq!(second.tags_existing, 1);
}

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use tracing::info;

use crate::db::entities::{recipe_tag, tag};
use crate::db::services::error::{map_write_error, ServiceError, ValidationError};
use crate::services::policy::{ensure_can_manage_catalog, Actor};
use crate::web::models::catalog_models::TagPayload;

const MAX_TAG_FIELD_LENGTH: usize = 200;

// --- Tag Service Functions ---

/// Retrieves all tags ordered by name.
pub async fn list_tags(db: &DatabaseConnection) -> Result<Vec<tag::Model>, DbErr> {
    tag::Entity::find()
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await
}

pub async fn get_tag(db: &DatabaseConnection, tag_id: i32) -> Result<Option<tag::Model>, DbErr> {
    tag::Entity::find_by_id(tag_id).one(db).await
}

pub async fn get_tags_by_ids(
    db: &DatabaseConnection,
    ids: &[i32],
) -> Result<Vec<tag::Model>, DbErr> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    tag::Entity::find()
        .filter(tag::Column::Id.is_in(ids.iter().copied()))
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await
}

pub async fn get_tags_by_slugs(
    db: &DatabaseConnection,
    slugs: &[String],
) -> Result<Vec<tag::Model>, DbErr> {
    if slugs.is_empty() {
        return Ok(Vec::new());
    }
    tag::Entity::find()
        .filter(tag::Column::Slug.is_in(slugs.iter().cloned()))
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await
}

/// `#rgb` or `#rrggbb`, hex digits in either case.
pub fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(hex) => {
            (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

/// Letters, digits, `-` and `_`; at least one character.
pub fn is_slug(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_TAG_FIELD_LENGTH
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn validate_tag(payload: &TagPayload) -> Result<(), ValidationError> {
    let name = payload.name.trim();
    if name.is_empty() || name.chars().count() > MAX_TAG_FIELD_LENGTH {
        return Err(ValidationError::InvalidField {
            field: "name",
            message: format!("Tag name must be between 1 and {MAX_TAG_FIELD_LENGTH} characters."),
        });
    }
    if !is_hex_color(payload.color.trim()) {
        return Err(ValidationError::InvalidColor(payload.color.clone()));
    }
    if !is_slug(payload.slug.trim()) {
        return Err(ValidationError::InvalidSlug(payload.slug.clone()));
    }
    Ok(())
}

/// Colors are stored lowercase so `#FFF` and `#fff` collide on the unique index.
fn normalize(payload: &TagPayload) -> (String, String, String) {
    (
        payload.name.trim().to_string(),
        payload.color.trim().to_ascii_lowercase(),
        payload.slug.trim().to_string(),
    )
}

/// Finds a tag other than `exclude_id` that already uses the name, color or slug.
async fn find_clash(
    db: &DatabaseConnection,
    name: &str,
    color: &str,
    slug: &str,
    exclude_id: Option<i32>,
) -> Result<Option<ServiceError>, DbErr> {
    let mut query = tag::Entity::find().filter(
        Condition::any()
            .add(tag::Column::Name.eq(name))
            .add(tag::Column::Color.eq(color))
            .add(tag::Column::Slug.eq(slug)),
    );
    if let Some(id) = exclude_id {
        query = query.filter(tag::Column::Id.ne(id));
    }
    Ok(query.one(db).await?.map(|other| {
        let field = if other.name == name {
            "name"
        } else if other.color == color {
            "color"
        } else {
            "slug"
        };
        ServiceError::AlreadyExists(format!("A tag with this {field} already exists."))
    }))
}

/// Creates a tag. Restricted to moderators and admins.
pub async fn create_tag(
    db: &DatabaseConnection,
    actor: &Actor,
    payload: TagPayload,
) -> Result<tag::Model, ServiceError> {
    ensure_can_manage_catalog(actor)?;
    validate_tag(&payload)?;
    let (name, color, slug) = normalize(&payload);
    if let Some(err) = find_clash(db, &name, &color, &slug, None).await? {
        return Err(err);
    }

    let created = tag::ActiveModel {
        name: Set(name),
        color: Set(color),
        slug: Set(slug),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| map_write_error(e, "Tag already exists."))?;
    info!(tag_id = created.id, slug = %created.slug, "Tag created.");
    Ok(created)
}

pub async fn update_tag(
    db: &DatabaseConnection,
    actor: &Actor,
    tag_id: i32,
    payload: TagPayload,
) -> Result<tag::Model, ServiceError> {
    ensure_can_manage_catalog(actor)?;
    let existing = get_tag(db, tag_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Tag", tag_id))?;
    validate_tag(&payload)?;
    let (name, color, slug) = normalize(&payload);
    if let Some(err) = find_clash(db, &name, &color, &slug, Some(tag_id)).await? {
        return Err(err);
    }

    let mut active: tag::ActiveModel = existing.into();
    active.name = Set(name);
    active.color = Set(color);
    active.slug = Set(slug);
    active
        .update(db)
        .await
        .map_err(|e| map_write_error(e, "Tag already exists."))
}

/// Deletes a tag that no recipe carries; tags in use are a conflict.
pub async fn delete_tag(
    db: &DatabaseConnection,
    actor: &Actor,
    tag_id: i32,
) -> Result<(), ServiceError> {
    ensure_can_manage_catalog(actor)?;
    get_tag(db, tag_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Tag", tag_id))?;

    let usages = recipe_tag::Entity::find()
        .filter(recipe_tag::Column::TagId.eq(tag_id))
        .count(db)
        .await?;
    if usages > 0 {
        return Err(ServiceError::Conflict(format!(
            "Tag {tag_id} is used by {usages} recipe(s)."
        )));
    }

    tag::Entity::delete_by_id(tag_id).exec(db).await?;
    info!(tag_id, "Tag deleted.");
    Ok(())
}

/// Import helper keyed on the slug. The flag is `true` when a row was inserted.
pub async fn get_or_create_tag(
    db: &DatabaseConnection,
    payload: &TagPayload,
) -> Result<(tag::Model, bool), ServiceError> {
    validate_tag(payload)?;
    let (name, color, slug) = normalize(payload);
    if let Some(existing) = tag::Entity::find()
        .filter(tag::Column::Slug.eq(slug.as_str()))
        .one(db)
        .await?
    {
        return Ok((existing, false));
    }
    let created = tag::ActiveModel {
        name: Set(name),
        color: Set(color),
        slug: Set(slug),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| map_write_error(e, "Tag name or color is already taken."))?;
    Ok((created, true))
}

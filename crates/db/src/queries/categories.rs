use crate::models::CategoryRow;
use sqlx::{PgPool, QueryBuilder};
use tvstream_core::types::{CategoryChanges, NewCategory};

pub async fn list(pool: &PgPool) -> Result<Vec<CategoryRow>, sqlx::Error> {
    sqlx::query_as::<_, CategoryRow>(
        r#"
        SELECT id, name, slug, description
        FROM categories
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn get_by_id(pool: &PgPool, id: i64) -> Result<Option<CategoryRow>, sqlx::Error> {
    sqlx::query_as::<_, CategoryRow>(
        r#"
        SELECT id, name, slug, description
        FROM categories
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn get_by_slug(pool: &PgPool, slug: &str) -> Result<Option<CategoryRow>, sqlx::Error> {
    sqlx::query_as::<_, CategoryRow>(
        r#"
        SELECT id, name, slug, description
        FROM categories
        WHERE slug = $1
        "#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await
}

pub async fn exists(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn create(pool: &PgPool, new: &NewCategory) -> Result<CategoryRow, sqlx::Error> {
    sqlx::query_as::<_, CategoryRow>(
        r#"
        INSERT INTO categories (name, slug, description)
        VALUES ($1, $2, $3)
        RETURNING id, name, slug, description
        "#,
    )
    .bind(&new.name)
    .bind(&new.slug)
    .bind(&new.description)
    .fetch_one(pool)
    .await
}

/// Applies `changes` and returns the updated row, or `None` if the category
/// does not exist.
pub async fn update(
    pool: &PgPool,
    id: i64,
    changes: &CategoryChanges,
) -> Result<Option<CategoryRow>, sqlx::Error> {
    if changes == &CategoryChanges::default() {
        return get_by_id(pool, id).await;
    }

    let mut qb = QueryBuilder::new("UPDATE categories SET ");
    let mut set = qb.separated(", ");

    if let Some(value) = changes.name.as_deref() {
        set.push("name = ").push_bind_unseparated(value);
    }
    if let Some(value) = changes.slug.as_deref() {
        set.push("slug = ").push_bind_unseparated(value);
    }
    if let Some(value) = changes.description.as_deref() {
        set.push("description = ").push_bind_unseparated(value);
    }

    qb.push(" WHERE id = ").push_bind(id);
    qb.push(" RETURNING id, name, slug, description");

    let record = qb
        .build_query_as::<CategoryRow>()
        .fetch_optional(pool)
        .await?;

    Ok(record)
}

/// Deletes a category together with every channel filed under it.
///
/// Returns the number of channels removed, or `None` if the category does
/// not exist.
pub async fn delete_cascade(pool: &PgPool, id: i64) -> Result<Option<u64>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let locked = sqlx::query_scalar::<_, i64>("SELECT id FROM categories WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if locked.is_none() {
        return Ok(None);
    }

    let removed = sqlx::query("DELETE FROM channels WHERE category_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Some(removed))
}

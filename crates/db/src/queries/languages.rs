use crate::models::LanguageRow;
use sqlx::{PgPool, QueryBuilder};
use tvstream_core::types::{LanguageChanges, NewLanguage};

/// Outcome of a protected language delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageDelete {
    Deleted,
    Missing,
    Referenced { code: String, channels: i64 },
}

pub async fn list(pool: &PgPool) -> Result<Vec<LanguageRow>, sqlx::Error> {
    sqlx::query_as::<_, LanguageRow>(
        r#"
        SELECT id, name, code
        FROM languages
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn get_by_id(pool: &PgPool, id: i64) -> Result<Option<LanguageRow>, sqlx::Error> {
    sqlx::query_as::<_, LanguageRow>(
        r#"
        SELECT id, name, code
        FROM languages
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn get_by_code(pool: &PgPool, code: &str) -> Result<Option<LanguageRow>, sqlx::Error> {
    sqlx::query_as::<_, LanguageRow>(
        r#"
        SELECT id, name, code
        FROM languages
        WHERE code = $1
        "#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await
}

pub async fn exists(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM languages WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn create(pool: &PgPool, new: &NewLanguage) -> Result<LanguageRow, sqlx::Error> {
    sqlx::query_as::<_, LanguageRow>(
        r#"
        INSERT INTO languages (name, code)
        VALUES ($1, $2)
        RETURNING id, name, code
        "#,
    )
    .bind(&new.name)
    .bind(&new.code)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: i64,
    changes: &LanguageChanges,
) -> Result<Option<LanguageRow>, sqlx::Error> {
    if changes == &LanguageChanges::default() {
        return get_by_id(pool, id).await;
    }

    let mut qb = QueryBuilder::new("UPDATE languages SET ");
    let mut set = qb.separated(", ");

    if let Some(value) = changes.name.as_deref() {
        set.push("name = ").push_bind_unseparated(value);
    }
    if let Some(value) = changes.code.as_deref() {
        set.push("code = ").push_bind_unseparated(value);
    }

    qb.push(" WHERE id = ").push_bind(id);
    qb.push(" RETURNING id, name, code");

    let record = qb
        .build_query_as::<LanguageRow>()
        .fetch_optional(pool)
        .await?;

    Ok(record)
}

/// Deletes a language unless a channel still references it.
///
/// The language row is locked first so a concurrent channel insert cannot
/// slip a new reference in between the check and the delete.
pub async fn delete_protected(pool: &PgPool, id: i64) -> Result<LanguageDelete, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let code = sqlx::query_scalar::<_, String>(
        "SELECT code FROM languages WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;
    let Some(code) = code else {
        return Ok(LanguageDelete::Missing);
    };

    let channels = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM channels WHERE language_id = $1",
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    if channels > 0 {
        return Ok(LanguageDelete::Referenced { code, channels });
    }

    sqlx::query("DELETE FROM languages WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(LanguageDelete::Deleted)
}

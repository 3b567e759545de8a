use crate::models::ChannelRow;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tvstream_core::types::{ChannelChanges, ChannelFilter, NewChannel};

const CHANNEL_COLUMNS: &str = "ch.id, ch.name, ch.description, ch.stream_url, ch.thumbnail, \
     ch.is_live, ch.created_at, ch.updated_at, \
     c.id AS category_id, c.name AS category_name, c.slug AS category_slug, \
     c.description AS category_description, \
     l.id AS language_id, l.name AS language_name, l.code AS language_code";

const CHANNEL_JOINS: &str = "JOIN categories c ON c.id = ch.category_id \
     JOIN languages l ON l.id = ch.language_id";

fn select_from(source: &str) -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(format!(
        "SELECT {CHANNEL_COLUMNS} FROM {source} {CHANNEL_JOINS}"
    ))
}

pub async fn list(pool: &PgPool, filter: &ChannelFilter) -> Result<Vec<ChannelRow>, sqlx::Error> {
    let mut qb = select_from("channels ch");
    qb.push(" WHERE TRUE");

    if let Some(slug) = filter.category_slug.as_deref() {
        qb.push(" AND c.slug = ").push_bind(slug.to_string());
    }
    if let Some(code) = filter.language_code.as_deref() {
        qb.push(" AND l.code = ").push_bind(code.to_string());
    }
    if let Some(id) = filter.category_id {
        qb.push(" AND ch.category_id = ").push_bind(id);
    }
    if let Some(id) = filter.language_id {
        qb.push(" AND ch.language_id = ").push_bind(id);
    }
    if let Some(is_live) = filter.is_live {
        qb.push(" AND ch.is_live = ").push_bind(is_live);
    }
    for term in filter.search_terms() {
        let pattern = format!("%{}%", escape_like(term));
        qb.push(" AND (ch.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR ch.description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR ch.stream_url ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    qb.push(" ORDER BY lower(ch.name), ch.id");

    let rows = qb
        .build_query_as::<ChannelRow>()
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

pub async fn get_by_id(pool: &PgPool, id: i64) -> Result<Option<ChannelRow>, sqlx::Error> {
    let mut qb = select_from("channels ch");
    qb.push(" WHERE ch.id = ").push_bind(id);
    let record = qb
        .build_query_as::<ChannelRow>()
        .fetch_optional(pool)
        .await?;

    Ok(record)
}

pub async fn create(pool: &PgPool, new: &NewChannel) -> Result<ChannelRow, sqlx::Error> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "WITH ch AS (INSERT INTO channels \
         (name, description, category_id, language_id, stream_url, thumbnail, is_live) VALUES (",
    );
    let mut values = qb.separated(", ");
    values.push_bind(new.name.as_str());
    values.push_bind(new.description.as_str());
    values.push_bind(new.category_id);
    values.push_bind(new.language_id);
    values.push_bind(new.stream_url.as_str());
    values.push_bind(new.thumbnail.as_deref().unwrap_or(""));
    values.push_bind(new.is_live);
    qb.push(") RETURNING *) ");
    qb.push(format!("SELECT {CHANNEL_COLUMNS} FROM ch {CHANNEL_JOINS}"));

    let record = qb
        .build_query_as::<ChannelRow>()
        .fetch_one(pool)
        .await?;

    Ok(record)
}

/// Applies `changes` and refreshes `updated_at`. Returns `None` if the
/// channel does not exist.
pub async fn update(
    pool: &PgPool,
    id: i64,
    changes: &ChannelChanges,
) -> Result<Option<ChannelRow>, sqlx::Error> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("WITH ch AS (UPDATE channels SET ");
    let mut set = qb.separated(", ");

    if let Some(value) = changes.name.as_deref() {
        set.push("name = ").push_bind_unseparated(value);
    }
    if let Some(value) = changes.description.as_deref() {
        set.push("description = ").push_bind_unseparated(value);
    }
    if let Some(value) = changes.category_id {
        set.push("category_id = ").push_bind_unseparated(value);
    }
    if let Some(value) = changes.language_id {
        set.push("language_id = ").push_bind_unseparated(value);
    }
    if let Some(value) = changes.stream_url.as_deref() {
        set.push("stream_url = ").push_bind_unseparated(value);
    }
    if let Some(value) = changes.thumbnail.as_ref() {
        set.push("thumbnail = ")
            .push_bind_unseparated(value.as_deref().unwrap_or(""));
    }
    if let Some(value) = changes.is_live {
        set.push("is_live = ").push_bind_unseparated(value);
    }
    set.push("updated_at = now()");

    qb.push(" WHERE id = ").push_bind(id);
    qb.push(" RETURNING *) ");
    qb.push(format!("SELECT {CHANNEL_COLUMNS} FROM ch {CHANNEL_JOINS}"));

    let record = qb
        .build_query_as::<ChannelRow>()
        .fetch_optional(pool)
        .await?;

    Ok(record)
}

pub async fn exists(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM channels WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM channels WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Escapes `LIKE` wildcards so search terms match literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

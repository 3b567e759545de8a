use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tvstream_core::types::{Category, Channel, Language};

#[derive(Debug, Clone, FromRow)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct LanguageRow {
    pub id: i64,
    pub name: String,
    pub code: String,
}

/// A channel joined with its category and language.
#[derive(Debug, Clone, FromRow)]
pub struct ChannelRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub stream_url: String,
    pub thumbnail: String,
    pub is_live: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category_id: i64,
    pub category_name: String,
    pub category_slug: String,
    pub category_description: String,
    pub language_id: i64,
    pub language_name: String,
    pub language_code: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
        }
    }
}

impl From<LanguageRow> for Language {
    fn from(row: LanguageRow) -> Self {
        Language {
            id: row.id,
            name: row.name,
            code: row.code,
        }
    }
}

impl From<ChannelRow> for Channel {
    fn from(row: ChannelRow) -> Self {
        Channel {
            id: row.id,
            name: row.name,
            description: row.description,
            category: Category {
                id: row.category_id,
                name: row.category_name,
                slug: row.category_slug,
                description: row.category_description,
            },
            language: Language {
                id: row.language_id,
                name: row.language_name,
                code: row.language_code,
            },
            stream_url: row.stream_url,
            thumbnail: Some(row.thumbnail).filter(|path| !path.is_empty()),
            is_live: row.is_live,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

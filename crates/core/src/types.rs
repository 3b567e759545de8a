use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Language {
    pub id: i64,
    pub name: String,
    pub code: String,
}

/// Read representation of a channel. Category and language are embedded by
/// value; writes refer to them by id (see [`NewChannel`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub language: Language,
    pub stream_url: String,
    pub thumbnail: Option<String>,
    pub is_live: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLanguage {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageChanges {
    pub name: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChannel {
    pub name: String,
    pub description: String,
    pub category_id: i64,
    pub language_id: i64,
    pub stream_url: String,
    pub thumbnail: Option<String>,
    pub is_live: bool,
}

/// Field-level changes to a channel. `thumbnail: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub language_id: Option<i64>,
    pub stream_url: Option<String>,
    pub thumbnail: Option<Option<String>>,
    pub is_live: Option<bool>,
}

/// Conjunctive channel filter. Every `None` field matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelFilter {
    pub category_slug: Option<String>,
    pub language_code: Option<String>,
    pub category_id: Option<i64>,
    pub language_id: Option<i64>,
    pub is_live: Option<bool>,
    /// Whitespace-separated terms; each must appear in the name,
    /// description or stream url.
    pub search: Option<String>,
}

impl ChannelFilter {
    pub fn search_terms(&self) -> Vec<&str> {
        self.search
            .as_deref()
            .map(|q| q.split_whitespace().collect())
            .unwrap_or_default()
    }
}

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{info, warn};
use tvstream_core::types::{
    Category, CategoryChanges, Channel, ChannelChanges, ChannelFilter, Language, LanguageChanges,
    NewCategory, NewChannel, NewLanguage,
};

use crate::error::{StoreError, StoreResult};
use crate::store::{protected_message, CatalogStore};

/// Process-local store with the same integrity rules as the Postgres one.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    categories: BTreeMap<i64, Category>,
    languages: BTreeMap<i64, Language>,
    channels: BTreeMap<i64, ChannelEntry>,
    last_id: LastIds,
}

#[derive(Default)]
struct LastIds {
    category: i64,
    language: i64,
    channel: i64,
}

#[derive(Debug, Clone)]
struct ChannelEntry {
    id: i64,
    name: String,
    description: String,
    category_id: i64,
    language_id: i64,
    stream_url: String,
    thumbnail: Option<String>,
    is_live: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn resolve(&self, entry: &ChannelEntry) -> Option<Channel> {
        let category = self.categories.get(&entry.category_id)?.clone();
        let language = self.languages.get(&entry.language_id)?.clone();
        Some(Channel {
            id: entry.id,
            name: entry.name.clone(),
            description: entry.description.clone(),
            category,
            language,
            stream_url: entry.stream_url.clone(),
            thumbnail: entry.thumbnail.clone(),
            is_live: entry.is_live,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        })
    }

    fn resolve_id(&self, id: i64) -> StoreResult<Channel> {
        self.channels
            .get(&id)
            .and_then(|entry| self.resolve(entry))
            .ok_or(StoreError::NotFound("channel"))
    }

    fn check_category_unique(
        &self,
        name: Option<&str>,
        slug: Option<&str>,
        skip: i64,
    ) -> StoreResult<()> {
        for category in self.categories.values().filter(|c| c.id != skip) {
            if name == Some(category.name.as_str()) {
                return Err(StoreError::unique("category", "name"));
            }
            if slug == Some(category.slug.as_str()) {
                return Err(StoreError::unique("category", "slug"));
            }
        }
        Ok(())
    }

    fn check_language_unique(&self, code: Option<&str>, skip: i64) -> StoreResult<()> {
        let taken = self
            .languages
            .values()
            .any(|language| language.id != skip && code == Some(language.code.as_str()));
        if taken {
            return Err(StoreError::unique("language", "code"));
        }
        Ok(())
    }

    fn check_references(
        &self,
        category_id: Option<i64>,
        language_id: Option<i64>,
    ) -> StoreResult<()> {
        if let Some(id) = category_id {
            if !self.categories.contains_key(&id) {
                return Err(StoreError::invalid_reference("category", id));
            }
        }
        if let Some(id) = language_id {
            if !self.languages.contains_key(&id) {
                return Err(StoreError::invalid_reference("language", id));
            }
        }
        Ok(())
    }
}

fn matches_filter(channel: &Channel, filter: &ChannelFilter) -> bool {
    if let Some(slug) = filter.category_slug.as_deref() {
        if channel.category.slug != slug {
            return false;
        }
    }
    if let Some(code) = filter.language_code.as_deref() {
        if channel.language.code != code {
            return false;
        }
    }
    if filter.category_id.is_some_and(|id| id != channel.category.id) {
        return false;
    }
    if filter.language_id.is_some_and(|id| id != channel.language.id) {
        return false;
    }
    if filter.is_live.is_some_and(|live| live != channel.is_live) {
        return false;
    }
    let haystacks = [
        channel.name.to_lowercase(),
        channel.description.to_lowercase(),
        channel.stream_url.to_lowercase(),
    ];
    filter.search_terms().into_iter().all(|term| {
        let term = term.to_lowercase();
        haystacks.iter().any(|field| field.contains(&term))
    })
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let tables = self.inner.read().await;
        Ok(tables.categories.values().cloned().collect())
    }

    async fn category_by_id(&self, id: i64) -> StoreResult<Option<Category>> {
        let tables = self.inner.read().await;
        Ok(tables.categories.get(&id).cloned())
    }

    async fn category_by_slug(&self, slug: &str) -> StoreResult<Option<Category>> {
        let tables = self.inner.read().await;
        Ok(tables
            .categories
            .values()
            .find(|category| category.slug == slug)
            .cloned())
    }

    async fn create_category(&self, new: &NewCategory) -> StoreResult<Category> {
        let mut tables = self.inner.write().await;
        tables.check_category_unique(Some(new.name.as_str()), Some(new.slug.as_str()), 0)?;

        tables.last_id.category += 1;
        let category = Category {
            id: tables.last_id.category,
            name: new.name.clone(),
            slug: new.slug.clone(),
            description: new.description.clone(),
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: i64, changes: &CategoryChanges) -> StoreResult<Category> {
        let mut tables = self.inner.write().await;
        if !tables.categories.contains_key(&id) {
            return Err(StoreError::NotFound("category"));
        }
        tables.check_category_unique(changes.name.as_deref(), changes.slug.as_deref(), id)?;

        let category = tables
            .categories
            .get_mut(&id)
            .ok_or(StoreError::NotFound("category"))?;
        if let Some(name) = &changes.name {
            category.name = name.clone();
        }
        if let Some(slug) = &changes.slug {
            category.slug = slug.clone();
        }
        if let Some(description) = &changes.description {
            category.description = description.clone();
        }
        Ok(category.clone())
    }

    async fn delete_category(&self, id: i64) -> StoreResult<u64> {
        let mut tables = self.inner.write().await;
        if tables.categories.remove(&id).is_none() {
            return Err(StoreError::NotFound("category"));
        }
        let before = tables.channels.len();
        tables.channels.retain(|_, entry| entry.category_id != id);
        let removed = (before - tables.channels.len()) as u64;
        info!(category_id = id, channels_removed = removed, "category deleted");
        Ok(removed)
    }

    async fn list_languages(&self) -> StoreResult<Vec<Language>> {
        let tables = self.inner.read().await;
        Ok(tables.languages.values().cloned().collect())
    }

    async fn language_by_id(&self, id: i64) -> StoreResult<Option<Language>> {
        let tables = self.inner.read().await;
        Ok(tables.languages.get(&id).cloned())
    }

    async fn language_by_code(&self, code: &str) -> StoreResult<Option<Language>> {
        let tables = self.inner.read().await;
        Ok(tables
            .languages
            .values()
            .find(|language| language.code == code)
            .cloned())
    }

    async fn create_language(&self, new: &NewLanguage) -> StoreResult<Language> {
        let mut tables = self.inner.write().await;
        tables.check_language_unique(Some(new.code.as_str()), 0)?;

        tables.last_id.language += 1;
        let language = Language {
            id: tables.last_id.language,
            name: new.name.clone(),
            code: new.code.clone(),
        };
        tables.languages.insert(language.id, language.clone());
        Ok(language)
    }

    async fn update_language(&self, id: i64, changes: &LanguageChanges) -> StoreResult<Language> {
        let mut tables = self.inner.write().await;
        if !tables.languages.contains_key(&id) {
            return Err(StoreError::NotFound("language"));
        }
        tables.check_language_unique(changes.code.as_deref(), id)?;

        let language = tables
            .languages
            .get_mut(&id)
            .ok_or(StoreError::NotFound("language"))?;
        if let Some(name) = &changes.name {
            language.name = name.clone();
        }
        if let Some(code) = &changes.code {
            language.code = code.clone();
        }
        Ok(language.clone())
    }

    async fn delete_language(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.inner.write().await;
        let code = match tables.languages.get(&id) {
            Some(language) => language.code.clone(),
            None => return Err(StoreError::NotFound("language")),
        };
        let channels = tables
            .channels
            .values()
            .filter(|entry| entry.language_id == id)
            .count() as i64;
        if channels > 0 {
            warn!(language_id = id, channels, "language delete blocked");
            return Err(StoreError::ReferenceConflict(protected_message(&code, channels)));
        }
        tables.languages.remove(&id);
        info!(language_id = id, "language deleted");
        Ok(())
    }

    async fn list_channels(&self, filter: &ChannelFilter) -> StoreResult<Vec<Channel>> {
        let tables = self.inner.read().await;
        let mut channels: Vec<Channel> = tables
            .channels
            .values()
            .filter_map(|entry| tables.resolve(entry))
            .filter(|channel| matches_filter(channel, filter))
            .collect();
        channels.sort_by_cached_key(|channel| (channel.name.to_lowercase(), channel.id));
        Ok(channels)
    }

    async fn channel_by_id(&self, id: i64) -> StoreResult<Option<Channel>> {
        let tables = self.inner.read().await;
        Ok(tables
            .channels
            .get(&id)
            .and_then(|entry| tables.resolve(entry)))
    }

    async fn create_channel(&self, new: &NewChannel) -> StoreResult<Channel> {
        let mut tables = self.inner.write().await;
        tables.check_references(Some(new.category_id), Some(new.language_id))?;

        tables.last_id.channel += 1;
        let now = Utc::now();
        let entry = ChannelEntry {
            id: tables.last_id.channel,
            name: new.name.clone(),
            description: new.description.clone(),
            category_id: new.category_id,
            language_id: new.language_id,
            stream_url: new.stream_url.clone(),
            thumbnail: new.thumbnail.clone(),
            is_live: new.is_live,
            created_at: now,
            updated_at: now,
        };
        let id = entry.id;
        tables.channels.insert(id, entry);
        tables.resolve_id(id)
    }

    async fn update_channel(&self, id: i64, changes: &ChannelChanges) -> StoreResult<Channel> {
        let mut tables = self.inner.write().await;
        if !tables.channels.contains_key(&id) {
            return Err(StoreError::NotFound("channel"));
        }
        tables.check_references(changes.category_id, changes.language_id)?;

        let entry = tables
            .channels
            .get_mut(&id)
            .ok_or(StoreError::NotFound("channel"))?;
        if let Some(name) = &changes.name {
            entry.name = name.clone();
        }
        if let Some(description) = &changes.description {
            entry.description = description.clone();
        }
        if let Some(category_id) = changes.category_id {
            entry.category_id = category_id;
        }
        if let Some(language_id) = changes.language_id {
            entry.language_id = language_id;
        }
        if let Some(stream_url) = &changes.stream_url {
            entry.stream_url = stream_url.clone();
        }
        if let Some(thumbnail) = &changes.thumbnail {
            entry.thumbnail = thumbnail.clone();
        }
        if let Some(is_live) = changes.is_live {
            entry.is_live = is_live;
        }
        entry.updated_at = Utc::now();

        tables.resolve_id(id)
    }

    async fn delete_channel(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.inner.write().await;
        tables
            .channels
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("channel"))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn close(&self) {}
}

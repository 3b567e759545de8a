use std::sync::Arc;

use async_trait::async_trait;
use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};
use tvstream_core::types::{
    Category, CategoryChanges, Channel, ChannelChanges, ChannelFilter, Language, LanguageChanges,
    NewCategory, NewChannel, NewLanguage,
};

use crate::error::{is_foreign_key_violation, map_write_error, StoreError, StoreResult};
use crate::queries::languages::LanguageDelete;
use crate::queries::{categories, channels, languages};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Shared handle to the catalog store. Opened once at startup and closed on
/// shutdown.
pub type Store = Arc<dyn CatalogStore>;

/// Data access for categories, languages and channels.
///
/// Implementations enforce referential integrity themselves: deleting a
/// category removes its channels, deleting a referenced language fails with
/// [`StoreError::ReferenceConflict`], and channel writes fail with
/// [`StoreError::Validation`] when a reference does not resolve.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn category_by_id(&self, id: i64) -> StoreResult<Option<Category>>;
    async fn category_by_slug(&self, slug: &str) -> StoreResult<Option<Category>>;
    async fn create_category(&self, new: &NewCategory) -> StoreResult<Category>;
    async fn update_category(&self, id: i64, changes: &CategoryChanges) -> StoreResult<Category>;
    /// Returns the number of channels removed along with the category.
    async fn delete_category(&self, id: i64) -> StoreResult<u64>;

    async fn list_languages(&self) -> StoreResult<Vec<Language>>;
    async fn language_by_id(&self, id: i64) -> StoreResult<Option<Language>>;
    async fn language_by_code(&self, code: &str) -> StoreResult<Option<Language>>;
    async fn create_language(&self, new: &NewLanguage) -> StoreResult<Language>;
    async fn update_language(&self, id: i64, changes: &LanguageChanges) -> StoreResult<Language>;
    async fn delete_language(&self, id: i64) -> StoreResult<()>;

    /// Channels matching `filter`, ordered by case-folded name, then id.
    async fn list_channels(&self, filter: &ChannelFilter) -> StoreResult<Vec<Channel>>;
    async fn channel_by_id(&self, id: i64) -> StoreResult<Option<Channel>>;
    async fn create_channel(&self, new: &NewChannel) -> StoreResult<Channel>;
    async fn update_channel(&self, id: i64, changes: &ChannelChanges) -> StoreResult<Channel>;
    async fn delete_channel(&self, id: i64) -> StoreResult<()>;

    /// Cheap round trip used by the health check.
    async fn ping(&self) -> StoreResult<()>;
    async fn close(&self);
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), MigrateError> {
        MIGRATOR.run(&self.pool).await
    }

    async fn ensure_references(
        &self,
        category_id: Option<i64>,
        language_id: Option<i64>,
    ) -> StoreResult<()> {
        if let Some(id) = category_id {
            if !categories::exists(&self.pool, id).await? {
                return Err(StoreError::invalid_reference("category", id));
            }
        }
        if let Some(id) = language_id {
            if !languages::exists(&self.pool, id).await? {
                return Err(StoreError::invalid_reference("language", id));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let rows = categories::list(&self.pool).await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn category_by_id(&self, id: i64) -> StoreResult<Option<Category>> {
        Ok(categories::get_by_id(&self.pool, id).await?.map(Category::from))
    }

    async fn category_by_slug(&self, slug: &str) -> StoreResult<Option<Category>> {
        Ok(categories::get_by_slug(&self.pool, slug)
            .await?
            .map(Category::from))
    }

    async fn create_category(&self, new: &NewCategory) -> StoreResult<Category> {
        let row = categories::create(&self.pool, new)
            .await
            .map_err(map_write_error)?;
        Ok(row.into())
    }

    async fn update_category(&self, id: i64, changes: &CategoryChanges) -> StoreResult<Category> {
        categories::update(&self.pool, id, changes)
            .await
            .map_err(map_write_error)?
            .map(Category::from)
            .ok_or(StoreError::NotFound("category"))
    }

    async fn delete_category(&self, id: i64) -> StoreResult<u64> {
        let removed = categories::delete_cascade(&self.pool, id)
            .await?
            .ok_or(StoreError::NotFound("category"))?;
        info!(category_id = id, channels_removed = removed, "category deleted");
        Ok(removed)
    }

    async fn list_languages(&self) -> StoreResult<Vec<Language>> {
        let rows = languages::list(&self.pool).await?;
        Ok(rows.into_iter().map(Language::from).collect())
    }

    async fn language_by_id(&self, id: i64) -> StoreResult<Option<Language>> {
        Ok(languages::get_by_id(&self.pool, id).await?.map(Language::from))
    }

    async fn language_by_code(&self, code: &str) -> StoreResult<Option<Language>> {
        Ok(languages::get_by_code(&self.pool, code)
            .await?
            .map(Language::from))
    }

    async fn create_language(&self, new: &NewLanguage) -> StoreResult<Language> {
        let row = languages::create(&self.pool, new)
            .await
            .map_err(map_write_error)?;
        Ok(row.into())
    }

    async fn update_language(&self, id: i64, changes: &LanguageChanges) -> StoreResult<Language> {
        languages::update(&self.pool, id, changes)
            .await
            .map_err(map_write_error)?
            .map(Language::from)
            .ok_or(StoreError::NotFound("language"))
    }

    async fn delete_language(&self, id: i64) -> StoreResult<()> {
        let outcome = match languages::delete_protected(&self.pool, id).await {
            Ok(outcome) => outcome,
            Err(err) if is_foreign_key_violation(&err) => {
                return Err(StoreError::ReferenceConflict(format!(
                    "language {id} is still referenced by channels"
                )))
            }
            Err(err) => return Err(err.into()),
        };

        match outcome {
            LanguageDelete::Deleted => {
                info!(language_id = id, "language deleted");
                Ok(())
            }
            LanguageDelete::Missing => Err(StoreError::NotFound("language")),
            LanguageDelete::Referenced { code, channels } => {
                warn!(language_id = id, channels, "language delete blocked");
                Err(StoreError::ReferenceConflict(protected_message(&code, channels)))
            }
        }
    }

    async fn list_channels(&self, filter: &ChannelFilter) -> StoreResult<Vec<Channel>> {
        let rows = channels::list(&self.pool, filter).await?;
        Ok(rows.into_iter().map(Channel::from).collect())
    }

    async fn channel_by_id(&self, id: i64) -> StoreResult<Option<Channel>> {
        Ok(channels::get_by_id(&self.pool, id).await?.map(Channel::from))
    }

    async fn create_channel(&self, new: &NewChannel) -> StoreResult<Channel> {
        self.ensure_references(Some(new.category_id), Some(new.language_id))
            .await?;
        let row = channels::create(&self.pool, new)
            .await
            .map_err(map_write_error)?;
        Ok(row.into())
    }

    async fn update_channel(&self, id: i64, changes: &ChannelChanges) -> StoreResult<Channel> {
        if !channels::exists(&self.pool, id).await? {
            return Err(StoreError::NotFound("channel"));
        }
        self.ensure_references(changes.category_id, changes.language_id)
            .await?;
        channels::update(&self.pool, id, changes)
            .await
            .map_err(map_write_error)?
            .map(Channel::from)
            .ok_or(StoreError::NotFound("channel"))
    }

    async fn delete_channel(&self, id: i64) -> StoreResult<()> {
        if channels::delete(&self.pool, id).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound("channel"))
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

pub(crate) fn protected_message(code: &str, channels: i64) -> String {
    format!("language \"{code}\" is referenced by {channels} channel(s) and cannot be deleted")
}

pub mod error;
pub mod memory;
pub mod models;
pub mod queries;
pub mod store;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tvstream_core::config::{Settings, StoreBackend};

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use store::{CatalogStore, PgStore, Store};

/// Opens the store selected by `settings`, applying migrations first when
/// configured to.
pub async fn open(settings: &Settings) -> anyhow::Result<Store> {
    match settings.store {
        StoreBackend::Memory => {
            info!("using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let database_url = settings
                .database_url
                .as_deref()
                .context("database url required for postgres store")?;
            let store = PgStore::connect(database_url, settings.db_max_connections)
                .await
                .context("connecting to postgres")?;
            if settings.run_migrations {
                store.migrate().await.context("running migrations")?;
                info!("migrations applied");
            }
            info!(max_connections = settings.db_max_connections, "postgres store ready");
            Ok(Arc::new(store))
        }
    }
}

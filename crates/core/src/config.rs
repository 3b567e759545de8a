use std::net::SocketAddr;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: Option<String>,
    pub store: StoreBackend,
    pub env: String,
    pub api_bind: SocketAddr,
    pub db_max_connections: u32,
    pub run_migrations: bool,
    pub admin_enabled: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("TVSTREAM_DATABASE_URL").or_else(|| lookup("DATABASE_URL"));
        let store = match lookup("TVSTREAM_STORE").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "TVSTREAM_STORE",
                    value: other.to_string(),
                })
            }
        };
        if store == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("TVSTREAM_DATABASE_URL or DATABASE_URL"));
        }
        let env = lookup("TVSTREAM_ENV").unwrap_or_else(|| "development".to_string());
        let api_bind: SocketAddr = parse_or("TVSTREAM_API_BIND", &lookup, "0.0.0.0:8000".parse().ok())?;
        let db_max_connections: u32 = parse_or("TVSTREAM_DB_MAX_CONNECTIONS", &lookup, Some(10))?;
        let run_migrations = parse_flag("TVSTREAM_RUN_MIGRATIONS", &lookup, true)?;
        let admin_enabled = parse_flag("TVSTREAM_ADMIN_ENABLED", &lookup, true)?;

        Ok(Self {
            database_url,
            store,
            env,
            api_bind,
            db_max_connections,
            run_migrations,
            admin_enabled,
        })
    }
}

fn parse_or<T, F>(name: &'static str, lookup: &F, default: Option<T>) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => default.ok_or(ConfigError::Missing(name)),
    }
}

fn parse_flag<F>(name: &'static str, lookup: &F, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            name,
            value: other.to_string(),
        }),
    }
}

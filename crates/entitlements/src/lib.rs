pub mod db;
pub mod env;
pub mod policy;

use anyhow::Context as _;
use db::Database;
use policy::{CapsPolicy, EntitlementDefaults, EntitlementService};
use serde::Deserialize;
use std::{path::PathBuf, sync::Arc};
use util::ResultExt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub enum Error {
    Database(sea_orm::error::DbErr),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for Error {
    fn from(error: anyhow::Error) -> Self {
        Self::Internal(error)
    }
}

impl From<sea_orm::error::DbErr> for Error {
    fn from(error: sea_orm::error::DbErr) -> Self {
        Self::Database(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Internal(error.into())
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Database(error) => error.fmt(f),
            Error::Internal(error) => error.fmt(f),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Database(error) => error.fmt(f),
            Error::Internal(error) => error.fmt(f),
        }
    }
}

impl std::error::Error for Error {}

#[derive(Clone, Deserialize)]
pub struct Config {
    pub database_url: Option<String>,
    pub database_max_connections: Option<u32>,
    pub migrations_path: Option<PathBuf>,
    pub entitlement_defaults_path: Option<PathBuf>,
    pub enforce_extras: Option<bool>,
    pub rust_log: Option<String>,
    pub log_json: Option<bool>,
}

impl Config {
    const DEFAULT_MAX_CONNECTIONS: u32 = 5;

    pub fn max_connections(&self) -> u32 {
        self.database_max_connections
            .unwrap_or(Self::DEFAULT_MAX_CONNECTIONS)
    }

    pub fn caps_policy(&self) -> CapsPolicy {
        CapsPolicy {
            enforce_extras: self.enforce_extras.unwrap_or(true),
        }
    }

    /// Loads the fallback entitlements from `entitlement_defaults_path`, or the built-in set
    /// when no path is configured.
    pub fn entitlement_defaults(&self) -> anyhow::Result<EntitlementDefaults> {
        match &self.entitlement_defaults_path {
            Some(path) => EntitlementDefaults::load(path)
                .with_context(|| format!("loading entitlement defaults from {path:?}")),
            None => Ok(EntitlementDefaults::default()),
        }
    }

    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            database_url: None,
            database_max_connections: None,
            migrations_path: None,
            entitlement_defaults_path: None,
            enforce_extras: None,
            rust_log: None,
            log_json: None,
        }
    }
}

pub struct AppState {
    pub db: Option<Arc<Database>>,
    pub entitlements: EntitlementService,
    pub config: Config,
}

impl AppState {
    /// Builds the application state. A missing or unreachable database is not an error: the
    /// entitlement service then serves the fallback entitlements.
    pub async fn new(config: Config) -> Result<Arc<Self>> {
        let db = match config.database_url.as_ref() {
            Some(database_url) => {
                let mut db_options = db::ConnectOptions::new(database_url.clone());
                db_options.max_connections(config.max_connections());
                Database::new(db_options).await.log_err().map(Arc::new)
            }
            None => {
                log::warn!("DATABASE_URL is not set; serving fallback entitlements");
                None
            }
        };

        let entitlements = EntitlementService::new(
            db.clone(),
            config.entitlement_defaults()?,
            config.caps_policy(),
        );

        Ok(Arc::new(Self {
            db,
            entitlements,
            config,
        }))
    }
}

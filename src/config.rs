use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::registrations::{UserContext, DEFAULT_USER_ID, DEFAULT_USER_NAME};
use crate::storage::{FileStorage, MemoryStorage, SqliteStorage, Storage, StorageError};
use crate::store::{EventStore, StoreOptions, DEFAULT_STORAGE_KEY};
use crate::utils;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageBackend,
    pub storage_key: String,
    /// Directory for the `file` backend; defaults to `<data root>/snapshots`.
    pub storage_dir: Option<PathBuf>,
    /// Database file for the `sqlite` backend; defaults to the data root.
    pub database_path: Option<PathBuf>,
    pub seed_when_empty: bool,
    pub user_id: String,
    pub user_name: String,
    pub action_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageBackend::default(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            storage_dir: None,
            database_path: None,
            seed_when_empty: true,
            user_id: DEFAULT_USER_ID.to_string(),
            user_name: DEFAULT_USER_NAME.to_string(),
            action_delay_ms: 1000,
        }
    }
}

impl AppConfig {
    pub fn user(&self) -> UserContext {
        UserContext::new(self.user_id.clone(), self.user_name.clone())
    }

    pub fn action_delay(&self) -> Duration {
        Duration::from_millis(self.action_delay_ms)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            key: self.storage_key.clone(),
            seed_when_empty: self.seed_when_empty,
        }
    }
}

pub struct ConfigStore {
    path: PathBuf,
    data: Mutex<AppConfig>,
}

impl ConfigStore {
    pub fn load() -> Self {
        Self::load_from(utils::config_path())
    }

    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = read_config(&path).unwrap_or_else(|err| {
            warn!(path = ?path, "{err:#}; using default config");
            AppConfig::default()
        });
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    pub fn read(&self) -> AppConfig {
        match self.data.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update<F>(&self, transform: F) -> Result<AppConfig>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut guard = self
            .data
            .lock()
            .map_err(|_| anyhow::anyhow!("config mutex poisoned"))?;
        transform(&mut guard);
        write_config(&self.path, &guard)?;
        Ok(guard.clone())
    }
}

fn read_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("unable to read config at {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("invalid config at {}", path.display()))
}

fn write_config(path: &Path, config: &AppConfig) -> Result<()> {
    utils::ensure_parent(path);
    let contents = serde_json::to_string_pretty(config)?;
    fs::write(path, contents)
        .with_context(|| format!("unable to write config at {}", path.display()))
}

pub fn open_storage(config: &AppConfig) -> Result<Box<dyn Storage>, StorageError> {
    let storage: Box<dyn Storage> = match config.storage {
        StorageBackend::Sqlite => match &config.database_path {
            Some(path) => Box::new(SqliteStorage::open(path)?),
            None => Box::new(SqliteStorage::open_default()?),
        },
        StorageBackend::File => {
            let dir = config.storage_dir.clone().unwrap_or_else(utils::snapshot_dir);
            Box::new(FileStorage::new(dir))
        }
        StorageBackend::Memory => Box::new(MemoryStorage::new()),
    };
    Ok(storage)
}

/// Opens the configured backend and loads the store. If the backend itself
/// cannot be opened the session runs on in-memory storage.
pub fn bootstrap(config: &AppConfig) -> EventStore {
    let storage: Box<dyn Storage> = match open_storage(config) {
        Ok(storage) => storage,
        Err(err) => {
            warn!(backend = ?config.storage, %err, "storage unavailable, keeping events in memory");
            Box::new(MemoryStorage::new())
        }
    };
    EventStore::init(storage, config.store_options())
}

use chrono::{NaiveDate, Utc};
use dirs::data_dir;
use once_cell::sync::Lazy;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::warn;

pub const DATA_DIR_ENV: &str = "EVENT_HOSTING_DATA_DIR";

static DATA_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    let root = match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) => PathBuf::from(dir),
        None => data_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
            .join("event-hosting"),
    };
    if let Err(err) = fs::create_dir_all(&root) {
        warn!(path = ?root, %err, "failed to create data root");
    }
    root
});

pub fn data_root() -> PathBuf {
    DATA_ROOT.clone()
}

pub fn database_path() -> PathBuf {
    data_root().join("event-hosting.sqlite")
}

pub fn config_path() -> PathBuf {
    data_root().join("config.json")
}

pub fn snapshot_dir() -> PathBuf {
    data_root().join("snapshots")
}

pub fn ensure_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            warn!(path = ?parent, %err, "failed to create parent directory");
        }
    }
}

/// Calendar day used for "upcoming": the UTC date, matching how stored
/// dates were produced.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::utils;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
}

/// A durable key-value slot. Values are always written whole; there are no
/// partial updates and no transactions spanning keys.
pub trait Storage: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-process storage. Clones share the same map, which is how tests model
/// a reload or a second tab pointed at the same origin.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage poisoned".into()))?;
        Ok(guard.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage poisoned".into()))?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key under a directory. Keys are used as file
/// names verbatim, so only ASCII letters, digits, `-` and `_` are accepted;
/// anything else is rejected rather than rewritten, keeping distinct keys in
/// distinct files.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // write-then-rename: readers never see a partial snapshot
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open_default() -> Result<Self, StorageError> {
        Self::open(utils::database_path())
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        utils::ensure_parent(path);
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv(
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at_utc TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unavailable("sqlite connection poisoned".into()))
    }
}

impl Storage for SqliteStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO kv (key, value, updated_at_utc)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at_utc = excluded.updated_at_utc",
            params![key, value, now],
        )?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Storage that refuses every write, like a browser over quota.
    pub(crate) struct FullStorage {
        pub(crate) inner: MemoryStorage,
    }

    impl Storage for FullStorage {
        fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.read(key)
        }

        fn write(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }
    }

    /// Storage whose first `failures` reads error out, then behaves.
    pub(crate) struct FlakyStorage {
        inner: MemoryStorage,
        failures: AtomicUsize,
    }

    impl FlakyStorage {
        pub(crate) fn new(inner: MemoryStorage, failures: usize) -> Self {
            Self {
                inner,
                failures: AtomicUsize::new(failures),
            }
        }
    }

    impl Storage for FlakyStorage {
        fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
            let remaining = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            if remaining.is_ok() {
                return Err(StorageError::Unavailable("read timed out".into()));
            }
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.inner.write(key, value)
        }
    }

    #[test]
    fn memory_clones_share_entries() {
        let a = MemoryStorage::new();
        let b = a.clone();
        a.write("k", "v1").expect("write");
        assert_eq!(b.read("k").expect("read").as_deref(), Some("v1"));
        assert_eq!(b.read("missing").expect("read"), None);
    }

    #[test]
    fn file_storage_overwrites_whole_value() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path().join("nested"));
        assert_eq!(storage.read("vibecraft-events").expect("read"), None);
        storage.write("vibecraft-events", "[1,2,3]").expect("write");
        storage.write("vibecraft-events", "[]").expect("write");
        assert_eq!(
            storage.read("vibecraft-events").expect("read").as_deref(),
            Some("[]")
        );
        assert!(dir.path().join("nested/vibecraft-events.json").exists());
    }

    #[test]
    fn file_storage_rejects_keys_that_are_not_file_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path());
        storage.write("a_b", "underscore").expect("write");

        for key in ["a.b", "../a_b", "", "a b"] {
            assert!(matches!(
                storage.write(key, "clobber"),
                Err(StorageError::InvalidKey(_))
            ));
            assert!(matches!(storage.read(key), Err(StorageError::InvalidKey(_))));
        }
        assert_eq!(
            storage.read("a_b").expect("read").as_deref(),
            Some("underscore")
        );
    }

    #[test]
    fn sqlite_storage_upserts_by_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.sqlite");
        {
            let storage = SqliteStorage::open(&path).expect("open");
            storage.write("a", "first").expect("write");
            storage.write("a", "second").expect("write");
            storage.write("b", "other").expect("write");
        }
        let reopened = SqliteStorage::open(&path).expect("reopen");
        assert_eq!(reopened.read("a").expect("read").as_deref(), Some("second"));
        assert_eq!(reopened.read("b").expect("read").as_deref(), Some("other"));
        assert_eq!(reopened.read("c").expect("read"), None);
    }
}

pub mod actions;
pub mod config;
pub mod models;
pub mod notify;
pub mod query;
pub mod registrations;
pub mod seed;
pub mod snapshot;
pub mod storage;
pub mod store;
mod utils;

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use config::{bootstrap, AppConfig, ConfigStore, StorageBackend};
pub use models::{Event, EventStatus, Faq, NewEvent, ValidationError};
pub use notify::{Notice, Variant};
pub use query::{OrganizerStats, SearchCriteria, SortBy};
pub use registrations::UserContext;
pub use storage::{FileStorage, MemoryStorage, SqliteStorage, Storage, StorageError};
pub use store::{
    CancelError, EventStore, Origin, PersistWarning, Receipt, RegisterError, RegisterOutcome,
    StoreOptions,
};
pub use utils::{data_root, today_utc};

/// Installs a stdout subscriber filtered by `RUST_LOG`. Safe to call more
/// than once; later calls are ignored.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,event_hosting=debug"));
    let installed = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .is_ok();
    if installed {
        info!("logging initialized");
    }
}

/// Loads the saved config (or defaults) and opens the store it describes.
pub fn open() -> (AppConfig, EventStore) {
    let config = ConfigStore::load().read();
    let store = bootstrap(&config);
    (config, store)
}

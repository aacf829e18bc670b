use super::DurabilityMode;
use crate::schema::ManagedObjectModel;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

/// Engine flags applied when a store is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Migrate a store written with an older model instead of refusing it
    pub migrate_automatically: bool,

    /// Infer the row mapping between models by entity and attribute name
    pub infer_mapping_model: bool,

    /// When commits reach the store file
    pub durability: DurabilityMode,
}

impl Default for StoreOptions {
    /// Lightweight migration enabled, asynchronous durability.
    fn default() -> Self {
        Self {
            migrate_automatically: true,
            infer_mapping_model: true,
            durability: DurabilityMode::default(),
        }
    }
}

impl StoreOptions {
    pub fn migrate_automatically(mut self, enabled: bool) -> Self {
        self.migrate_automatically = enabled;
        self
    }

    pub fn infer_mapping_model(mut self, enabled: bool) -> Self {
        self.infer_mapping_model = enabled;
        self
    }

    pub fn durability(mut self, mode: DurabilityMode) -> Self {
        self.durability = mode;
        self
    }
}

/// Everything needed to open a store coordinator.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Schema of every entity the store can hold
    pub model: Arc<ManagedObjectModel>,

    /// File backing the store, `None` for a purely in-memory store
    pub store_url: Option<PathBuf>,

    pub options: StoreOptions,
}

impl StoreConfig {
    /// A file-backed store at `store_url` with an empty model.
    pub fn new(store_url: impl Into<PathBuf>) -> Self {
        Self {
            model: Arc::new(ManagedObjectModel::new()),
            store_url: Some(store_url.into()),
            options: StoreOptions::default(),
        }
    }

    /// A store that never touches the file system.
    pub fn in_memory() -> Self {
        Self {
            model: Arc::new(ManagedObjectModel::new()),
            store_url: None,
            options: StoreOptions::default().durability(DurabilityMode::None),
        }
    }

    pub fn model(mut self, model: impl Into<Arc<ManagedObjectModel>>) -> Self {
        self.model = model.into();
        self
    }

    pub fn options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    pub fn durability(mut self, mode: DurabilityMode) -> Self {
        self.options.durability = mode;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.store_url.is_none() || self.options.durability == DurabilityMode::None
    }
}

/// Conventional per-application store location:
/// `<data dir>/<app>/<app>.store`, where `<app>` is the executable's stem and
/// the data dir is `$XDG_DATA_HOME`, `$HOME/.local/share`, or the temp dir.
pub fn default_store_url() -> PathBuf {
    let app = env::current_exe()
        .ok()
        .and_then(|exe| exe.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "recordsync".to_string());

    let data_dir = env::var_os("XDG_DATA_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            env::var_os("HOME")
                .filter(|v| !v.is_empty())
                .map(|home| PathBuf::from(home).join(".local").join("share"))
        })
        .unwrap_or_else(env::temp_dir);

    data_dir.join(&app).join(format!("{}.store", app))
}

pub mod config;
pub mod coordinator;
pub mod migration;
pub mod persistence;
pub mod store;

pub use config::{StoreConfig, StoreOptions, default_store_url};
pub use coordinator::StoreCoordinator;
pub use persistence::{DurabilityMode, STORE_FORMAT_VERSION, SnapshotMetadata, StoreFile, StoreSnapshot};
pub use store::{EntityRows, RecordStore};

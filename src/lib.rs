// ============================================================================
// recordsync Library
// ============================================================================
//
// Typed records over an embedded object store, plus records that mirror a
// remote service: get-or-create by remote identifier and staleness-aware
// merging of remote payloads.
//
// ============================================================================

pub mod context;
pub mod core;
pub mod prelude;
pub mod query;
pub mod record;
pub mod schema;
pub mod shared;
pub mod storage;
pub mod transaction;

// Re-export main types for convenience
pub use context::{Context, ManagedObject};
pub use crate::core::{ObjectId, Payload, RecordError, Result, Row, Value};
pub use query::{FetchRequest, Predicate, SortDescriptor};
pub use record::{PayloadExt, Record, RemoteRecord, parse_date, remote_entity};
pub use schema::{AttributeDescription, AttributeType, EntityDescription, ManagedObjectModel};
pub use shared::{has_shared_context, shared_context};
pub use storage::{DurabilityMode, StoreConfig, StoreCoordinator, StoreOptions};

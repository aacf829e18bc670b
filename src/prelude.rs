//! Everything a record module usually needs in one import.
//!
//! ```ignore
//! use recordsync::prelude::*;
//!
//! managed_record!(pub Article, "Article");
//! impl RemoteRecord for Article {}
//! ```

pub use crate::context::{Context, ManagedObject};
pub use crate::core::{Payload, RecordError, Result, Value};
pub use crate::managed_record;
pub use crate::query::{Predicate, SortDescriptor};
pub use crate::record::{
    CREATED_AT_KEY, PayloadExt, Record, RemoteRecord, UPDATED_AT_KEY, parse_date, remote_entity,
};
pub use crate::schema::{
    AttributeDescription, AttributeType, EntityDescription, ManagedObjectModel,
    register_schema_fragment,
};
pub use crate::shared::shared_context;

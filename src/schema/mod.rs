pub mod entity;
pub mod model;

pub use crate::core::AttributeType;
pub use entity::{AttributeDescription, EntityDescription};
pub use model::{ManagedObjectModel, SCHEMA_FILE_SUFFIX, register_schema_fragment};

pub mod error;
pub mod types;
pub mod value;

pub use error::{RecordError, Result};
pub use types::{ObjectId, Payload, Row, new_object_id};
pub use value::{AttributeType, Value};

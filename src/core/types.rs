use super::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Attribute values of one stored object, keyed by attribute name.
pub type Row = BTreeMap<String, Value>;

/// Store-assigned identity of a managed object.
pub type ObjectId = Uuid;

/// An undecoded remote object, as produced by parsing a JSON object.
pub type Payload = serde_json::Map<String, serde_json::Value>;

pub fn new_object_id() -> ObjectId {
    Uuid::new_v4()
}

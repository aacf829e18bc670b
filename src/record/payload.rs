use super::dates::parse_date;
use crate::core::{Payload, Value};
use chrono::{DateTime, Utc};

/// Typed field access on a decoded remote payload. JSON `null` reads as
/// absent, as does a field of the wrong shape.
pub trait PayloadExt {
    fn non_null(&self, key: &str) -> Option<&serde_json::Value>;

    fn text(&self, key: &str) -> Option<&str> {
        self.non_null(key).and_then(|v| v.as_str())
    }

    fn integer(&self, key: &str) -> Option<i64> {
        self.non_null(key).and_then(|v| v.as_i64())
    }

    fn float(&self, key: &str) -> Option<f64> {
        self.non_null(key).and_then(|v| v.as_f64())
    }

    fn boolean(&self, key: &str) -> Option<bool> {
        self.non_null(key).and_then(|v| v.as_bool())
    }

    fn date(&self, key: &str) -> Option<DateTime<Utc>> {
        self.non_null(key).and_then(parse_date)
    }

    /// A JSON scalar as a record [`Value`]; arrays and objects give `None`.
    fn to_value(&self, key: &str) -> Option<Value> {
        self.non_null(key).and_then(Value::from_json)
    }
}

impl PayloadExt for Payload {
    fn non_null(&self, key: &str) -> Option<&serde_json::Value> {
        self.get(key).filter(|v| !v.is_null())
    }
}

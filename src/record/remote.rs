// ============================================================================
// Remote-Synchronized Records
// ============================================================================
//
// Records whose authoritative copy lives on a remote service. Local copies are
// found by remote identifier; a payload either creates the record, merges into
// it, or is skipped when the local copy is already as fresh.
//
// Freshness is decided by `should_unpack_dictionary`. The provided
// implementation always accepts, so payloads without a "last modified" marker
// are always applied.
//
// ============================================================================

use super::base::{Record, resolve_context};
use crate::context::Context;
use crate::core::{AttributeType, Payload, RecordError, Result, Value};
use crate::query::Predicate;
use crate::schema::{AttributeDescription, EntityDescription};
use chrono::{DateTime, Utc};
use log::debug;

pub const DEFAULT_REMOTE_ID_KEY_PATH: &str = "remote_id";
pub const DEFAULT_REMOTE_ID_PAYLOAD_KEY: &str = "id";
pub const CREATED_AT_KEY: &str = "created_at";
pub const UPDATED_AT_KEY: &str = "updated_at";

/// Entity description carrying the attributes every remote record needs:
/// the remote identifier plus the creation and update timestamps.
pub fn remote_entity(name: impl Into<String>, id_type: AttributeType) -> EntityDescription {
    EntityDescription::new(name)
        .attribute(AttributeDescription::new(DEFAULT_REMOTE_ID_KEY_PATH, id_type))
        .attribute(AttributeDescription::new(CREATED_AT_KEY, AttributeType::Date))
        .attribute(AttributeDescription::new(UPDATED_AT_KEY, AttributeType::Date))
}

pub trait RemoteRecord: Record {
    /// Attribute holding the remote identifier.
    fn remote_id_key_path() -> &'static str {
        DEFAULT_REMOTE_ID_KEY_PATH
    }

    /// Payload field holding the remote identifier.
    fn remote_id_payload_key() -> &'static str {
        DEFAULT_REMOTE_ID_PAYLOAD_KEY
    }

    /// Copies domain fields out of `payload`. Runs after the timestamps have
    /// been refreshed, so an implementation may overwrite `updated_at` with
    /// the remote marker.
    fn unpack_fields(&self, _payload: &Payload) -> Result<()> {
        Ok(())
    }

    /// Whether `payload` should be merged into this record.
    fn should_unpack_dictionary(&self, _payload: &Payload) -> Result<bool> {
        Ok(true)
    }

    fn remote_id(&self) -> Result<Value> {
        self.object().get(Self::remote_id_key_path())
    }

    fn created_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.object().get(CREATED_AT_KEY)?.as_date())
    }

    fn updated_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.object().get(UPDATED_AT_KEY)?.as_date())
    }

    fn set_updated_at(&self, at: DateTime<Utc>) -> Result<()> {
        self.object().set(UPDATED_AT_KEY, at)
    }

    /// Sets `created_at` if it is still unset, refreshes `updated_at` to now,
    /// then hands the payload to [`RemoteRecord::unpack_fields`].
    fn unpack_dictionary(&self, payload: &Payload) -> Result<()> {
        let now = Utc::now();
        if self.created_at()?.is_none() {
            self.object().set(CREATED_AT_KEY, now)?;
        }
        self.set_updated_at(now)?;
        self.unpack_fields(payload)
    }

    /// The record with this remote identifier, or a new pending record
    /// carrying only the identifier. Nothing is saved.
    fn object_with_remote_id(remote_id: impl Into<Value>, ctx: Option<&Context>) -> Result<Self> {
        let ctx = resolve_context(ctx)?;
        let remote_id = normalize_remote_id::<Self>(&ctx, remote_id.into())?;
        if let Some(existing) = find_by_remote_id::<Self>(&ctx, &remote_id)? {
            return Ok(existing);
        }

        debug!(
            "Creating {} with {} = {}",
            Self::entity_name(),
            Self::remote_id_key_path(),
            remote_id
        );
        let record = Self::init_with_context(Some(&ctx))?;
        record.object().set(Self::remote_id_key_path(), remote_id)?;
        Ok(record)
    }

    /// The record with this remote identifier, if one exists. Never creates.
    fn existing_object_with_remote_id(
        remote_id: impl Into<Value>,
        ctx: Option<&Context>,
    ) -> Result<Option<Self>> {
        let ctx = resolve_context(ctx)?;
        let remote_id = normalize_remote_id::<Self>(&ctx, remote_id.into())?;
        find_by_remote_id::<Self>(&ctx, &remote_id)
    }

    /// Finds or creates the record identified by `payload`, then merges the
    /// payload in unless [`RemoteRecord::should_unpack_dictionary`] declines.
    fn object_with_dictionary(payload: &Payload, ctx: Option<&Context>) -> Result<Self> {
        let remote_id = remote_id_from_payload(Self::remote_id_payload_key(), payload)?;
        let record = Self::object_with_remote_id(remote_id, ctx)?;
        if record.should_unpack_dictionary(payload)? {
            record.unpack_dictionary(payload)?;
        } else {
            debug!(
                "Skipping stale payload for {} {}",
                Self::entity_name(),
                record.remote_id()?
            );
        }
        Ok(record)
    }

    /// The record identified by `payload`, if one exists. The payload is
    /// only used for its identifier; nothing is merged.
    fn existing_object_with_dictionary(
        payload: &Payload,
        ctx: Option<&Context>,
    ) -> Result<Option<Self>> {
        let remote_id = remote_id_from_payload(Self::remote_id_payload_key(), payload)?;
        Self::existing_object_with_remote_id(remote_id, ctx)
    }
}

fn find_by_remote_id<R: RemoteRecord>(ctx: &Context, remote_id: &Value) -> Result<Option<R>> {
    R::fetch_first(
        Some(ctx),
        Predicate::eq(R::remote_id_key_path(), remote_id.clone()),
    )
}

/// Reads the identifier out of a payload. Only strings and integers identify
/// a record.
fn remote_id_from_payload(key: &str, payload: &Payload) -> Result<Value> {
    match payload.get(key) {
        None | Some(serde_json::Value::Null) => Err(RecordError::MissingRemoteId(key.to_string())),
        Some(serde_json::Value::String(s)) => Ok(Value::Text(s.clone())),
        Some(serde_json::Value::Number(n)) => n.as_i64().map(Value::Integer).ok_or_else(|| {
            RecordError::InvalidRemoteId(format!("'{}' is not an integer identifier", n))
        }),
        Some(other) => Err(RecordError::InvalidRemoteId(format!(
            "'{}' cannot identify a record",
            other
        ))),
    }
}

/// Converts an identifier to the declared type of the remote-id attribute,
/// so "42" and 42 find the same record.
fn normalize_remote_id<R: RemoteRecord>(ctx: &Context, remote_id: Value) -> Result<Value> {
    let key = R::remote_id_key_path();
    if remote_id.is_null() {
        return Err(RecordError::MissingRemoteId(key.to_string()));
    }

    let entity = ctx.entity_description(R::entity_name())?;
    let attribute_type = entity.require_attribute(key)?.attribute_type;
    let converted = match (attribute_type, &remote_id) {
        (AttributeType::Text, Value::Integer(i)) => Some(Value::Text(i.to_string())),
        (AttributeType::Integer, Value::Text(s)) => s.trim().parse::<i64>().ok().map(Value::Integer),
        _ => attribute_type.coerce(remote_id.clone()),
    };
    converted.ok_or_else(|| {
        RecordError::InvalidRemoteId(format!(
            "{} cannot be stored in {} attribute '{}'",
            remote_id, attribute_type, key
        ))
    })
}

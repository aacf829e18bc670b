use super::{Context, ContextInner};
use crate::core::{ObjectId, RecordError, Result, Row, Value};
use crate::schema::EntityDescription;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};

/// Handle to one object living in a working context.
///
/// Clones share the same object: a value set through one clone is visible
/// through every other. Two handles refer to the same object exactly when
/// [`ManagedObject::ptr_eq`] holds.
#[derive(Clone)]
pub struct ManagedObject {
    inner: Arc<ObjectInner>,
}

struct ObjectInner {
    id: ObjectId,
    entity: Arc<EntityDescription>,
    context: Weak<ContextInner>,
    state: RwLock<ObjectState>,
}

struct ObjectState {
    values: Row,
    /// Values as of the last commit; `None` until first saved.
    committed: Option<Row>,
    deleted: bool,
}

impl ManagedObject {
    pub(crate) fn new(
        id: ObjectId,
        entity: Arc<EntityDescription>,
        context: Weak<ContextInner>,
        values: Row,
        committed: Option<Row>,
    ) -> Self {
        Self {
            inner: Arc::new(ObjectInner {
                id,
                entity,
                context,
                state: RwLock::new(ObjectState {
                    values,
                    committed,
                    deleted: false,
                }),
            }),
        }
    }

    pub fn object_id(&self) -> ObjectId {
        self.inner.id
    }

    pub fn entity(&self) -> &EntityDescription {
        &self.inner.entity
    }

    pub fn entity_name(&self) -> &str {
        self.inner.entity.name()
    }

    pub fn get(&self, key: &str) -> Result<Value> {
        self.inner.entity.require_attribute(key)?;
        let state = self.inner.state.read()?;
        Ok(state.values.get(key).cloned().unwrap_or(Value::Null))
    }

    /// Assigns an attribute. Types and required attributes are checked when
    /// the owning context is saved, not here.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.inner.entity.require_attribute(key)?;
        let mut state = self.inner.state.write()?;
        state.values.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Snapshot of every current attribute value.
    pub fn values(&self) -> Result<Row> {
        Ok(self.inner.state.read()?.values.clone())
    }

    /// The context this object was inserted into or fetched through.
    pub fn context(&self) -> Result<Context> {
        self.inner
            .context
            .upgrade()
            .map(Context::from_inner)
            .ok_or(RecordError::ContextDiscarded)
    }

    /// Whether the object has never been saved.
    pub fn is_inserted(&self) -> Result<bool> {
        let state = self.inner.state.read()?;
        Ok(state.committed.is_none() && !state.deleted)
    }

    pub fn is_deleted(&self) -> Result<bool> {
        Ok(self.inner.state.read()?.deleted)
    }

    /// Whether saving the context would write this object.
    pub fn has_changes(&self) -> Result<bool> {
        let state = self.inner.state.read()?;
        Ok(match &state.committed {
            None => !state.deleted,
            Some(committed) => state.deleted || *committed != state.values,
        })
    }

    pub fn ptr_eq(&self, other: &ManagedObject) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn committed_values(&self) -> Result<Option<Row>> {
        Ok(self.inner.state.read()?.committed.clone())
    }

    pub(crate) fn mark_committed(&self) -> Result<()> {
        let mut state = self.inner.state.write()?;
        if !state.deleted {
            state.committed = Some(state.values.clone());
        }
        Ok(())
    }

    pub(crate) fn mark_deleted(&self) -> Result<()> {
        self.inner.state.write()?.deleted = true;
        Ok(())
    }

    /// Drops uncommitted edits. Never-saved objects become deleted.
    pub(crate) fn revert(&self) -> Result<()> {
        let mut state = self.inner.state.write()?;
        match state.committed.clone() {
            Some(committed) => {
                state.values = committed;
                state.deleted = false;
            }
            None => state.deleted = true,
        }
        Ok(())
    }
}

impl fmt::Debug for ManagedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("ManagedObject");
        debug
            .field("entity", &self.entity_name())
            .field("id", &self.inner.id);
        match self.inner.state.read() {
            Ok(state) => debug.field("values", &state.values),
            Err(_) => debug.field("values", &"<poisoned>"),
        };
        debug.finish()
    }
}

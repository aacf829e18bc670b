// ============================================================================
// Working Context
// ============================================================================
//
// A context stages inserts, edits and deletes against a store coordinator
// until save() commits them as one change set. Within one context every
// object id maps to exactly one ManagedObject, so repeated fetches hand back
// the same handle.
//
// A context is meant to be driven by one owner at a time; its internal lock
// only keeps the bookkeeping consistent.
//
// ============================================================================

pub mod object;

pub use object::ManagedObject;

use crate::core::{ObjectId, RecordError, Result, Row, new_object_id};
use crate::query::{FetchRequest, compare_by};
use crate::schema::EntityDescription;
use crate::storage::StoreCoordinator;
use crate::transaction::{Change, ChangeSet};
use log::debug;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

pub(crate) struct ContextInner {
    coordinator: Arc<StoreCoordinator>,
    state: Mutex<ContextState>,
}

#[derive(Default)]
struct ContextState {
    registered: HashMap<ObjectId, ManagedObject>,
    /// Never-saved objects, in insertion order.
    inserted: Vec<ObjectId>,
    deleted: HashSet<ObjectId>,
}

impl Context {
    pub fn new(coordinator: Arc<StoreCoordinator>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                coordinator,
                state: Mutex::new(ContextState::default()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<ContextInner>) -> Self {
        Self { inner }
    }

    pub fn coordinator(&self) -> &Arc<StoreCoordinator> {
        &self.inner.coordinator
    }

    pub fn ptr_eq(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn entity_description(&self, name: &str) -> Result<Arc<EntityDescription>> {
        self.inner.coordinator.entity(name)
    }

    /// Creates a new object of `entity_name`, every attribute at its
    /// default. It is pending until the context is saved.
    pub fn insert_new_object(&self, entity_name: &str) -> Result<ManagedObject> {
        let entity = self.entity_description(entity_name)?;
        let values = entity.default_row();
        let object = ManagedObject::new(
            new_object_id(),
            entity,
            Arc::downgrade(&self.inner),
            values,
            None,
        );

        let mut state = self.inner.state.lock()?;
        state.registered.insert(object.object_id(), object.clone());
        state.inserted.push(object.object_id());
        Ok(object)
    }

    /// Objects matching `request`, pending changes of this context included:
    /// inserted objects are visible, deleted ones are not, and edited objects
    /// are matched on their current values.
    pub fn execute_fetch(&self, request: &FetchRequest) -> Result<Vec<ManagedObject>> {
        let entity = self.entity_description(&request.entity_name)?;
        for key in request.predicate.keys() {
            entity.require_attribute(key)?;
        }
        for descriptor in &request.sort_descriptors {
            entity.require_attribute(&descriptor.key)?;
        }

        let committed = self.inner.coordinator.committed()?;
        let mut state = self.inner.state.lock()?;

        let mut candidates: Vec<(ObjectId, Row)> = Vec::new();
        if let Some(rows) = committed.rows(entity.name()) {
            for (id, row) in rows.iter() {
                if state.deleted.contains(id) {
                    continue;
                }
                let current = match state.registered.get(id) {
                    Some(object) => object.values()?,
                    None => row.clone(),
                };
                candidates.push((*id, current));
            }
        }
        for id in &state.inserted {
            if let Some(object) = state.registered.get(id) {
                if object.entity_name() == entity.name() {
                    candidates.push((*id, object.values()?));
                }
            }
        }

        let mut matched = Vec::with_capacity(candidates.len());
        for (id, row) in candidates {
            if request.predicate.evaluate(&row)? {
                matched.push((id, row));
            }
        }
        matched.sort_by(|(_, a), (_, b)| compare_by(&request.sort_descriptors, a, b));
        if let Some(limit) = request.fetch_limit {
            matched.truncate(limit);
        }

        let mut objects = Vec::with_capacity(matched.len());
        for (id, row) in matched {
            let object = match state.registered.get(&id) {
                Some(object) => object.clone(),
                None => {
                    let object = ManagedObject::new(
                        id,
                        entity.clone(),
                        Arc::downgrade(&self.inner),
                        row.clone(),
                        Some(row),
                    );
                    state.registered.insert(id, object.clone());
                    object
                }
            };
            objects.push(object);
        }
        Ok(objects)
    }

    pub fn count(&self, request: &FetchRequest) -> Result<usize> {
        Ok(self.execute_fetch(request)?.len())
    }

    /// Stages `object` for deletion. A never-saved object is simply
    /// forgotten, and an object whose deletion was already saved is left
    /// alone.
    pub fn delete(&self, object: &ManagedObject) -> Result<()> {
        self.check_owned(object)?;
        let id = object.object_id();
        let mut state = self.inner.state.lock()?;
        if !state.registered.contains_key(&id) {
            return Ok(());
        }
        if let Some(pos) = state.inserted.iter().position(|i| *i == id) {
            state.inserted.remove(pos);
            state.registered.remove(&id);
        } else {
            state.deleted.insert(id);
        }
        object.mark_deleted()
    }

    pub fn has_changes(&self) -> Result<bool> {
        let state = self.inner.state.lock()?;
        if !state.inserted.is_empty() || !state.deleted.is_empty() {
            return Ok(true);
        }
        for object in state.registered.values() {
            if object.has_changes()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Commits every pending insert, edit and delete of this context.
    ///
    /// On failure nothing is written and the pending changes stay in place,
    /// so the caller can fix them and save again, or roll back.
    pub fn save(&self) -> Result<()> {
        let mut state = self.inner.state.lock()?;
        let changes = Self::pending_changes(&state)?;
        if changes.is_empty() {
            return Ok(());
        }

        self.inner.coordinator.commit(&changes)?;

        for id in std::mem::take(&mut state.deleted) {
            state.registered.remove(&id);
        }
        state.inserted.clear();
        for object in state.registered.values() {
            object.mark_committed()?;
        }
        debug!("Context saved {} changes", changes.len());
        Ok(())
    }

    /// Discards every pending change: edits are reverted, staged deletes are
    /// cancelled and never-saved objects are dropped.
    pub fn rollback(&self) -> Result<()> {
        let mut state = self.inner.state.lock()?;
        for id in std::mem::take(&mut state.inserted) {
            if let Some(object) = state.registered.remove(&id) {
                object.revert()?;
            }
        }
        state.deleted.clear();
        for object in state.registered.values() {
            object.revert()?;
        }
        Ok(())
    }

    /// Number of objects this context currently tracks.
    pub fn registered_count(&self) -> Result<usize> {
        Ok(self.inner.state.lock()?.registered.len())
    }

    fn pending_changes(state: &ContextState) -> Result<ChangeSet> {
        let mut changes = ChangeSet::new();

        for id in &state.inserted {
            if let Some(object) = state.registered.get(id) {
                changes.push(Change::Insert {
                    entity: object.entity_name().to_string(),
                    id: *id,
                    row: object.values()?,
                });
            }
        }

        let mut updates: Vec<&ManagedObject> = state
            .registered
            .values()
            .filter(|o| !state.deleted.contains(&o.object_id()))
            .collect();
        updates.sort_by_key(|o| o.object_id());
        for object in updates {
            let Some(old_row) = object.committed_values()? else {
                continue;
            };
            let new_row = object.values()?;
            if old_row != new_row {
                changes.push(Change::Update {
                    entity: object.entity_name().to_string(),
                    id: object.object_id(),
                    old_row,
                    new_row,
                });
            }
        }

        for id in &state.deleted {
            if let Some(object) = state.registered.get(id) {
                changes.push(Change::Delete {
                    entity: object.entity_name().to_string(),
                    id: *id,
                    old_row: object.committed_values()?.unwrap_or_default(),
                });
            }
        }

        Ok(changes)
    }

    fn check_owned(&self, object: &ManagedObject) -> Result<()> {
        let owner = object.context()?;
        if !owner.ptr_eq(self) {
            return Err(RecordError::ValidationFailed(format!(
                "Object {} belongs to a different context",
                object.object_id()
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Context");
        if let Some(url) = self.inner.coordinator.store_url() {
            debug.field("store_url", &url);
        }
        if let Ok(state) = self.inner.state.lock() {
            debug
                .field("registered", &state.registered.len())
                .field("inserted", &state.inserted.len())
                .field("deleted", &state.deleted.len());
        }
        debug.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AttributeType, Value};
    use crate::query::{Predicate, SortDescriptor};
    use crate::schema::{AttributeDescription, ManagedObjectModel};
    use crate::storage::StoreConfig;

    fn context() -> Context {
        let model = ManagedObjectModel::new()
            .with_entity(
                EntityDescription::new("Article")
                    .attribute(AttributeDescription::new("title", AttributeType::Text).required())
                    .attribute(AttributeDescription::new("rank", AttributeType::Integer)),
            )
            .unwrap();
        let coordinator = StoreCoordinator::open(StoreConfig::in_memory().model(model)).unwrap();
        Context::new(Arc::new(coordinator))
    }

    fn article(ctx: &Context, title: &str, rank: i64) -> ManagedObject {
        let obj = ctx.insert_new_object("Article").unwrap();
        obj.set("title", title).unwrap();
        obj.set("rank", rank).unwrap();
        obj
    }

    #[test]
    fn test_fetch_sees_pending_inserts() {
        let ctx = context();
        let a = article(&ctx, "A", 2);
        let found = ctx
            .execute_fetch(&FetchRequest::new("Article").predicate(Predicate::eq("title", "A")))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].ptr_eq(&a));
        assert!(ctx.has_changes().unwrap());
    }

    #[test]
    fn test_identity_is_stable_across_fetches() {
        let ctx = context();
        article(&ctx, "A", 1);
        ctx.save().unwrap();

        let other = Context::new(ctx.coordinator().clone());
        let first = other.execute_fetch(&FetchRequest::new("Article")).unwrap();
        let second = other.execute_fetch(&FetchRequest::new("Article")).unwrap();
        assert!(first[0].ptr_eq(&second[0]));
        assert_eq!(other.registered_count().unwrap(), 1);
    }

    #[test]
    fn test_save_commits_whole_context() {
        let ctx = context();
        article(&ctx, "A", 1);
        article(&ctx, "B", 2);
        ctx.save().unwrap();
        assert!(!ctx.has_changes().unwrap());

        let committed = ctx.coordinator().committed().unwrap();
        assert_eq!(committed.entity_row_count("Article"), 2);
    }

    #[test]
    fn test_failed_save_keeps_pending_changes() {
        let ctx = context();
        let obj = ctx.insert_new_object("Article").unwrap();
        assert!(matches!(ctx.save(), Err(RecordError::ConstraintViolation(_))));
        assert!(obj.is_inserted().unwrap());

        obj.set("title", "Fixed").unwrap();
        ctx.save().unwrap();
        assert!(!obj.is_inserted().unwrap());
    }

    #[test]
    fn test_sorted_limited_fetch() {
        let ctx = context();
        article(&ctx, "C", 3);
        article(&ctx, "A", 1);
        article(&ctx, "B", 2);
        ctx.save().unwrap();

        let request = FetchRequest::new("Article")
            .sort_by(vec![SortDescriptor::descending("rank")])
            .limit(2);
        let titles: Vec<Value> = ctx
            .execute_fetch(&request)
            .unwrap()
            .iter()
            .map(|o| o.get("title").unwrap())
            .collect();
        assert_eq!(titles, vec![Value::from("C"), Value::from("B")]);
    }

    #[test]
    fn test_edits_are_matched_before_save() {
        let ctx = context();
        let a = article(&ctx, "A", 1);
        ctx.save().unwrap();
        a.set("title", "Z").unwrap();

        let by_old = FetchRequest::new("Article").predicate(Predicate::eq("title", "A"));
        let by_new = FetchRequest::new("Article").predicate(Predicate::eq("title", "Z"));
        assert_eq!(ctx.count(&by_old).unwrap(), 0);
        assert_eq!(ctx.count(&by_new).unwrap(), 1);
    }

    #[test]
    fn test_delete_and_rollback() {
        let ctx = context();
        let a = article(&ctx, "A", 1);
        ctx.save().unwrap();

        ctx.delete(&a).unwrap();
        assert_eq!(ctx.count(&FetchRequest::new("Article")).unwrap(), 0);
        ctx.rollback().unwrap();
        assert_eq!(ctx.count(&FetchRequest::new("Article")).unwrap(), 1);

        ctx.delete(&a).unwrap();
        ctx.save().unwrap();
        assert_eq!(ctx.coordinator().committed().unwrap().row_count(), 0);
        assert!(a.is_deleted().unwrap());
    }

    #[test]
    fn test_deleting_twice_leaves_nothing_pending() {
        let ctx = context();
        let a = article(&ctx, "A", 1);
        ctx.save().unwrap();

        ctx.delete(&a).unwrap();
        ctx.save().unwrap();
        ctx.delete(&a).unwrap();
        ctx.save().unwrap();
        assert!(!ctx.has_changes().unwrap());
        assert!(a.is_deleted().unwrap());

        let draft = article(&ctx, "B", 2);
        ctx.delete(&draft).unwrap();
        ctx.delete(&draft).unwrap();
        assert!(!ctx.has_changes().unwrap());
    }

    #[test]
    fn test_save_reports_specific_validation_errors() {
        let ctx = context();
        let a = article(&ctx, "A", 1);
        a.set("title", 42i64).unwrap();
        assert!(matches!(ctx.save(), Err(RecordError::TypeMismatch(_))));

        a.set("title", Value::Null).unwrap();
        assert!(matches!(ctx.save(), Err(RecordError::ConstraintViolation(_))));
        assert_eq!(ctx.coordinator().committed().unwrap().row_count(), 0);
    }

    #[test]
    fn test_rollback_drops_inserts_and_edits() {
        let ctx = context();
        let a = article(&ctx, "A", 1);
        ctx.save().unwrap();
        a.set("title", "Changed").unwrap();
        let b = article(&ctx, "B", 2);

        ctx.rollback().unwrap();
        assert_eq!(a.get("title").unwrap(), Value::from("A"));
        assert!(b.is_deleted().unwrap());
        assert!(!ctx.has_changes().unwrap());
    }

    #[test]
    fn test_unknown_entity_and_key() {
        let ctx = context();
        assert!(matches!(
            ctx.insert_new_object("Missing"),
            Err(RecordError::EntityNotFound(_))
        ));
        let request = FetchRequest::new("Article").predicate(Predicate::eq("nope", 1i64));
        assert!(matches!(
            ctx.execute_fetch(&request),
            Err(RecordError::UnknownAttribute(_, _))
        ));
    }

    #[test]
    fn test_discarded_context() {
        let ctx = context();
        let obj = ctx.insert_new_object("Article").unwrap();
        drop(ctx);
        assert!(matches!(obj.context(), Err(RecordError::ContextDiscarded)));
    }
}

use crate::core::{ObjectId, RecordError, Result, Row};
use crate::schema::ManagedObjectModel;
use crate::transaction::{Change, ChangeSet};
use im::OrdMap;
use serde::{Deserialize, Serialize};

/// Committed objects of one entity, ordered by object id.
pub type EntityRows = OrdMap<ObjectId, Row>;

/// Committed state of a store: every row of every entity.
///
/// Backed by persistent maps, so cloning is O(1) and a commit can build the
/// next state without disturbing readers of the current one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordStore {
    entities: OrdMap<String, EntityRows>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, entity: &str) -> Option<&EntityRows> {
        self.entities.get(entity)
    }

    pub fn get(&self, entity: &str, id: &ObjectId) -> Option<&Row> {
        self.entities.get(entity).and_then(|rows| rows.get(id))
    }

    pub fn contains(&self, entity: &str, id: &ObjectId) -> bool {
        self.get(entity, id).is_some()
    }

    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.keys().map(|s| s.as_str()).collect()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn row_count(&self) -> usize {
        self.entities.values().map(|rows| rows.len()).sum()
    }

    pub fn entity_row_count(&self, entity: &str) -> usize {
        self.entities.get(entity).map_or(0, |rows| rows.len())
    }

    pub(crate) fn put_rows(&mut self, entity: impl Into<String>, rows: EntityRows) {
        self.entities.insert(entity.into(), rows);
    }

    /// Validates a change set against `model` and applies it.
    ///
    /// On error `self` may be partially modified; callers apply to a clone.
    pub fn apply(&mut self, changes: &ChangeSet, model: &ManagedObjectModel) -> Result<()> {
        for change in changes.changes() {
            let entity = model.entity(change.entity_name())?;
            if let Some(row) = change.resulting_row() {
                entity.validate_row(row)?;
            }

            if !self.entities.contains_key(entity.name()) {
                self.entities.insert(entity.name().to_string(), EntityRows::new());
            }
            let rows = self
                .entities
                .get_mut(entity.name())
                .ok_or_else(|| RecordError::EntityNotFound(entity.name().to_string()))?;
            match change {
                Change::Insert { id, row, .. } => {
                    if rows.contains_key(id) {
                        return Err(RecordError::CommitConflict(format!(
                            "Object {} of '{}' already exists",
                            id,
                            entity.name()
                        )));
                    }
                    rows.insert(*id, row.clone());
                }
                Change::Update { id, new_row, .. } => {
                    if !rows.contains_key(id) {
                        return Err(RecordError::CommitConflict(format!(
                            "Object {} of '{}' was removed from the store",
                            id,
                            entity.name()
                        )));
                    }
                    rows.insert(*id, new_row.clone());
                }
                Change::Delete { id, .. } => {
                    if rows.remove(id).is_none() {
                        return Err(RecordError::CommitConflict(format!(
                            "Object {} of '{}' was already deleted",
                            id,
                            entity.name()
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

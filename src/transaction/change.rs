// ============================================================================
// Pending Change Tracking
// ============================================================================
//
// A context turns its pending inserts, modified objects and staged deletes
// into a ChangeSet at save time. The coordinator applies a ChangeSet as one
// unit: either every change lands or none does.
//
// ============================================================================

use crate::core::{ObjectId, Row};

#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// A new object.
    Insert {
        entity: String,
        id: ObjectId,
        row: Row,
    },

    /// An existing object whose values changed since its last commit.
    Update {
        entity: String,
        id: ObjectId,
        old_row: Row,
        new_row: Row,
    },

    /// Removal of an existing object.
    Delete {
        entity: String,
        id: ObjectId,
        old_row: Row,
    },
}

impl Change {
    pub fn entity_name(&self) -> &str {
        match self {
            Change::Insert { entity, .. } => entity,
            Change::Update { entity, .. } => entity,
            Change::Delete { entity, .. } => entity,
        }
    }

    pub fn object_id(&self) -> ObjectId {
        match self {
            Change::Insert { id, .. } | Change::Update { id, .. } | Change::Delete { id, .. } => {
                *id
            }
        }
    }

    /// Row the object will hold once the change is applied, if any.
    pub fn resulting_row(&self) -> Option<&Row> {
        match self {
            Change::Insert { row, .. } => Some(row),
            Change::Update { new_row, .. } => Some(new_row),
            Change::Delete { .. } => None,
        }
    }
}

/// Every pending change of one context, committed atomically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn counts(&self) -> ChangeCounts {
        let mut counts = ChangeCounts::default();
        for change in &self.changes {
            match change {
                Change::Insert { .. } => counts.inserted += 1,
                Change::Update { .. } => counts.updated += 1,
                Change::Delete { .. } => counts.deleted += 1,
            }
        }
        counts
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

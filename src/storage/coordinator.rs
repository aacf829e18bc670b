// ============================================================================
// Store Coordinator
// ============================================================================
//
// Owns the committed store, the model it is validated against, and the file
// it is written to. Contexts read committed rows through it and hand it their
// change sets on save.
//
// ============================================================================

use super::migration::migrate_store;
use super::{RecordStore, StoreConfig, StoreFile, StoreOptions, StoreSnapshot};
use crate::core::Result;
use crate::schema::{EntityDescription, ManagedObjectModel};
use crate::transaction::ChangeSet;
use log::{debug, info};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::debug_span;

pub struct StoreCoordinator {
    model: Arc<ManagedObjectModel>,
    options: StoreOptions,
    file: Option<StoreFile>,
    store: RwLock<RecordStore>,
}

impl StoreCoordinator {
    /// Opens the store described by `config`, loading and if necessary
    /// migrating an existing store file.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let in_memory = config.is_in_memory();
        let StoreConfig {
            model,
            store_url,
            options,
        } = config;

        let file = if in_memory {
            None
        } else {
            store_url.map(StoreFile::new)
        };

        let mut store = RecordStore::new();
        if let Some(file) = &file {
            if let Some(snapshot) = file.load()? {
                debug!(
                    "Loaded store {} ({} rows, saved at {})",
                    file.path().display(),
                    snapshot.metadata.row_count,
                    snapshot.metadata.saved_at
                );
                let migrating = snapshot.model != *model;
                store = migrate_store(snapshot.store, &snapshot.model, &model, &options)?;
                if migrating {
                    file.save(
                        &StoreSnapshot::new((*model).clone(), store.clone()),
                        options.durability,
                    )?;
                    info!("Migrated store {} to the current model", file.path().display());
                }
            } else {
                debug!("No store at {}, starting empty", file.path().display());
            }
        }

        Ok(Self {
            model,
            options,
            file,
            store: RwLock::new(store),
        })
    }

    pub fn model(&self) -> &Arc<ManagedObjectModel> {
        &self.model
    }

    pub fn entity(&self, name: &str) -> Result<Arc<EntityDescription>> {
        self.model.entity(name)
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn store_url(&self) -> Option<&Path> {
        self.file.as_ref().map(|f| f.path())
    }

    /// Current committed state. Cheap: the store shares structure.
    pub fn committed(&self) -> Result<RecordStore> {
        Ok(self.store.read()?.clone())
    }

    /// Applies every change in `changes` or none of them.
    ///
    /// The store file is written before the new state becomes visible, so a
    /// failed write leaves both the file and the in-memory store as they were.
    pub fn commit(&self, changes: &ChangeSet) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let counts = changes.counts();
        let span = debug_span!(
            "store_commit",
            inserted = counts.inserted,
            updated = counts.updated,
            deleted = counts.deleted
        );
        let _guard = span.enter();

        let mut store = self.store.write()?;
        let mut next = store.clone();
        next.apply(changes, &self.model)?;

        if let Some(file) = &self.file {
            file.save(
                &StoreSnapshot::new((*self.model).clone(), next.clone()),
                self.options.durability,
            )?;
        }

        *store = next;
        debug!(
            "Committed {} inserts, {} updates, {} deletes",
            counts.inserted, counts.updated, counts.deleted
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AttributeType, RecordError, Row, Value, new_object_id};
    use crate::schema::AttributeDescription;
    use crate::storage::DurabilityMode;
    use crate::transaction::Change;
    use tempfile::TempDir;

    fn model() -> ManagedObjectModel {
        ManagedObjectModel::new()
            .with_entity(
                EntityDescription::new("Article").attribute(
                    AttributeDescription::new("title", AttributeType::Text).required(),
                ),
            )
            .unwrap()
    }

    fn insert(title: Option<&str>) -> ChangeSet {
        let mut row = Row::new();
        row.insert("title".into(), Value::from(title));
        let mut changes = ChangeSet::new();
        changes.push(Change::Insert {
            entity: "Article".into(),
            id: new_object_id(),
            row,
        });
        changes
    }

    #[test]
    fn test_commit_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.store");
        let config = StoreConfig::new(&path)
            .model(model())
            .durability(DurabilityMode::Sync);

        let coordinator = StoreCoordinator::open(config.clone()).unwrap();
        coordinator.commit(&insert(Some("A"))).unwrap();
        assert_eq!(coordinator.store_url(), Some(path.as_path()));
        drop(coordinator);

        let reopened = StoreCoordinator::open(config).unwrap();
        assert_eq!(reopened.committed().unwrap().entity_row_count("Article"), 1);
    }

    #[test]
    fn test_rejected_commit_changes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.store");
        let coordinator =
            StoreCoordinator::open(StoreConfig::new(&path).model(model())).unwrap();

        let err = coordinator.commit(&insert(None)).unwrap_err();
        assert!(matches!(err, RecordError::ConstraintViolation(_)));
        assert_eq!(coordinator.committed().unwrap().row_count(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_in_memory_store() {
        let coordinator =
            StoreCoordinator::open(StoreConfig::in_memory().model(model())).unwrap();
        coordinator.commit(&insert(Some("A"))).unwrap();
        assert!(coordinator.store_url().is_none());
        assert_eq!(coordinator.committed().unwrap().row_count(), 1);
    }

    #[test]
    fn test_reopen_with_new_model_migrates() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.store");
        let coordinator =
            StoreCoordinator::open(StoreConfig::new(&path).model(model())).unwrap();
        coordinator.commit(&insert(Some("A"))).unwrap();
        drop(coordinator);

        let v2 = ManagedObjectModel::new()
            .with_entity(
                EntityDescription::new("Article")
                    .attribute(AttributeDescription::new("title", AttributeType::Text).required())
                    .attribute(AttributeDescription::new("pinned", AttributeType::Boolean).with_default(false)),
            )
            .unwrap();
        let migrated = StoreCoordinator::open(StoreConfig::new(&path).model(v2.clone())).unwrap();
        let store = migrated.committed().unwrap();
        let row = store.rows("Article").unwrap().values().next().unwrap();
        assert_eq!(row["pinned"], Value::Boolean(false));
        drop(migrated);

        // The migrated model was written back
        let loaded = StoreFile::new(&path).load().unwrap().unwrap();
        assert_eq!(loaded.model, v2);
    }

    #[test]
    fn test_reordered_model_opens_without_migration() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.store");
        let author = || {
            ManagedObjectModel::new()
                .with_entity(
                    EntityDescription::new("Author")
                        .attribute(AttributeDescription::new("name", AttributeType::Text)),
                )
                .unwrap()
        };

        let written = ManagedObjectModel::merge([model(), author()]).unwrap();
        let coordinator = StoreCoordinator::open(StoreConfig::new(&path).model(written)).unwrap();
        coordinator.commit(&insert(Some("A"))).unwrap();
        drop(coordinator);

        let reordered = ManagedObjectModel::merge([author(), model()]).unwrap();
        let reopened = StoreCoordinator::open(
            StoreConfig::new(&path)
                .model(reordered)
                .options(StoreOptions::default().migrate_automatically(false)),
        )
        .unwrap();
        assert_eq!(reopened.committed().unwrap().entity_row_count("Article"), 1);
    }

    #[test]
    fn test_reopen_without_migration_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.store");
        let coordinator =
            StoreCoordinator::open(StoreConfig::new(&path).model(model())).unwrap();
        coordinator.commit(&insert(Some("A"))).unwrap();
        drop(coordinator);

        let result = StoreCoordinator::open(
            StoreConfig::new(&path)
                .model(ManagedObjectModel::new())
                .options(StoreOptions::default().migrate_automatically(false)),
        );
        assert!(matches!(result, Err(RecordError::SchemaMismatch(_))));
    }
}

// ============================================================================
// Lightweight Migration
// ============================================================================
//
// Maps rows written under one model onto another model by entity and
// attribute name:
// - entities and attributes missing from the target model are dropped
// - attributes new in the target model take their default value
// - Integer <-> Float changes are coerced, other type changes fail
//
// ============================================================================

use super::{EntityRows, RecordStore, StoreOptions};
use crate::core::{RecordError, Result, Row};
use crate::schema::{EntityDescription, ManagedObjectModel};
use log::info;

/// Decides whether a store written with `source` may be opened with
/// `target`, and migrates it when the options allow.
pub fn migrate_store(
    store: RecordStore,
    source: &ManagedObjectModel,
    target: &ManagedObjectModel,
    options: &StoreOptions,
) -> Result<RecordStore> {
    if source == target {
        return Ok(store);
    }

    if !options.migrate_automatically {
        return Err(RecordError::SchemaMismatch(format!(
            "store has entities [{}], model has [{}], and automatic migration is disabled",
            source.entity_names().join(", "),
            target.entity_names().join(", ")
        )));
    }
    if !options.infer_mapping_model {
        return Err(RecordError::MigrationFailed(
            "no mapping model available and inference is disabled".to_string(),
        ));
    }

    let mut migrated = RecordStore::new();
    for entity in target.entities() {
        let Some(rows) = store.rows(entity.name()) else {
            continue;
        };
        let source_entity = source.entity(entity.name()).ok();
        let mut next_rows = EntityRows::new();
        for (id, row) in rows.iter() {
            next_rows.insert(*id, migrate_row(row, source_entity.as_deref(), entity)?);
        }
        migrated.put_rows(entity.name(), next_rows);
    }

    for name in store.entity_names() {
        if !target.contains(name) {
            info!(
                "Lightweight migration dropped entity '{}' ({} rows)",
                name,
                store.entity_row_count(name)
            );
        }
    }
    info!(
        "Lightweight migration mapped {} of {} rows onto the current model",
        migrated.row_count(),
        store.row_count()
    );

    Ok(migrated)
}

fn migrate_row(
    row: &Row,
    source: Option<&EntityDescription>,
    target: &EntityDescription,
) -> Result<Row> {
    let mut next = Row::new();
    for attribute in target.attributes() {
        let known_before = source.is_some_and(|s| s.has_attribute(&attribute.name));
        let value = match row.get(&attribute.name) {
            Some(value) if known_before => {
                attribute.attribute_type.coerce(value.clone()).ok_or_else(|| {
                    RecordError::MigrationFailed(format!(
                        "cannot convert '{}.{}' from {} to {}",
                        target.name(),
                        attribute.name,
                        value.type_name(),
                        attribute.attribute_type
                    ))
                })?
            }
            _ => attribute.default_value.clone(),
        };

        if value.is_null() && !attribute.optional {
            return Err(RecordError::MigrationFailed(format!(
                "required attribute '{}.{}' has no value and no default",
                target.name(),
                attribute.name
            )));
        }
        next.insert(attribute.name.clone(), value);
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AttributeType, Value, new_object_id};
    use crate::schema::AttributeDescription;
    use crate::transaction::{Change, ChangeSet};

    fn v1() -> ManagedObjectModel {
        ManagedObjectModel::new()
            .with_entity(
                EntityDescription::new("Article")
                    .attribute(AttributeDescription::new("title", AttributeType::Text))
                    .attribute(AttributeDescription::new("score", AttributeType::Integer))
                    .attribute(AttributeDescription::new("legacy", AttributeType::Text)),
            )
            .unwrap()
            .with_entity(EntityDescription::new("Obsolete"))
            .unwrap()
    }

    fn store_v1() -> RecordStore {
        let mut row = Row::new();
        row.insert("title".into(), Value::Text("A".into()));
        row.insert("score".into(), Value::Integer(3));
        row.insert("legacy".into(), Value::Text("old".into()));
        let mut changes = ChangeSet::new();
        changes.push(Change::Insert {
            entity: "Article".into(),
            id: new_object_id(),
            row,
        });
        changes.push(Change::Insert {
            entity: "Obsolete".into(),
            id: new_object_id(),
            row: Row::new(),
        });
        let mut store = RecordStore::new();
        store.apply(&changes, &v1()).unwrap();
        store
    }

    #[test]
    fn test_same_model_is_untouched() {
        let store = store_v1();
        let migrated = migrate_store(store.clone(), &v1(), &v1(), &StoreOptions::default()).unwrap();
        assert_eq!(migrated, store);
    }

    #[test]
    fn test_lightweight_migration() {
        let v2 = ManagedObjectModel::new()
            .with_entity(
                EntityDescription::new("Article")
                    .attribute(AttributeDescription::new("title", AttributeType::Text))
                    .attribute(AttributeDescription::new("score", AttributeType::Float))
                    .attribute(
                        AttributeDescription::new("views", AttributeType::Integer)
                            .required()
                            .with_default(0),
                    ),
            )
            .unwrap();

        let migrated = migrate_store(store_v1(), &v1(), &v2, &StoreOptions::default()).unwrap();
        assert_eq!(migrated.entity_names(), vec!["Article"]);
        let row = migrated.rows("Article").unwrap().values().next().unwrap().clone();
        assert_eq!(row["title"], Value::Text("A".into()));
        assert!(matches!(row["score"], Value::Float(f) if f == 3.0));
        assert_eq!(row["views"], Value::Integer(0));
        assert!(!row.contains_key("legacy"));
    }

    #[test]
    fn test_required_attribute_without_default_fails() {
        let v2 = ManagedObjectModel::new()
            .with_entity(
                EntityDescription::new("Article")
                    .attribute(AttributeDescription::new("author", AttributeType::Text).required()),
            )
            .unwrap();
        assert!(matches!(
            migrate_store(store_v1(), &v1(), &v2, &StoreOptions::default()),
            Err(RecordError::MigrationFailed(_))
        ));
    }

    #[test]
    fn test_incompatible_type_change_fails() {
        let v2 = ManagedObjectModel::new()
            .with_entity(
                EntityDescription::new("Article")
                    .attribute(AttributeDescription::new("title", AttributeType::Boolean)),
            )
            .unwrap();
        assert!(matches!(
            migrate_store(store_v1(), &v1(), &v2, &StoreOptions::default()),
            Err(RecordError::MigrationFailed(_))
        ));
    }

    #[test]
    fn test_disabled_migration_reports_mismatch() {
        let v2 = ManagedObjectModel::new()
            .with_entity(EntityDescription::new("Article"))
            .unwrap();
        let options = StoreOptions::default().migrate_automatically(false);
        assert!(matches!(
            migrate_store(store_v1(), &v1(), &v2, &options),
            Err(RecordError::SchemaMismatch(_))
        ));

        let options = StoreOptions::default().infer_mapping_model(false);
        assert!(matches!(
            migrate_store(store_v1(), &v1(), &v2, &options),
            Err(RecordError::MigrationFailed(_))
        ));
    }
}

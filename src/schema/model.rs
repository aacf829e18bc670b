use super::EntityDescription;
use crate::core::{RecordError, Result};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// File suffix picked up by [`ManagedObjectModel::load_dir`].
pub const SCHEMA_FILE_SUFFIX: &str = ".schema.json";

// Fragments contributed by application modules; the shared stack merges them
// into its default model.
lazy_static! {
    static ref SCHEMA_FRAGMENTS: RwLock<Vec<ManagedObjectModel>> = RwLock::new(Vec::new());
}

/// Registers a schema fragment for the default model of the shared stack.
///
/// Fragments must be registered before the shared model is first resolved.
pub fn register_schema_fragment(fragment: ManagedObjectModel) -> Result<()> {
    let mut fragments = SCHEMA_FRAGMENTS.write()?;
    fragments.push(fragment);
    Ok(())
}

/// The full schema of a store: every entity description it can hold.
///
/// Two models are equal when they describe the same entities, whatever order
/// the entities were declared or registered in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagedObjectModel {
    entities: Vec<Arc<EntityDescription>>,
}

impl PartialEq for ManagedObjectModel {
    fn eq(&self, other: &Self) -> bool {
        self.entities.len() == other.entities.len()
            && self.entities.iter().all(|entity| {
                other
                    .entities
                    .iter()
                    .any(|candidate| candidate.name() == entity.name() && candidate == entity)
            })
    }
}

impl ManagedObjectModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity: EntityDescription) -> Result<Self> {
        entity.check_well_formed()?;
        if self.contains(entity.name()) {
            return Err(RecordError::InvalidSchema(format!(
                "Entity '{}' is declared more than once",
                entity.name()
            )));
        }
        self.entities.push(Arc::new(entity));
        Ok(self)
    }

    /// Merges several models into one. Entity names must be unique across
    /// all of them.
    pub fn merge<I>(models: I) -> Result<Self>
    where
        I: IntoIterator<Item = ManagedObjectModel>,
    {
        let mut merged = Self::new();
        for model in models {
            for entity in model.entities {
                if merged.contains(entity.name()) {
                    return Err(RecordError::InvalidSchema(format!(
                        "Entity '{}' is declared by more than one schema fragment",
                        entity.name()
                    )));
                }
                merged.entities.push(entity);
            }
        }
        Ok(merged)
    }

    /// Merge of every fragment passed to [`register_schema_fragment`].
    pub fn merged_from_registered() -> Result<Self> {
        let fragments = SCHEMA_FRAGMENTS.read()?;
        Self::merge(fragments.iter().cloned())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let model: ManagedObjectModel = serde_json::from_str(json)
            .map_err(|e| RecordError::InvalidSchema(format!("Failed to parse schema: {}", e)))?;
        for entity in &model.entities {
            entity.check_well_formed()?;
        }
        // Re-merge to reject duplicate names inside a single document
        Self::merge([model])
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RecordError::SerializationError(format!("Failed to encode schema: {}", e)))
    }

    /// Loads and merges every `*.schema.json` file in `dir`, in file name order.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            let is_schema = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(SCHEMA_FILE_SUFFIX));
            if is_schema && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut fragments = Vec::with_capacity(paths.len());
        for path in paths {
            let json = fs::read_to_string(&path)?;
            fragments.push(Self::from_json(&json).map_err(|e| {
                RecordError::InvalidSchema(format!("{}: {}", path.display(), e))
            })?);
        }
        Self::merge(fragments)
    }

    pub fn entity(&self, name: &str) -> Result<Arc<EntityDescription>> {
        self.entities
            .iter()
            .find(|e| e.name() == name)
            .cloned()
            .ok_or_else(|| RecordError::EntityNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entities.iter().any(|e| e.name() == name)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Arc<EntityDescription>> {
        self.entities.iter()
    }

    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

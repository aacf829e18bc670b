//! Store file: a MessagePack snapshot of the committed store and its model.

use super::RecordStore;
use crate::core::{RecordError, Result};
use crate::schema::ManagedObjectModel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const STORE_FORMAT_VERSION: u32 = 1;

// ============================================================================
// Durability Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DurabilityMode {
    /// Write the store file on every commit and fsync it.
    Sync,
    /// Write the store file on every commit, leaving flushing to the OS.
    #[default]
    Async,
    /// Keep the store in memory only.
    None,
}

// ============================================================================
// Store Snapshot
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub model: ManagedObjectModel,
    pub store: RecordStore,
    pub metadata: SnapshotMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub saved_at: DateTime<Utc>,
    pub row_count: usize,
    pub entity_count: usize,
}

impl StoreSnapshot {
    pub fn new(model: ManagedObjectModel, store: RecordStore) -> Self {
        let metadata = SnapshotMetadata {
            saved_at: Utc::now(),
            row_count: store.row_count(),
            entity_count: store.entity_count(),
        };
        Self {
            version: STORE_FORMAT_VERSION,
            model,
            store,
            metadata,
        }
    }
}

// ============================================================================
// Store File
// ============================================================================

pub struct StoreFile {
    path: PathBuf,
}

impl StoreFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the store file atomically: the snapshot is written to a
    /// temporary file in the same directory and renamed over the old one.
    pub fn save(&self, snapshot: &StoreSnapshot, durability: DurabilityMode) -> Result<()> {
        if durability == DurabilityMode::None {
            return Ok(());
        }

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| {
            RecordError::IoError(format!("Failed to create store directory: {}", e))
        })?;

        let serialized = rmp_serde::to_vec(snapshot).map_err(|e| {
            RecordError::SerializationError(format!("Failed to serialize store: {}", e))
        })?;

        let temp_file = NamedTempFile::new_in(&parent)
            .map_err(|e| RecordError::IoError(format!("Failed to create temp file: {}", e)))?;
        {
            let mut writer = BufWriter::new(temp_file.as_file());
            writer
                .write_all(&serialized)
                .map_err(|e| RecordError::IoError(format!("Failed to write store: {}", e)))?;
            writer
                .flush()
                .map_err(|e| RecordError::IoError(format!("Failed to flush store: {}", e)))?;
        }
        if durability == DurabilityMode::Sync {
            temp_file
                .as_file()
                .sync_all()
                .map_err(|e| RecordError::IoError(format!("Failed to sync store: {}", e)))?;
        }
        temp_file
            .persist(&self.path)
            .map_err(|e| RecordError::IoError(format!("Failed to replace store file: {}", e)))?;
        Ok(())
    }

    pub fn load(&self) -> Result<Option<StoreSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let mut file = File::open(&self.path)
            .map_err(|e| RecordError::IoError(format!("Failed to open store: {}", e)))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| RecordError::IoError(format!("Failed to read store: {}", e)))?;
        let snapshot: StoreSnapshot = rmp_serde::from_slice(&data).map_err(|e| {
            RecordError::SerializationError(format!("Failed to deserialize store: {}", e))
        })?;
        if snapshot.version != STORE_FORMAT_VERSION {
            return Err(RecordError::SerializationError(format!(
                "Unsupported store format version {} (expected {})",
                snapshot.version, STORE_FORMAT_VERSION
            )));
        }
        Ok(Some(snapshot))
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn delete(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| RecordError::IoError(format!("Failed to delete store: {}", e)))?;
        }
        Ok(())
    }
}

//! Routing group persistence.
//!
//! # Responsibilities
//! - Narrow repository interface over persisted routing groups
//! - In-memory implementation with optional JSON file persistence
//!
//! # Design Decisions
//! - Names are unique; `create` rejects duplicates
//! - Only `name` and `active` are persisted; cluster counters are derived on read
//! - Iteration order is insertion order so listings are stable

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::groups::record::RoutingGroupRecord;

/// Repository of persisted routing groups.
#[async_trait]
pub trait RoutingGroupStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<RoutingGroupRecord>, StoreError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<RoutingGroupRecord>, StoreError>;

    /// Insert a new group. Fails with [`StoreError::Duplicate`] if the name exists.
    async fn create(&self, record: &RoutingGroupRecord) -> Result<(), StoreError>;

    /// Overwrite the persisted fields of an existing group.
    async fn update(&self, record: &RoutingGroupRecord) -> Result<(), StoreError>;

    /// Remove a group. Absent names are not an error.
    async fn delete(&self, name: &str) -> Result<(), StoreError>;
}

/// Routing group store held in memory, optionally mirrored to a JSON file.
#[derive(Debug, Default)]
pub struct InMemoryRoutingGroupStore {
    records: RwLock<Vec<RoutingGroupRecord>>,
    persistence_path: Option<PathBuf>,
}

impl InMemoryRoutingGroupStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from file if it exists; later writes are saved back to it.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let mut records = Vec::new();
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let loaded: Vec<RoutingGroupRecord> = serde_json::from_reader(reader)?;
            records = loaded.iter().map(RoutingGroupRecord::persisted).collect();
            tracing::info!(count = records.len(), path = ?path, "Loaded routing groups from file");
        }
        Ok(Self {
            records: RwLock::new(records),
            persistence_path: Some(path.to_path_buf()),
        })
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<RoutingGroupRecord>> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<RoutingGroupRecord>> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }

    fn save(&self, records: &[RoutingGroupRecord]) -> Result<(), StoreError> {
        if let Some(path) = &self.persistence_path {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, records)?;
            tracing::debug!(count = records.len(), "Saved routing groups to file");
        }
        Ok(())
    }
}

#[async_trait]
impl RoutingGroupStore for InMemoryRoutingGroupStore {
    async fn find_all(&self) -> Result<Vec<RoutingGroupRecord>, StoreError> {
        Ok(self.read().clone())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<RoutingGroupRecord>, StoreError> {
        Ok(self.read().iter().find(|r| r.name == name).cloned())
    }

    async fn create(&self, record: &RoutingGroupRecord) -> Result<(), StoreError> {
        let mut records = self.write();
        if records.iter().any(|r| r.name == record.name) {
            return Err(StoreError::Duplicate(record.name.clone()));
        }
        records.push(record.persisted());
        self.save(&records)
    }

    async fn update(&self, record: &RoutingGroupRecord) -> Result<(), StoreError> {
        let mut records = self.write();
        if let Some(existing) = records.iter_mut().find(|r| r.name == record.name) {
            *existing = record.persisted();
        }
        self.save(&records)
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let mut records = self.write();
        records.retain(|r| r.name != name);
        self.save(&records)
    }
}

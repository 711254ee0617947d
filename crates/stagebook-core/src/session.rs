//! # Session Module
//!
//! A `Session` owns one storage backend and is the handle every Stagebook
//! operation runs against.
//!
//! ## Storage Backends
//!
//! Session supports two storage backends:
//! - `InMemory`: Uses `MemoryStore` (fast, volatile unless exported)
//! - `Persistent`: Uses `RedbStore` for disk-backed ACID storage
//!
//! The Session itself implements [`EntityStore`], so the domain modules
//! (`Registry`, `Timesheet`, `Directory`, `Analytics`) accept either a bare
//! store or a session.

use crate::storage::RedbStore;
use crate::store::{EntityStore, MemoryStore, Tables, Upsert};
use crate::{
    Contact, DirectoryEntry, Organisation, Project, Record, StageAllocation, StagebookError,
    TimeEntry,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Storage backend for a Session.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory tables (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed tables using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

// NOTE: StorageBackend does NOT implement Clone.
// RedbStore (database handle) cannot be safely cloned.

/// Row counts per table, inactive rows included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCounts {
    pub organisations: usize,
    pub contacts: usize,
    pub projects: usize,
    pub stage_allocations: usize,
    pub time_entries: usize,
    pub directory_entries: usize,
}

/// Handle over one storage backend.
#[derive(Debug, Default)]
pub struct Session {
    backend: StorageBackend,
}

impl Session {
    /// Create a new empty session with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an in-memory session pre-loaded with `tables`.
    pub fn with_tables(tables: Tables) -> Result<Self, StagebookError> {
        tables.validate_keys()?;
        Ok(Self {
            backend: StorageBackend::InMemory(MemoryStore::from_tables(tables)),
        })
    }

    /// Create a session with persistent redb storage.
    ///
    /// Opens or creates a redb database at the given path.
    /// All changes are automatically persisted to disk.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, StagebookError> {
        let redb = RedbStore::open(path)?;
        Ok(Self {
            backend: StorageBackend::Persistent(redb),
        })
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    /// Row counts for every table.
    pub fn counts(&self) -> Result<TableCounts, StagebookError> {
        Ok(TableCounts {
            organisations: self.count::<Organisation>()?,
            contacts: self.count::<Contact>()?,
            projects: self.count::<Project>()?,
            stage_allocations: self.count::<StageAllocation>()?,
            time_entries: self.count::<TimeEntry>()?,
            directory_entries: self.count::<DirectoryEntry>()?,
        })
    }

    /// Copy every table out of the backend.
    ///
    /// For persistent backends this reads from a single consistent
    /// transaction.
    pub fn export_tables(&self) -> Result<Tables, StagebookError> {
        match &self.backend {
            StorageBackend::InMemory(store) => Ok(store.tables().clone()),
            StorageBackend::Persistent(redb) => redb.snapshot(),
        }
    }

    /// Replace the backend's contents with `tables`.
    pub fn import_tables(&mut self, tables: Tables) -> Result<(), StagebookError> {
        tables.validate_keys()?;
        match &mut self.backend {
            StorageBackend::InMemory(store) => {
                *store = MemoryStore::from_tables(tables);
                Ok(())
            }
            StorageBackend::Persistent(redb) => redb.import(&tables),
        }
    }

    /// Compact the on-disk database. A no-op for in-memory sessions.
    pub fn compact(&mut self) -> Result<(), StagebookError> {
        match &mut self.backend {
            StorageBackend::InMemory(_) => Ok(()),
            StorageBackend::Persistent(redb) => redb.compact(),
        }
    }
}

impl EntityStore for Session {
    fn get<R: Record>(&self, id: u64) -> Result<Option<R>, StagebookError> {
        match &self.backend {
            StorageBackend::InMemory(store) => store.get(id),
            StorageBackend::Persistent(redb) => redb.get(id),
        }
    }

    fn scan<R: Record>(&self) -> Result<Vec<R>, StagebookError> {
        match &self.backend {
            StorageBackend::InMemory(store) => store.scan(),
            StorageBackend::Persistent(redb) => redb.scan(),
        }
    }

    fn count<R: Record>(&self) -> Result<usize, StagebookError> {
        match &self.backend {
            StorageBackend::InMemory(store) => store.count::<R>(),
            StorageBackend::Persistent(redb) => redb.count::<R>(),
        }
    }

    fn insert<R: Record>(
        &mut self,
        build: impl FnOnce(u64) -> R,
    ) -> Result<R, StagebookError> {
        match &mut self.backend {
            StorageBackend::InMemory(store) => store.insert(build),
            StorageBackend::Persistent(redb) => redb.insert(build),
        }
    }

    fn insert_unique<R: Record>(
        &mut self,
        existing: impl Fn(&R) -> bool,
        build: impl FnOnce(u64) -> R,
    ) -> Result<Upsert<R>, StagebookError> {
        match &mut self.backend {
            StorageBackend::InMemory(store) => store.insert_unique(existing, build),
            StorageBackend::Persistent(redb) => redb.insert_unique(existing, build),
        }
    }

    fn update<R: Record>(
        &mut self,
        id: u64,
        apply: impl FnOnce(&mut R) -> Result<(), StagebookError>,
    ) -> Result<R, StagebookError> {
        match &mut self.backend {
            StorageBackend::InMemory(store) => store.update(id, apply),
            StorageBackend::Persistent(redb) => redb.update(id, apply),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

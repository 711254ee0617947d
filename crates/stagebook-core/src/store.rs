//! # Entity Store
//!
//! The storage seam for Stagebook.
//!
//! This module defines the `EntityStore` trait and the in-memory
//! `MemoryStore`. All data structures use `BTreeMap` for deterministic
//! ordering; rows are returned in id order.
//!
//! ## Atomic check-then-insert
//!
//! Idempotent creates (contacts, stage allocations, directory rows) and the
//! unique job-number rule all go through [`EntityStore::insert_unique`]. The
//! lookup, id allocation and insert happen as one unit: `&mut self` keeps
//! in-process callers serialised, and persistent backends run the whole unit
//! inside a single write transaction.

use crate::{
    Contact, DirectoryEntry, Organisation, Project, Record, SoftDelete, StageAllocation,
    StagebookError, TimeEntry, Visibility,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// UPSERT RESULT
// =============================================================================

/// Outcome of an idempotent insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert<R> {
    /// A new row was written.
    Created(R),
    /// A matching row already existed and was returned unchanged.
    Existing(R),
}

impl<R> Upsert<R> {
    /// True when a new row was written.
    #[must_use]
    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    /// The row, whichever way it was obtained.
    #[must_use]
    pub fn into_inner(self) -> R {
        match self {
            Self::Created(row) | Self::Existing(row) => row,
        }
    }

    /// Borrow the row.
    #[must_use]
    pub fn row(&self) -> &R {
        match self {
            Self::Created(row) | Self::Existing(row) => row,
        }
    }
}

// =============================================================================
// ENTITYSTORE TRAIT
// =============================================================================

/// Row-level storage operations shared by every backend.
///
/// No method ever removes a row. All fallible operations return
/// `Result<T, StagebookError>` so in-memory and persistent backends are
/// interchangeable.
pub trait EntityStore {
    /// Fetch a row by id, active or not.
    fn get<R: Record>(&self, id: u64) -> Result<Option<R>, StagebookError>;

    /// Every row of a table in id order, including inactive rows.
    fn scan<R: Record>(&self) -> Result<Vec<R>, StagebookError>;

    /// Number of rows in a table, including inactive rows.
    fn count<R: Record>(&self) -> Result<usize, StagebookError>;

    /// Allocate the next id and write the row built from it.
    fn insert<R: Record>(
        &mut self,
        build: impl FnOnce(u64) -> R,
    ) -> Result<R, StagebookError>;

    /// Return the first row matching `existing`, or insert a new one.
    ///
    /// The scan and the insert form one atomic unit.
    fn insert_unique<R: Record>(
        &mut self,
        existing: impl Fn(&R) -> bool,
        build: impl FnOnce(u64) -> R,
    ) -> Result<Upsert<R>, StagebookError>;

    /// Read-modify-write a row by id.
    ///
    /// Fails with `NotFound` if the row does not exist. If `apply` fails the
    /// row is left untouched.
    fn update<R: Record>(
        &mut self,
        id: u64,
        apply: impl FnOnce(&mut R) -> Result<(), StagebookError>,
    ) -> Result<R, StagebookError>;

    /// Fetch a row that must exist and be active.
    fn get_active<R: Record>(&self, id: u64) -> Result<R, StagebookError> {
        self.get::<R>(id)?
            .filter(Record::is_active)
            .ok_or_else(|| StagebookError::not_found(R::KIND, id))
    }

    /// Rows visible under `visibility` that satisfy `keep`, in id order.
    fn select<R: Record>(
        &self,
        visibility: Visibility,
        keep: impl Fn(&R) -> bool,
    ) -> Result<Vec<R>, StagebookError> {
        Ok(self
            .scan::<R>()?
            .into_iter()
            .filter(|row| visibility.admits(row.is_active()) && keep(row))
            .collect())
    }

    /// Soft-delete an active row.
    ///
    /// A row that is already inactive is reported as `NotFound`, matching how
    /// every other active-only lookup treats it.
    fn deactivate<R: SoftDelete>(&mut self, id: u64) -> Result<R, StagebookError> {
        self.update::<R>(id, |row| {
            if !row.is_active() {
                return Err(StagebookError::not_found(R::KIND, id));
            }
            row.deactivate();
            Ok(())
        })
    }
}

// =============================================================================
// TABLES
// =============================================================================

/// Every table, held in memory.
///
/// Used as the `MemoryStore` body and as the payload of exported snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tables {
    pub organisations: BTreeMap<u64, Organisation>,
    pub contacts: BTreeMap<u64, Contact>,
    pub projects: BTreeMap<u64, Project>,
    pub allocations: BTreeMap<u64, StageAllocation>,
    pub time_entries: BTreeMap<u64, TimeEntry>,
    pub directory: BTreeMap<u64, DirectoryEntry>,
}

impl Tables {
    /// Total number of rows across all tables.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.organisations.len()
            + self.contacts.len()
            + self.projects.len()
            + self.allocations.len()
            + self.time_entries.len()
            + self.directory.len()
    }

    /// Check that every row is stored under its own id.
    pub fn validate_keys(&self) -> Result<(), StagebookError> {
        fn check<R: Record>(rows: &BTreeMap<u64, R>) -> Result<(), StagebookError> {
            match rows.iter().find(|(key, row)| **key != row.id()) {
                Some((key, row)) => Err(StagebookError::Serialization(format!(
                    "{} row {} stored under key {}",
                    R::KIND,
                    row.id(),
                    key
                ))),
                None => Ok(()),
            }
        }

        check(&self.organisations)?;
        check(&self.contacts)?;
        check(&self.projects)?;
        check(&self.allocations)?;
        check(&self.time_entries)?;
        check(&self.directory)
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Volatile, in-memory entity store.
///
/// Ids continue from the highest key in each table; since rows are never
/// removed, an id is never handed out twice.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Tables,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing set of tables (e.g. an imported snapshot).
    #[must_use]
    pub fn from_tables(tables: Tables) -> Self {
        Self { tables }
    }

    /// Borrow every table.
    #[must_use]
    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    fn next_id<R: Record>(&self) -> u64 {
        R::rows(&self.tables)
            .last_key_value()
            .map(|(id, _)| id.saturating_add(1))
            .unwrap_or(1)
    }
}

impl EntityStore for MemoryStore {
    fn get<R: Record>(&self, id: u64) -> Result<Option<R>, StagebookError> {
        Ok(R::rows(&self.tables).get(&id).cloned())
    }

    fn scan<R: Record>(&self) -> Result<Vec<R>, StagebookError> {
        Ok(R::rows(&self.tables).values().cloned().collect())
    }

    fn count<R: Record>(&self) -> Result<usize, StagebookError> {
        Ok(R::rows(&self.tables).len())
    }

    fn insert<R: Record>(
        &mut self,
        build: impl FnOnce(u64) -> R,
    ) -> Result<R, StagebookError> {
        let id = self.next_id::<R>();
        let row = build(id);
        R::rows_mut(&mut self.tables).insert(id, row.clone());
        Ok(row)
    }

    fn insert_unique<R: Record>(
        &mut self,
        existing: impl Fn(&R) -> bool,
        build: impl FnOnce(u64) -> R,
    ) -> Result<Upsert<R>, StagebookError> {
        if let Some(found) = R::rows(&self.tables).values().find(|row| existing(row)) {
            return Ok(Upsert::Existing(found.clone()));
        }
        self.insert(build).map(Upsert::Created)
    }

    fn update<R: Record>(
        &mut self,
        id: u64,
        apply: impl FnOnce(&mut R) -> Result<(), StagebookError>,
    ) -> Result<R, StagebookError> {
        let slot = R::rows_mut(&mut self.tables)
            .get_mut(&id)
            .ok_or_else(|| StagebookError::not_found(R::KIND, id))?;

        // Work on a copy so a failed `apply` leaves the row untouched.
        let mut row = slot.clone();
        apply(&mut row)?;
        *slot = row.clone();
        Ok(row)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ContactRole, DirectoryEntryId, EntityKind, ProjectId, ContactId};

    fn entry(id: u64, contact: u64) -> DirectoryEntry {
        DirectoryEntry {
            id: DirectoryEntryId(id),
            project: ProjectId(1),
            contact: ContactId(contact),
            role: ContactRole::Engineer,
            notes: None,
            is_active: true,
        }
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut store = MemoryStore::new();
        let a = store.insert(|id| entry(id, 1)).expect("insert");
        let b = store.insert(|id| entry(id, 2)).expect("insert");

        assert_eq!(a.id.0, 1);
        assert_eq!(b.id.0, 2);
        assert_eq!(store.count::<DirectoryEntry>().expect("count"), 2);
    }

    #[test]
    fn insert_unique_returns_existing() {
        let mut store = MemoryStore::new();
        let first = store
            .insert_unique(|row: &DirectoryEntry| row.contact == ContactId(7), |id| entry(id, 7))
            .expect("first");
        let second = store
            .insert_unique(|row: &DirectoryEntry| row.contact == ContactId(7), |id| entry(id, 7))
            .expect("second");

        assert!(first.was_created());
        assert!(!second.was_created());
        assert_eq!(first.row(), second.row());
        assert_eq!(store.count::<DirectoryEntry>().expect("count"), 1);
    }

    #[test]
    fn failed_update_leaves_row_untouched() {
        let mut store = MemoryStore::new();
        store.insert(|id| entry(id, 1)).expect("insert");

        let result = store.update::<DirectoryEntry>(1, |row| {
            row.notes = Some("changed".to_string());
            Err(StagebookError::Validation("no".to_string()))
        });

        assert!(result.is_err());
        let row = store.get::<DirectoryEntry>(1).expect("get").expect("row");
        assert_eq!(row.notes, None);
    }

    #[test]
    fn deactivate_is_soft_and_not_repeatable() {
        let mut store = MemoryStore::new();
        store.insert(|id| entry(id, 1)).expect("insert");

        let row = store.deactivate::<DirectoryEntry>(1).expect("deactivate");
        assert!(!row.is_active);
        assert_eq!(store.count::<DirectoryEntry>().expect("count"), 1);

        let again = store.deactivate::<DirectoryEntry>(1);
        assert!(matches!(
            again,
            Err(StagebookError::NotFound {
                kind: EntityKind::DirectoryEntry,
                id: 1
            })
        ));
    }

    #[test]
    fn select_respects_visibility() {
        let mut store = MemoryStore::new();
        store.insert(|id| entry(id, 1)).expect("insert");
        store.insert(|id| entry(id, 2)).expect("insert");
        store.deactivate::<DirectoryEntry>(1).expect("deactivate");

        let active = store
            .select::<DirectoryEntry>(Visibility::ActiveOnly, |_| true)
            .expect("select");
        let audit = store
            .select::<DirectoryEntry>(Visibility::IncludeInactive, |_| true)
            .expect("select");

        assert_eq!(active.len(), 1);
        assert_eq!(audit.len(), 2);
    }

    #[test]
    fn get_active_hides_inactive_rows() {
        let mut store = MemoryStore::new();
        store.insert(|id| entry(id, 1)).expect("insert");
        store.deactivate::<DirectoryEntry>(1).expect("deactivate");

        assert!(store.get::<DirectoryEntry>(1).expect("get").is_some());
        assert!(store.get_active::<DirectoryEntry>(1).is_err());
    }
}

//! # redb-backed Entity Storage
//!
//! A disk-backed entity store using the redb embedded database.
//!
//! Each entity kind gets its own table keyed by row id with postcard-encoded
//! rows as values. Every mutating call runs in exactly one write transaction,
//! so an idempotent create either sees the existing row or commits the new
//! one; two writers can never both insert the same logical row.

use crate::store::{EntityStore, Tables, Upsert};
use crate::{
    Contact, DirectoryEntry, Organisation, Project, Record, StageAllocation, StagebookError,
    TimeEntry,
};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    Table, TableDefinition, WriteTransaction,
};
use std::collections::BTreeMap;
use std::path::Path;

/// Table for one record type: row id -> postcard bytes.
fn table_for<R: Record>() -> TableDefinition<'static, u64, &'static [u8]> {
    TableDefinition::new(R::KIND.table_name())
}

fn storage_err(e: impl std::fmt::Display) -> StagebookError {
    StagebookError::Storage(e.to_string())
}

fn encode<R: Record>(row: &R) -> Result<Vec<u8>, StagebookError> {
    postcard::to_allocvec(row).map_err(|e| StagebookError::Serialization(e.to_string()))
}

fn decode<R: Record>(bytes: &[u8]) -> Result<R, StagebookError> {
    postcard::from_bytes(bytes).map_err(|e| {
        StagebookError::Serialization(format!("corrupt {} row: {e}", R::KIND))
    })
}

/// A disk-backed entity store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StagebookError> {
        let db = Database::create(path.as_ref()).map_err(storage_err)?;

        // Create every table up front so read transactions never miss one.
        let write_txn = db.begin_write().map_err(storage_err)?;
        {
            let _ = write_txn
                .open_table(table_for::<Organisation>())
                .map_err(storage_err)?;
            let _ = write_txn
                .open_table(table_for::<Contact>())
                .map_err(storage_err)?;
            let _ = write_txn
                .open_table(table_for::<Project>())
                .map_err(storage_err)?;
            let _ = write_txn
                .open_table(table_for::<StageAllocation>())
                .map_err(storage_err)?;
            let _ = write_txn
                .open_table(table_for::<TimeEntry>())
                .map_err(storage_err)?;
            let _ = write_txn
                .open_table(table_for::<DirectoryEntry>())
                .map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;

        Ok(Self { db })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), StagebookError> {
        self.db.compact().map_err(storage_err)?;
        Ok(())
    }

    /// Read every table into memory from one consistent read transaction.
    pub fn snapshot(&self) -> Result<Tables, StagebookError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        Ok(Tables {
            organisations: load_rows(&read_txn)?,
            contacts: load_rows(&read_txn)?,
            projects: load_rows(&read_txn)?,
            allocations: load_rows(&read_txn)?,
            time_entries: load_rows(&read_txn)?,
            directory: load_rows(&read_txn)?,
        })
    }

    /// Replace the entire database contents with `tables`.
    ///
    /// All tables are rewritten in a single transaction: either the whole
    /// snapshot lands or nothing changes.
    pub fn import(&mut self, tables: &Tables) -> Result<(), StagebookError> {
        tables.validate_keys()?;

        let write_txn = self.db.begin_write().map_err(storage_err)?;
        replace_rows(&write_txn, &tables.organisations)?;
        replace_rows(&write_txn, &tables.contacts)?;
        replace_rows(&write_txn, &tables.projects)?;
        replace_rows(&write_txn, &tables.allocations)?;
        replace_rows(&write_txn, &tables.time_entries)?;
        replace_rows(&write_txn, &tables.directory)?;
        write_txn.commit().map_err(storage_err)?;
        Ok(())
    }
}

fn load_rows<R: Record>(read_txn: &ReadTransaction) -> Result<BTreeMap<u64, R>, StagebookError> {
    let table = read_txn.open_table(table_for::<R>()).map_err(storage_err)?;
    let mut rows = BTreeMap::new();
    for entry in table.iter().map_err(storage_err)? {
        let (key, value) = entry.map_err(storage_err)?;
        rows.insert(key.value(), decode::<R>(value.value())?);
    }
    Ok(rows)
}

fn replace_rows<R: Record>(
    write_txn: &WriteTransaction,
    rows: &BTreeMap<u64, R>,
) -> Result<(), StagebookError> {
    let mut table = write_txn
        .open_table(table_for::<R>())
        .map_err(storage_err)?;

    let stale: Vec<u64> = table
        .iter()
        .map_err(storage_err)?
        .map(|entry| entry.map(|(key, _)| key.value()).map_err(storage_err))
        .collect::<Result<_, _>>()?;
    for key in stale {
        table.remove(key).map_err(storage_err)?;
    }

    for (id, row) in rows {
        let bytes = encode(row)?;
        table.insert(*id, bytes.as_slice()).map_err(storage_err)?;
    }
    Ok(())
}

/// Write a new row under the next free id (last key + 1).
fn append<R: Record>(
    table: &mut Table<'_, u64, &'static [u8]>,
    build: impl FnOnce(u64) -> R,
) -> Result<R, StagebookError> {
    let next_id = table
        .last()
        .map_err(storage_err)?
        .map(|(key, _)| key.value().saturating_add(1))
        .unwrap_or(1);

    let row = build(next_id);
    let bytes = encode(&row)?;
    table
        .insert(next_id, bytes.as_slice())
        .map_err(storage_err)?;
    Ok(row)
}

impl EntityStore for RedbStore {
    fn get<R: Record>(&self, id: u64) -> Result<Option<R>, StagebookError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(table_for::<R>()).map_err(storage_err)?;
        match table.get(id).map_err(storage_err)? {
            Some(data) => decode(data.value()).map(Some),
            None => Ok(None),
        }
    }

    fn scan<R: Record>(&self) -> Result<Vec<R>, StagebookError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        Ok(load_rows::<R>(&read_txn)?.into_values().collect())
    }

    fn count<R: Record>(&self) -> Result<usize, StagebookError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(table_for::<R>()).map_err(storage_err)?;
        let len = table.len().map_err(storage_err)?;
        usize::try_from(len).map_err(storage_err)
    }

    fn insert<R: Record>(
        &mut self,
        build: impl FnOnce(u64) -> R,
    ) -> Result<R, StagebookError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        let row = {
            let mut table = write_txn
                .open_table(table_for::<R>())
                .map_err(storage_err)?;
            append(&mut table, build)?
        };
        write_txn.commit().map_err(storage_err)?;
        Ok(row)
    }

    fn insert_unique<R: Record>(
        &mut self,
        existing: impl Fn(&R) -> bool,
        build: impl FnOnce(u64) -> R,
    ) -> Result<Upsert<R>, StagebookError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;

        let row = {
            let mut table = write_txn
                .open_table(table_for::<R>())
                .map_err(storage_err)?;

            let mut found = None;
            for entry in table.iter().map_err(storage_err)? {
                let (_, value) = entry.map_err(storage_err)?;
                let row = decode::<R>(value.value())?;
                if existing(&row) {
                    found = Some(row);
                    break;
                }
            }
            if let Some(row) = found {
                // Nothing written; dropping the transaction aborts it.
                return Ok(Upsert::Existing(row));
            }

            append(&mut table, build)?
        };

        write_txn.commit().map_err(storage_err)?;
        Ok(Upsert::Created(row))
    }

    fn update<R: Record>(
        &mut self,
        id: u64,
        apply: impl FnOnce(&mut R) -> Result<(), StagebookError>,
    ) -> Result<R, StagebookError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;

        let row = {
            let mut table = write_txn
                .open_table(table_for::<R>())
                .map_err(storage_err)?;

            let mut row = match table.get(id).map_err(storage_err)? {
                Some(data) => decode::<R>(data.value())?,
                None => return Err(StagebookError::not_found(R::KIND, id)),
            };

            apply(&mut row)?;
            let bytes = encode(&row)?;
            table.insert(id, bytes.as_slice()).map_err(storage_err)?;
            row
        };

        write_txn.commit().map_err(storage_err)?;
        Ok(row)
    }
}

// =============================================================================
// TESTS
// =============================================================================

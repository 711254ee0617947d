//! # Storage Module
//!
//! Persistent storage backends for Stagebook.
//!
//! The in-memory `MemoryStore` lives in `crate::store`. This module holds the
//! disk-backed backend built on `redb` (ACID, crash safe, MVCC).

mod redb_store;

pub use redb_store::RedbStore;

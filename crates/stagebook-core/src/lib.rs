//! # stagebook-core
//!
//! The entity store and burn-rate analytics for Stagebook.
//!
//! This crate holds every piece of domain logic:
//! - `types`: identifiers, fixed-point hours, RIBA stages, roles, errors
//! - `store` / `storage`: the `EntityStore` trait, in-memory and redb backends
//! - `session`: a handle choosing one backend at runtime
//! - `registry`, `timesheet`, `directory`: CRUD and idempotent creates
//! - `analytics`: stage, project and portfolio burn with risk classification
//! - `formats`: the binary snapshot format
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies (pure Rust)
//! - No process-wide state: every operation takes an explicit store
//! - Rows are soft-deleted, never removed
//! - Deterministic: `BTreeMap` ordering, integer hour sums

// =============================================================================
// MODULES
// =============================================================================

pub mod analytics;
pub mod directory;
pub mod formats;
pub mod primitives;
pub mod registry;
pub mod session;
pub mod storage;
pub mod store;
pub mod timesheet;
pub mod types;

mod validate;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    AllocationId, Contact, ContactId, ContactRole, DirectoryEntry, DirectoryEntryId, EntityKind,
    Hours, Organisation, OrganisationId, Project, ProjectId, ProjectStatus, Record, RibaStage,
    RiskStatus, SoftDelete, StageAllocation, StagebookError, TimeEntry, TimeEntryId, Visibility,
};

// =============================================================================
// RE-EXPORTS: Store and Domain Operations
// =============================================================================

pub use analytics::{
    Analytics, PortfolioRollup, PortfolioSummary, ProjectBurn, ProjectPerformance,
    StageBreakdown, StageBurn,
};
pub use directory::{ContactProject, Directory};
pub use registry::{
    ContactFilter, ContactPatch, NewContact, NewOrganisation, NewProject, OrganisationFilter,
    OrganisationPatch, ProjectFilter, ProjectPatch, Registry,
};
pub use session::{Session, StorageBackend, TableCounts};
pub use storage::RedbStore;
pub use store::{EntityStore, MemoryStore, Tables, Upsert};
pub use timesheet::{NewTimeEntry, TimeEntryFilter, Timesheet};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

#[cfg(feature = "crypto-hash")]
pub use formats::snapshot_crypto_hash;
pub use formats::{SnapshotHeader, snapshot_checksum, snapshot_from_bytes, snapshot_to_bytes};

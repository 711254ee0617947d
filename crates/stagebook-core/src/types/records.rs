//! Row types for the six Stagebook tables.
//!
//! Rows are plain data. Serialized with postcard in the redb backend, so
//! fields must never use `skip_serializing_if` or other self-describing tricks.

use super::{
    AllocationId, ContactId, ContactRole, DirectoryEntryId, EntityKind, Hours, OrganisationId,
    ProjectId, ProjectStatus, RibaStage, TimeEntryId,
};
use crate::store::Tables;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A row stored in one of the entity tables.
///
/// Every backend stores records keyed by their raw `u64` id. Ids are assigned
/// by the store and never reused.
pub trait Record: Clone + Serialize + DeserializeOwned {
    /// The table this record lives in.
    const KIND: EntityKind;

    /// Raw row id.
    fn id(&self) -> u64;

    /// Whether the row is visible to normal (non-audit) queries.
    fn is_active(&self) -> bool;

    /// This record's table inside an in-memory [`Tables`] set.
    fn rows(tables: &Tables) -> &BTreeMap<u64, Self>;

    /// Mutable access to this record's table.
    fn rows_mut(tables: &mut Tables) -> &mut BTreeMap<u64, Self>;
}

/// Records that can be soft-deleted.
///
/// Time entries are append-only and deliberately do not implement this.
pub trait SoftDelete: Record {
    /// Flip the active flag off. Never removes the row.
    fn deactivate(&mut self);
}

macro_rules! impl_record {
    ($ty:ty, $kind:ident, $field:ident) => {
        impl Record for $ty {
            const KIND: EntityKind = EntityKind::$kind;

            fn id(&self) -> u64 {
                self.id.0
            }

            fn is_active(&self) -> bool {
                self.is_active
            }

            fn rows(tables: &Tables) -> &BTreeMap<u64, Self> {
                &tables.$field
            }

            fn rows_mut(tables: &mut Tables) -> &mut BTreeMap<u64, Self> {
                &mut tables.$field
            }
        }

        impl SoftDelete for $ty {
            fn deactivate(&mut self) {
                self.is_active = false;
            }
        }
    };
}

// =============================================================================
// ORGANISATION
// =============================================================================

/// A company or firm. Owns zero or more contacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organisation {
    pub id: OrganisationId,
    pub name: String,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub country: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub is_active: bool,
}

impl_record!(Organisation, Organisation, organisations);

// =============================================================================
// CONTACT
// =============================================================================

/// An individual person, optionally linked to an organisation.
///
/// Contacts are global: their project roles live in the directory, so a
/// change to a contact is seen by every project they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    /// Weak reference: the organisation may later be deactivated.
    pub organisation: Option<OrganisationId>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub is_active: bool,
}

impl Contact {
    /// "First Last".
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl_record!(Contact, Contact, contacts);

// =============================================================================
// PROJECT
// =============================================================================

/// A construction or engineering project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    /// Business identifier, unique across all projects ever created.
    pub job_number: String,
    pub name: String,
    pub description: Option<String>,
    pub client: Option<OrganisationId>,
    pub current_stage: RibaStage,
    pub status: ProjectStatus,
    pub start_date: Option<NaiveDate>,
    pub target_completion: Option<NaiveDate>,
    pub is_active: bool,
}

impl_record!(Project, Project, projects);

// =============================================================================
// STAGE ALLOCATION
// =============================================================================

/// Hours budgeted for one RIBA stage of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageAllocation {
    pub id: AllocationId,
    pub project: ProjectId,
    pub stage: RibaStage,
    pub allocated: Hours,
    pub is_active: bool,
}

impl_record!(StageAllocation, StageAllocation, allocations);

// =============================================================================
// TIME ENTRY
// =============================================================================

/// Hours logged against a project at the stage current when they were worked.
///
/// Append-only: there is no update or deactivate path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: TimeEntryId,
    pub project: ProjectId,
    pub stage: RibaStage,
    pub hours: Hours,
    pub logged_on: NaiveDate,
    pub description: Option<String>,
    pub logged_by: Option<String>,
}

impl Record for TimeEntry {
    const KIND: EntityKind = EntityKind::TimeEntry;

    fn id(&self) -> u64 {
        self.id.0
    }

    fn is_active(&self) -> bool {
        true
    }

    fn rows(tables: &Tables) -> &BTreeMap<u64, Self> {
        &tables.time_entries
    }

    fn rows_mut(tables: &mut Tables) -> &mut BTreeMap<u64, Self> {
        &mut tables.time_entries
    }
}

// =============================================================================
// PROJECT DIRECTORY
// =============================================================================

/// Junction row: a contact holds a role on a project.
///
/// At most one active row exists per (project, contact, role).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub id: DirectoryEntryId,
    pub project: ProjectId,
    pub contact: ContactId,
    pub role: ContactRole,
    pub notes: Option<String>,
    pub is_active: bool,
}

impl DirectoryEntry {
    /// Whether this row is the active holder of the given triple.
    #[must_use]
    pub fn holds(&self, project: ProjectId, contact: ContactId, role: ContactRole) -> bool {
        self.is_active && self.project == project && self.contact == contact && self.role == role
    }
}

impl_record!(DirectoryEntry, DirectoryEntry, directory);

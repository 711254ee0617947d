//! # Directory Module
//!
//! Resolves the many-to-many relationship between contacts and projects.
//!
//! A directory row says "this contact holds this role on this project".
//! Adding the same (project, contact, role) triple any number of times leaves
//! exactly one active row.

use crate::primitives::MAX_TEXT_LENGTH;
use crate::registry::Registry;
use crate::store::{EntityStore, Upsert};
use crate::validate::optional;
use crate::{
    ContactId, ContactRole, DirectoryEntry, DirectoryEntryId, EntityKind, Project, ProjectId,
    RibaStage, StagebookError, Visibility,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One project a contact appears on, with enough project detail to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactProject {
    pub entry: DirectoryEntryId,
    pub project: ProjectId,
    pub job_number: String,
    pub project_name: String,
    pub current_stage: RibaStage,
    pub role: ContactRole,
}

/// Project directory operations.
pub struct Directory;

impl Directory {
    /// Return the active row for (project, contact, role), creating it if
    /// absent.
    ///
    /// Both the project and the contact must be active. An existing row is
    /// returned unchanged; `notes` only apply to a newly created row.
    pub fn add_or_get_directory_entry<S: EntityStore>(
        store: &mut S,
        project: ProjectId,
        contact: ContactId,
        role: ContactRole,
        notes: Option<&str>,
    ) -> Result<Upsert<DirectoryEntry>, StagebookError> {
        let notes = optional("notes", notes, MAX_TEXT_LENGTH)?;
        Registry::project(store, project)?;
        Registry::contact(store, contact)?;

        store.insert_unique(
            |row: &DirectoryEntry| row.holds(project, contact, role),
            |id| DirectoryEntry {
                id: DirectoryEntryId(id),
                project,
                contact,
                role,
                notes,
                is_active: true,
            },
        )
    }

    /// Directory rows of an active project, ordered by role then id.
    pub fn project_directory<S: EntityStore>(
        store: &S,
        project: ProjectId,
        role: Option<ContactRole>,
        visibility: Visibility,
    ) -> Result<Vec<DirectoryEntry>, StagebookError> {
        Registry::project(store, project)?;
        let mut rows = store.select::<DirectoryEntry>(visibility, |row| {
            row.project == project && role.is_none_or(|r| row.role == r)
        })?;
        rows.sort_by_key(|row| (row.role, row.id));
        Ok(rows)
    }

    /// Every active project an active contact holds a role on.
    ///
    /// Rows pointing at inactive projects are left out. Ordered by job
    /// number, then role.
    pub fn contact_projects<S: EntityStore>(
        store: &S,
        contact: ContactId,
    ) -> Result<Vec<ContactProject>, StagebookError> {
        Registry::contact(store, contact)?;

        let rows =
            store.select::<DirectoryEntry>(Visibility::ActiveOnly, |row| row.contact == contact)?;
        let projects: BTreeMap<ProjectId, Project> = store
            .select::<Project>(Visibility::ActiveOnly, |p| {
                rows.iter().any(|row| row.project == p.id)
            })?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut joined: Vec<ContactProject> = rows
            .into_iter()
            .filter_map(|row| {
                projects.get(&row.project).map(|p| ContactProject {
                    entry: row.id,
                    project: p.id,
                    job_number: p.job_number.clone(),
                    project_name: p.name.clone(),
                    current_stage: p.current_stage,
                    role: row.role,
                })
            })
            .collect();
        joined.sort_by(|a, b| a.job_number.cmp(&b.job_number).then(a.role.cmp(&b.role)));
        Ok(joined)
    }

    /// Soft-delete a directory row belonging to `project`.
    ///
    /// The contact is untouched. Fails with `NotFound` if the row is absent,
    /// already inactive or belongs to a different project.
    pub fn remove_directory_entry<S: EntityStore>(
        store: &mut S,
        project: ProjectId,
        entry: DirectoryEntryId,
    ) -> Result<DirectoryEntry, StagebookError> {
        store.update::<DirectoryEntry>(entry.0, |row| {
            if !row.is_active || row.project != project {
                return Err(StagebookError::not_found(EntityKind::DirectoryEntry, entry.0));
            }
            row.is_active = false;
            Ok(())
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! # Timesheet Module
//!
//! Stage budgets and logged hours.
//!
//! - One active allocation per (project, stage); creating it again returns
//!   the existing row
//! - Time entries are append-only
//! - Both require an active project

use crate::primitives::{HOURS_SCALE, MAX_ALLOCATED_HOURS, MAX_HOURS_PER_ENTRY, MAX_TEXT_LENGTH};
use crate::registry::Registry;
use crate::store::{EntityStore, Upsert};
use crate::validate::optional;
use crate::{
    AllocationId, EntityKind, Hours, ProjectId, RibaStage, StageAllocation, StagebookError,
    TimeEntry, TimeEntryId, Visibility,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Maximum length of the "logged by" field.
const MAX_LOGGED_BY_LENGTH: usize = 100;

/// Input for logging time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTimeEntry {
    pub project: ProjectId,
    pub stage: RibaStage,
    pub hours: Hours,
    pub logged_on: NaiveDate,
    pub description: Option<String>,
    pub logged_by: Option<String>,
}

/// Time entry list query.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeEntryFilter {
    pub project: Option<ProjectId>,
    pub stage: Option<RibaStage>,
}

/// Stage allocations and time entries.
pub struct Timesheet;

impl Timesheet {
    /// Budget hours for a project stage.
    ///
    /// Returns the existing active allocation unchanged if one exists for the
    /// (project, stage) pair; use [`Timesheet::update_allocation`] to change it.
    pub fn allocate<S: EntityStore>(
        store: &mut S,
        project: ProjectId,
        stage: RibaStage,
        allocated: Hours,
    ) -> Result<Upsert<StageAllocation>, StagebookError> {
        check_allocation(allocated)?;
        Registry::project(store, project)?;

        store.insert_unique(
            |a: &StageAllocation| a.is_active && a.project == project && a.stage == stage,
            |id| StageAllocation {
                id: AllocationId(id),
                project,
                stage,
                allocated,
                is_active: true,
            },
        )
    }

    /// Change the budget of an active allocation.
    pub fn update_allocation<S: EntityStore>(
        store: &mut S,
        id: AllocationId,
        allocated: Hours,
    ) -> Result<StageAllocation, StagebookError> {
        check_allocation(allocated)?;
        store.update::<StageAllocation>(id.0, |row| {
            if !row.is_active {
                return Err(StagebookError::not_found(EntityKind::StageAllocation, id.0));
            }
            row.allocated = allocated;
            Ok(())
        })
    }

    /// Soft-delete an allocation. A new one may then be created for the stage.
    pub fn deactivate_allocation<S: EntityStore>(
        store: &mut S,
        id: AllocationId,
    ) -> Result<StageAllocation, StagebookError> {
        store.deactivate(id.0)
    }

    /// Allocations of an active project, ordered by stage.
    pub fn allocations<S: EntityStore>(
        store: &S,
        project: ProjectId,
        visibility: Visibility,
    ) -> Result<Vec<StageAllocation>, StagebookError> {
        Registry::project(store, project)?;
        let mut rows = store.select::<StageAllocation>(visibility, |a| a.project == project)?;
        rows.sort_by_key(|a| (a.stage, a.id));
        Ok(rows)
    }

    /// The active allocation for one stage, if any.
    pub fn allocation_for<S: EntityStore>(
        store: &S,
        project: ProjectId,
        stage: RibaStage,
    ) -> Result<Option<StageAllocation>, StagebookError> {
        Ok(store
            .select::<StageAllocation>(Visibility::ActiveOnly, |a| {
                a.project == project && a.stage == stage
            })?
            .into_iter()
            .next())
    }

    /// Append a time entry.
    ///
    /// Hours must be greater than zero and at most one day's worth.
    pub fn log_time<S: EntityStore>(
        store: &mut S,
        entry: NewTimeEntry,
    ) -> Result<TimeEntry, StagebookError> {
        if entry.hours.is_zero() {
            return Err(StagebookError::Validation(
                "hours must be greater than zero".to_string(),
            ));
        }
        if entry.hours.hundredths() > MAX_HOURS_PER_ENTRY * HOURS_SCALE {
            return Err(StagebookError::Validation(format!(
                "a single entry may record at most {MAX_HOURS_PER_ENTRY} hours (got {})",
                entry.hours
            )));
        }
        let description = optional("description", entry.description.as_deref(), MAX_TEXT_LENGTH)?;
        let logged_by = optional("logged by", entry.logged_by.as_deref(), MAX_LOGGED_BY_LENGTH)?;
        Registry::project(store, entry.project)?;

        store.insert(|id| TimeEntry {
            id: TimeEntryId(id),
            project: entry.project,
            stage: entry.stage,
            hours: entry.hours,
            logged_on: entry.logged_on,
            description,
            logged_by,
        })
    }

    /// Time entries, newest date first (ties broken newest id first).
    pub fn time_entries<S: EntityStore>(
        store: &S,
        filter: TimeEntryFilter,
    ) -> Result<Vec<TimeEntry>, StagebookError> {
        let mut rows = store.select::<TimeEntry>(Visibility::IncludeInactive, |e| {
            filter.project.is_none_or(|p| e.project == p)
                && filter.stage.is_none_or(|s| e.stage == s)
        })?;
        rows.sort_by(|a, b| b.logged_on.cmp(&a.logged_on).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    /// Total hours logged against one project stage.
    pub fn hours_logged<S: EntityStore>(
        store: &S,
        project: ProjectId,
        stage: RibaStage,
    ) -> Result<Hours, StagebookError> {
        Ok(store
            .select::<TimeEntry>(Visibility::IncludeInactive, |e| {
                e.project == project && e.stage == stage
            })?
            .into_iter()
            .map(|e| e.hours)
            .sum())
    }
}

fn check_allocation(allocated: Hours) -> Result<(), StagebookError> {
    if allocated.hundredths() > MAX_ALLOCATED_HOURS * HOURS_SCALE {
        return Err(StagebookError::Validation(format!(
            "allocated hours must be at most {MAX_ALLOCATED_HOURS} (got {allocated})"
        )));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

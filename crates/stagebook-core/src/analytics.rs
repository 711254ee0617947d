//! # Analytics Module
//!
//! Burn-rate and risk reporting over time entries and stage allocations.
//!
//! - Hours are summed as exact fixed-point values
//! - Risk classification is decided on those exact values (see
//!   [`RiskStatus::classify`]); the floating-point burn percentage is for
//!   display only
//! - Every operation is a pure read

use crate::registry::Registry;
use crate::store::EntityStore;
use crate::timesheet::Timesheet;
use crate::{
    Hours, Project, ProjectId, ProjectStatus, RibaStage, RiskStatus, StageAllocation,
    StagebookError, TimeEntry, Visibility,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// `used / allocated * 100` as a float. `allocated` must be non-zero.
#[allow(clippy::float_arithmetic)]
fn burn_percentage(used: Hours, allocated: Hours) -> f64 {
    let scaled = u128::from(used.hundredths()) * 100;
    scaled as f64 / allocated.hundredths() as f64
}

/// Burn percentage, or `None` when nothing is allocated.
fn utilisation(used: Hours, allocated: Hours) -> Option<f64> {
    (!allocated.is_zero()).then(|| burn_percentage(used, allocated))
}

// =============================================================================
// RESULT TYPES
// =============================================================================

/// Burn for one project stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageBurn {
    pub project: ProjectId,
    pub stage: RibaStage,
    pub allocated: Hours,
    pub used: Hours,
    /// Allocated minus used, in decimal hours. Negative once overrun.
    pub remaining: f64,
    pub burn_percentage: f64,
    pub status: RiskStatus,
}

/// One stage row of a project performance report.
///
/// `burn_percentage` and `status` are absent when the stage has no
/// allocated hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageBreakdown {
    pub stage: RibaStage,
    pub allocated: Hours,
    pub used: Hours,
    pub remaining: f64,
    pub burn_percentage: Option<f64>,
    pub status: Option<RiskStatus>,
}

/// Full per-stage performance report for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPerformance {
    pub project: ProjectId,
    pub job_number: String,
    pub name: String,
    pub current_stage: RibaStage,
    /// Allocated stages, in plan-of-work order.
    pub stages: Vec<StageBreakdown>,
    /// Stages with logged time but no active allocation.
    pub unallocated: Vec<(RibaStage, Hours)>,
    pub total_allocated: Hours,
    pub total_used: Hours,
    pub total_remaining: f64,
    pub burn_percentage: Option<f64>,
    pub status: Option<RiskStatus>,
    pub stages_at_risk: usize,
    pub stages_overrun: usize,
}

/// Aggregate burn across every stage of one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectBurn {
    pub project: ProjectId,
    pub job_number: String,
    pub name: String,
    pub allocated: Hours,
    pub used: Hours,
    pub remaining: f64,
    pub burn_percentage: f64,
    pub status: RiskStatus,
}

/// Portfolio burn, one row per requested active project in request order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub projects: Vec<ProjectBurn>,
}

/// Counts and totals over a portfolio.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRollup {
    pub project_count: usize,
    pub on_track: usize,
    pub at_risk: usize,
    pub overrun: usize,
    pub at_risk_projects: Vec<String>,
    pub overrun_projects: Vec<String>,
    pub total_allocated: Hours,
    pub total_used: Hours,
    /// Total used over total allocated, as a percentage.
    pub overall_utilisation: Option<f64>,
}

impl PortfolioSummary {
    /// True when no project was summarised.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Count projects per status and total the hours.
    #[must_use]
    pub fn rollup(&self) -> PortfolioRollup {
        let mut rollup = PortfolioRollup {
            project_count: self.projects.len(),
            ..PortfolioRollup::default()
        };
        for project in &self.projects {
            rollup.total_allocated = rollup.total_allocated.saturating_add(project.allocated);
            rollup.total_used = rollup.total_used.saturating_add(project.used);
            match project.status {
                RiskStatus::OnTrack => rollup.on_track += 1,
                RiskStatus::AtRisk => {
                    rollup.at_risk += 1;
                    rollup.at_risk_projects.push(project.name.clone());
                }
                RiskStatus::Overrun => {
                    rollup.overrun += 1;
                    rollup.overrun_projects.push(project.name.clone());
                }
            }
        }
        rollup.overall_utilisation = utilisation(rollup.total_used, rollup.total_allocated);
        rollup
    }
}

// =============================================================================
// LEDGER
// =============================================================================

/// Hours allocated and used per stage for one project.
#[derive(Debug, Default)]
struct Ledger {
    allocated: BTreeMap<RibaStage, Hours>,
    used: BTreeMap<RibaStage, Hours>,
}

impl Ledger {
    fn add_allocation(&mut self, allocation: &StageAllocation) {
        let slot = self.allocated.entry(allocation.stage).or_default();
        *slot = slot.saturating_add(allocation.allocated);
    }

    fn add_entry(&mut self, entry: &TimeEntry) {
        let slot = self.used.entry(entry.stage).or_default();
        *slot = slot.saturating_add(entry.hours);
    }

    fn used_at(&self, stage: RibaStage) -> Hours {
        self.used.get(&stage).copied().unwrap_or_default()
    }

    /// First stage with logged time but no allocation.
    fn first_unallocated(&self) -> Option<RibaStage> {
        self.used
            .keys()
            .find(|stage| !self.allocated.contains_key(stage))
            .copied()
    }

    fn total_allocated(&self) -> Hours {
        self.allocated.values().copied().sum()
    }

    fn total_used(&self) -> Hours {
        self.used.values().copied().sum()
    }
}

/// Build ledgers for a set of projects in one pass over each table.
fn ledgers<S: EntityStore>(
    store: &S,
    projects: &BTreeSet<ProjectId>,
) -> Result<BTreeMap<ProjectId, Ledger>, StagebookError> {
    let mut ledgers: BTreeMap<ProjectId, Ledger> =
        projects.iter().map(|id| (*id, Ledger::default())).collect();

    for allocation in
        store.select::<StageAllocation>(Visibility::ActiveOnly, |a| projects.contains(&a.project))?
    {
        if let Some(ledger) = ledgers.get_mut(&allocation.project) {
            ledger.add_allocation(&allocation);
        }
    }
    for entry in
        store.select::<TimeEntry>(Visibility::IncludeInactive, |e| projects.contains(&e.project))?
    {
        if let Some(ledger) = ledgers.get_mut(&entry.project) {
            ledger.add_entry(&entry);
        }
    }
    Ok(ledgers)
}

// =============================================================================
// ANALYTICS
// =============================================================================

/// Read-only burn and risk computations.
pub struct Analytics;

impl Analytics {
    /// Burn for one stage of an active project.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the project is missing or inactive
    /// - `MissingAllocation` if the stage has no active allocation, whether
    ///   or not time has been logged against it
    /// - `DivisionUndefined` if the allocation is zero hours
    pub fn compute_stage_burn<S: EntityStore>(
        store: &S,
        project: ProjectId,
        stage: RibaStage,
    ) -> Result<StageBurn, StagebookError> {
        Registry::project(store, project)?;

        let allocation = Timesheet::allocation_for(store, project, stage)?
            .ok_or(StagebookError::MissingAllocation { project, stage })?;
        let allocated = allocation.allocated;
        let used = Timesheet::hours_logged(store, project, stage)?;

        let status = RiskStatus::classify(used, allocated).ok_or(
            StagebookError::DivisionUndefined {
                project,
                stage: Some(stage),
            },
        )?;

        Ok(StageBurn {
            project,
            stage,
            allocated,
            used,
            remaining: allocated.signed_difference(used),
            burn_percentage: burn_percentage(used, allocated),
            status,
        })
    }

    /// Per-stage breakdown and totals for an active project.
    ///
    /// Unlike the stage and portfolio calculations this never fails on
    /// missing or zero allocations; those show up in the report instead.
    pub fn compute_project_performance<S: EntityStore>(
        store: &S,
        project: ProjectId,
    ) -> Result<ProjectPerformance, StagebookError> {
        let row = Registry::project(store, project)?;
        let mut all = ledgers(store, &BTreeSet::from([project]))?;
        let ledger = all.remove(&project).unwrap_or_default();

        let stages: Vec<StageBreakdown> = ledger
            .allocated
            .iter()
            .map(|(&stage, &allocated)| {
                let used = ledger.used_at(stage);
                let status = RiskStatus::classify(used, allocated);
                StageBreakdown {
                    stage,
                    allocated,
                    used,
                    remaining: allocated.signed_difference(used),
                    burn_percentage: status.map(|_| burn_percentage(used, allocated)),
                    status,
                }
            })
            .collect();

        let unallocated = ledger
            .used
            .iter()
            .filter(|(stage, _)| !ledger.allocated.contains_key(stage))
            .map(|(&stage, &hours)| (stage, hours))
            .collect();

        let total_allocated = ledger.total_allocated();
        let total_used = ledger.total_used();
        let status = RiskStatus::classify(total_used, total_allocated);

        Ok(ProjectPerformance {
            project,
            job_number: row.job_number,
            name: row.name,
            current_stage: row.current_stage,
            stages_at_risk: stages
                .iter()
                .filter(|s| s.status == Some(RiskStatus::AtRisk))
                .count(),
            stages_overrun: stages
                .iter()
                .filter(|s| s.status == Some(RiskStatus::Overrun))
                .count(),
            stages,
            unallocated,
            total_allocated,
            total_used,
            total_remaining: total_allocated.signed_difference(total_used),
            burn_percentage: status.map(|_| burn_percentage(total_used, total_allocated)),
            status,
        })
    }

    /// Aggregate burn for each requested project.
    ///
    /// Missing and inactive ids are skipped; output follows input order.
    ///
    /// # Errors
    ///
    /// - `MissingAllocation` for a stage with logged time but no allocation
    /// - `DivisionUndefined` (no stage) when a project's total allocation is
    ///   zero
    pub fn compute_portfolio_summary<S: EntityStore>(
        store: &S,
        projects: &[ProjectId],
    ) -> Result<PortfolioSummary, StagebookError> {
        if projects.is_empty() {
            return Ok(PortfolioSummary::default());
        }

        let wanted: BTreeSet<ProjectId> = projects.iter().copied().collect();
        let rows: BTreeMap<ProjectId, Project> = store
            .select::<Project>(Visibility::ActiveOnly, |p| wanted.contains(&p.id))?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let active: BTreeSet<ProjectId> = rows.keys().copied().collect();
        let ledgers = ledgers(store, &active)?;

        let mut summary = PortfolioSummary::default();
        let mut seen = BTreeSet::new();
        for id in projects {
            let (Some(project), Some(ledger)) = (rows.get(id), ledgers.get(id)) else {
                continue;
            };
            if !seen.insert(*id) {
                continue;
            }
            summary.projects.push(project_burn(project, ledger)?);
        }
        Ok(summary)
    }

    /// Portfolio over every project whose status is Active, in id order.
    ///
    /// Projects with no allocated hours yet are left out rather than
    /// failing the whole report. Other errors still surface.
    pub fn compute_active_portfolio<S: EntityStore>(
        store: &S,
    ) -> Result<PortfolioSummary, StagebookError> {
        let rows = store.select::<Project>(Visibility::ActiveOnly, |p| {
            p.status == ProjectStatus::Active
        })?;
        let ids: BTreeSet<ProjectId> = rows.iter().map(|p| p.id).collect();
        let ledgers = ledgers(store, &ids)?;

        let mut summary = PortfolioSummary::default();
        for project in &rows {
            let Some(ledger) = ledgers.get(&project.id) else {
                continue;
            };
            if ledger.total_allocated().is_zero() {
                continue;
            }
            summary.projects.push(project_burn(project, ledger)?);
        }
        summary.projects.sort_by_key(|p| p.project);
        Ok(summary)
    }
}

fn project_burn(project: &Project, ledger: &Ledger) -> Result<ProjectBurn, StagebookError> {
    if let Some(stage) = ledger.first_unallocated() {
        return Err(StagebookError::MissingAllocation {
            project: project.id,
            stage,
        });
    }

    let allocated = ledger.total_allocated();
    let used = ledger.total_used();
    let status = RiskStatus::classify(used, allocated).ok_or(StagebookError::DivisionUndefined {
        project: project.id,
        stage: None,
    })?;

    Ok(ProjectBurn {
        project: project.id,
        job_number: project.job_number.clone(),
        name: project.name.clone(),
        allocated,
        used,
        remaining: allocated.signed_difference(used),
        burn_percentage: burn_percentage(used, allocated),
        status,
    })
}

// =============================================================================
// TESTS
// =============================================================================

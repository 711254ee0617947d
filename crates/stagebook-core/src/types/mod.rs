//! # Core Type Definitions
//!
//! This module contains the vocabulary shared by every Stagebook component:
//! - Typed row identifiers (`ProjectId`, `ContactId`, ...)
//! - Fixed-point hours (`Hours`)
//! - Domain enums (`RibaStage`, `ProjectStatus`, `ContactRole`, `RiskStatus`)
//! - Row visibility for audit queries (`Visibility`)
//! - Error types (`StagebookError`)
//!
//! ## Determinism Guarantees
//!
//! - Hours are summed as integer hundredths, never as floats
//! - All identifiers implement `Ord` for deterministic `BTreeMap` ordering
//! - Classification is decided on exact integer ratios

mod records;

pub use records::{
    Contact, DirectoryEntry, Organisation, Project, Record, SoftDelete, StageAllocation, TimeEntry,
};

use crate::primitives::{HOURS_SCALE, OVERRUN_THRESHOLD_PERCENT, RISK_THRESHOLD_PERCENT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// ROW IDENTIFIERS
// =============================================================================

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(
    /// Identifier of an organisation row.
    OrganisationId
);
row_id!(
    /// Identifier of a contact row.
    ContactId
);
row_id!(
    /// Identifier of a project row.
    ProjectId
);
row_id!(
    /// Identifier of a stage allocation row.
    AllocationId
);
row_id!(
    /// Identifier of a time entry row.
    TimeEntryId
);
row_id!(
    /// Identifier of a project directory (junction) row.
    DirectoryEntryId
);

/// The table a row belongs to. Used for storage layout and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Organisation,
    Contact,
    Project,
    StageAllocation,
    TimeEntry,
    DirectoryEntry,
}

impl EntityKind {
    /// Name of the backing table.
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Organisation => "organisations",
            Self::Contact => "contacts",
            Self::Project => "projects",
            Self::StageAllocation => "stage_allocations",
            Self::TimeEntry => "time_entries",
            Self::DirectoryEntry => "project_directory",
        }
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Organisation => "Organisation",
            Self::Contact => "Contact",
            Self::Project => "Project",
            Self::StageAllocation => "Stage allocation",
            Self::TimeEntry => "Time entry",
            Self::DirectoryEntry => "Directory entry",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// HOURS (FIXED POINT)
// =============================================================================

/// A non-negative quantity of hours stored as integer hundredths.
///
/// `Hours::from_hundredths(750)` is seven and a half hours. Sums are exact,
/// so adding the same entries in any order gives the same total.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Hours(u64);

impl Hours {
    /// Zero hours.
    pub const ZERO: Self = Self(0);

    /// Build from raw hundredths of an hour.
    #[must_use]
    pub const fn from_hundredths(hundredths: u64) -> Self {
        Self(hundredths)
    }

    /// Build from a whole number of hours.
    #[must_use]
    pub const fn whole(hours: u64) -> Self {
        Self(hours.saturating_mul(HOURS_SCALE))
    }

    /// Parse a decimal hour value, rounding to the nearest hundredth.
    ///
    /// Rejects NaN, infinities and negative values.
    #[allow(clippy::float_arithmetic)]
    pub fn from_decimal(hours: f64) -> Result<Self, StagebookError> {
        if !hours.is_finite() || hours < 0.0 {
            return Err(StagebookError::Validation(format!(
                "hours must be a finite, non-negative number (got {hours})"
            )));
        }
        let scaled = (hours * HOURS_SCALE as f64).round();
        if scaled > u64::MAX as f64 {
            return Err(StagebookError::Validation(format!(
                "hours value {hours} is too large"
            )));
        }
        Ok(Self(scaled as u64))
    }

    /// Raw hundredths of an hour.
    #[must_use]
    pub const fn hundredths(self) -> u64 {
        self.0
    }

    /// Decimal representation for display and JSON output.
    #[allow(clippy::float_arithmetic)]
    #[must_use]
    pub fn as_decimal(self) -> f64 {
        self.0 as f64 / HOURS_SCALE as f64
    }

    /// `self - other` in decimal hours; negative when `other` exceeds `self`.
    #[allow(clippy::float_arithmetic)]
    #[must_use]
    pub fn signed_difference(self, other: Self) -> f64 {
        (i128::from(self.0) - i128::from(other.0)) as f64 / HOURS_SCALE as f64
    }

    /// Add two quantities, saturating at the maximum.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// True when this is exactly zero hours.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl std::iter::Sum for Hours {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / HOURS_SCALE, self.0 % HOURS_SCALE)
    }
}

// =============================================================================
// RIBA STAGE
// =============================================================================

/// RIBA Plan of Work stage (0-7).
///
/// Serialized as its stage number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RibaStage {
    StrategicDefinition,
    PreparationAndBriefing,
    ConceptDesign,
    SpatialCoordination,
    TechnicalDesign,
    ManufacturingAndConstruction,
    Handover,
    Use,
}

impl RibaStage {
    /// Every stage in plan-of-work order.
    pub const ALL: [Self; 8] = [
        Self::StrategicDefinition,
        Self::PreparationAndBriefing,
        Self::ConceptDesign,
        Self::SpatialCoordination,
        Self::TechnicalDesign,
        Self::ManufacturingAndConstruction,
        Self::Handover,
        Self::Use,
    ];

    /// Stage number (0-7).
    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }

    /// Stage name as used in the plan of work.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::StrategicDefinition => "Strategic Definition",
            Self::PreparationAndBriefing => "Preparation & Briefing",
            Self::ConceptDesign => "Concept Design",
            Self::SpatialCoordination => "Spatial Coordination",
            Self::TechnicalDesign => "Technical Design",
            Self::ManufacturingAndConstruction => "Manufacturing & Construction",
            Self::Handover => "Handover",
            Self::Use => "Use",
        }
    }
}

impl TryFrom<u8> for RibaStage {
    type Error = StagebookError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(value))
            .copied()
            .ok_or_else(|| StagebookError::Validation(format!("RIBA stage must be 0-7 (got {value})")))
    }
}

impl From<RibaStage> for u8 {
    fn from(stage: RibaStage) -> Self {
        stage.number()
    }
}

impl FromStr for RibaStage {
    type Err = StagebookError;

    /// Accepts `"3"`, `"S3"` or `"stage 3"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_ascii_lowercase();
        let digits = trimmed
            .strip_prefix("stage")
            .or_else(|| trimmed.strip_prefix('s'))
            .unwrap_or(&trimmed)
            .trim();
        let number: u8 = digits
            .parse()
            .map_err(|_| StagebookError::Validation(format!("invalid RIBA stage '{s}'")))?;
        Self::try_from(number)
    }
}

impl fmt::Display for RibaStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.number(), self.name())
    }
}

// =============================================================================
// PROJECT STATUS
// =============================================================================

/// Commercial status of a project, independent of its soft-delete flag.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum ProjectStatus {
    #[default]
    Active,
    #[serde(rename = "On Hold")]
    OnHold,
    Completed,
    Archived,
}

impl ProjectStatus {
    /// Every status value.
    pub const ALL: [Self; 4] = [Self::Active, Self::OnHold, Self::Completed, Self::Archived];

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::OnHold => "On Hold",
            Self::Completed => "Completed",
            Self::Archived => "Archived",
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = StagebookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| {
                status.label().eq_ignore_ascii_case(wanted)
                    || status.label().replace(' ', "_").eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| {
                StagebookError::Validation(format!(
                    "invalid project status '{s}' (expected one of: Active, On Hold, Completed, Archived)"
                ))
            })
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// CONTACT ROLE
// =============================================================================

/// The role a contact holds within one project's directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContactRole {
    Client,
    Architect,
    Engineer,
    #[serde(rename = "Quantity Surveyor")]
    QuantitySurveyor,
    #[serde(rename = "Project Manager")]
    ProjectManager,
    Contractor,
    Consultant,
    #[serde(rename = "Sub-Contractor")]
    SubContractor,
    Supplier,
    Other,
}

impl ContactRole {
    /// Every role in the fixed set.
    pub const ALL: [Self; 10] = [
        Self::Client,
        Self::Architect,
        Self::Engineer,
        Self::QuantitySurveyor,
        Self::ProjectManager,
        Self::Contractor,
        Self::Consultant,
        Self::SubContractor,
        Self::Supplier,
        Self::Other,
    ];

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Client => "Client",
            Self::Architect => "Architect",
            Self::Engineer => "Engineer",
            Self::QuantitySurveyor => "Quantity Surveyor",
            Self::ProjectManager => "Project Manager",
            Self::Contractor => "Contractor",
            Self::Consultant => "Consultant",
            Self::SubContractor => "Sub-Contractor",
            Self::Supplier => "Supplier",
            Self::Other => "Other",
        }
    }
}

impl FromStr for ContactRole {
    type Err = StagebookError;

    /// Case-insensitive; spaces, hyphens and underscores are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        fn fold(text: &str) -> String {
            text.chars()
                .filter(|c| !matches!(c, ' ' | '-' | '_'))
                .map(|c| c.to_ascii_lowercase())
                .collect()
        }

        let wanted = fold(s);
        if wanted.is_empty() {
            return Err(StagebookError::Validation("role must not be empty".to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|role| fold(role.label()) == wanted)
            .ok_or_else(|| StagebookError::Validation(format!("unknown directory role '{s}'")))
    }
}

impl fmt::Display for ContactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// RISK STATUS
// =============================================================================

/// Three-way burn classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskStatus {
    #[serde(rename = "On Track")]
    OnTrack,
    #[serde(rename = "At Risk")]
    AtRisk,
    Overrun,
}

impl RiskStatus {
    /// Classify `used` against a non-zero `allocated` budget.
    ///
    /// Compares `used * 100` with `allocated * threshold` in integers, so a
    /// burn of exactly 80% is always "At Risk" and exactly 100% is never
    /// "Overrun". Returns `None` when `allocated` is zero.
    #[must_use]
    pub fn classify(used: Hours, allocated: Hours) -> Option<Self> {
        if allocated.is_zero() {
            return None;
        }
        let used_scaled = u128::from(used.hundredths()) * 100;
        let allocated = u128::from(allocated.hundredths());

        let status = if used_scaled > allocated * u128::from(OVERRUN_THRESHOLD_PERCENT) {
            Self::Overrun
        } else if used_scaled >= allocated * u128::from(RISK_THRESHOLD_PERCENT) {
            Self::AtRisk
        } else {
            Self::OnTrack
        };
        Some(status)
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OnTrack => "On Track",
            Self::AtRisk => "At Risk",
            Self::Overrun => "Overrun",
        }
    }
}

impl fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// VISIBILITY
// =============================================================================

/// Whether list queries include soft-deleted rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Visibility {
    /// Normal views: inactive rows are hidden.
    #[default]
    ActiveOnly,
    /// Audit views: every row ever written.
    IncludeInactive,
}

impl Visibility {
    /// Build from an `include_inactive` flag.
    #[must_use]
    pub const fn from_flag(include_inactive: bool) -> Self {
        if include_inactive {
            Self::IncludeInactive
        } else {
            Self::ActiveOnly
        }
    }

    /// Whether a row with the given active flag is visible.
    #[must_use]
    pub const fn admits(self, is_active: bool) -> bool {
        match self {
            Self::ActiveOnly => is_active,
            Self::IncludeInactive => true,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in Stagebook.
///
/// - No silent failures
/// - Every failure is scoped to the single operation that raised it
/// - The core never panics
#[derive(Debug, Error)]
pub enum StagebookError {
    /// Malformed or missing required input.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A referenced row is absent or has been deactivated.
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: u64 },

    /// A uniqueness rule would be violated.
    #[error("Duplicate {kind}: {detail}")]
    Duplicate { kind: EntityKind, detail: String },

    /// Analytics requested for a stage with no allocation.
    #[error("Project {project} has no hours allocated to stage {stage}")]
    MissingAllocation { project: ProjectId, stage: RibaStage },

    /// Burn rate requested against a zero-hour budget.
    #[error("Burn rate undefined for project {project}: {} has zero allocated hours", scope_label(.stage))]
    DivisionUndefined {
        project: ProjectId,
        /// `None` when the whole project's budget is zero.
        stage: Option<RibaStage>,
    },

    /// The storage backend failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A row or snapshot could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

fn scope_label(stage: &Option<RibaStage>) -> String {
    match stage {
        Some(stage) => format!("stage {stage}"),
        None => "the project".to_string(),
    }
}

impl StagebookError {
    /// Shorthand for a missing row of type `kind`.
    #[must_use]
    pub const fn not_found(kind: EntityKind, id: u64) -> Self {
        Self::NotFound { kind, id }
    }

    /// Stable machine-readable error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Duplicate { .. } => "duplicate",
            Self::MissingAllocation { .. } => "missing_allocation",
            Self::DivisionUndefined { .. } => "division_undefined",
            Self::Storage(_) => "storage",
            Self::Serialization(_) => "serialization",
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! # API Request/Response Types
//!
//! JSON structures for the HTTP API.
//!
//! Rows without hour fields are returned as the core records. Anything
//! carrying hours goes through a `*Json` type here so the wire format uses
//! decimal hours (`7.5`) rather than stored hundredths (`750`).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stagebook_core::{
    AllocationId, ContactFilter, ContactId, ContactRole, OrganisationFilter,
    OrganisationId, PortfolioRollup, PortfolioSummary, ProjectBurn, ProjectFilter, ProjectId,
    ProjectPerformance, ProjectStatus, RibaStage, RiskStatus, StageAllocation, StageBreakdown, StageBurn,
    StagebookError, TableCounts, TimeEntry, TimeEntryFilter, TimeEntryId, Visibility,
};

// =============================================================================
// ERROR BODY
// =============================================================================

/// `{"error": {"kind": "...", "message": "..."}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: String,
    pub message: String,
}

/// An error on its way to the client.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: ErrorDetail {
                    kind: kind.to_string(),
                    message: message.into(),
                },
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &ErrorBody {
        &self.body
    }
}

/// HTTP status for a core error.
pub fn status_for(error: &StagebookError) -> StatusCode {
    match error {
        StagebookError::Validation(_) => StatusCode::BAD_REQUEST,
        StagebookError::NotFound { .. } => StatusCode::NOT_FOUND,
        StagebookError::Duplicate { .. } => StatusCode::CONFLICT,
        StagebookError::MissingAllocation { .. } | StagebookError::DivisionUndefined { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        StagebookError::Storage(_) | StagebookError::Serialization(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<StagebookError> for ApiError {
    fn from(error: StagebookError) -> Self {
        let status = status_for(&error);
        if status.is_server_error() {
            tracing::error!(kind = error.kind(), "{}", error);
        }
        Self::new(status, error.kind(), error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// =============================================================================
// HEALTH / STATUS
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Row counts per table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub backend: String,
    #[serde(flatten)]
    pub counts: TableCounts,
}

// =============================================================================
// LIST QUERIES
// =============================================================================

/// `?include_inactive=true`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityQuery {
    pub include_inactive: bool,
}

/// `GET /organisations`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganisationQuery {
    pub include_inactive: bool,
    pub search: Option<String>,
}

impl From<OrganisationQuery> for OrganisationFilter {
    fn from(query: OrganisationQuery) -> Self {
        Self {
            search: query.search,
            visibility: Visibility::from_flag(query.include_inactive),
        }
    }
}

/// `GET /contacts`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactQuery {
    pub include_inactive: bool,
    pub organisation_id: Option<u64>,
    pub search: Option<String>,
}

impl From<ContactQuery> for ContactFilter {
    fn from(query: ContactQuery) -> Self {
        Self {
            organisation: query.organisation_id.map(OrganisationId),
            search: query.search,
            visibility: Visibility::from_flag(query.include_inactive),
        }
    }
}

/// `GET /projects`. Status and stage arrive as text and are parsed leniently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectQuery {
    pub include_inactive: bool,
    pub status: Option<String>,
    pub stage: Option<String>,
}

impl TryFrom<ProjectQuery> for ProjectFilter {
    type Error = StagebookError;

    fn try_from(query: ProjectQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            status: query.status.as_deref().map(str::parse::<ProjectStatus>).transpose()?,
            stage: query.stage.as_deref().map(str::parse::<RibaStage>).transpose()?,
            visibility: Visibility::from_flag(query.include_inactive),
        })
    }
}

/// `GET /projects/{id}/directory`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryQuery {
    pub role: Option<String>,
    pub include_inactive: bool,
}

impl DirectoryQuery {
    pub fn role(&self) -> Result<Option<ContactRole>, StagebookError> {
        self.role.as_deref().map(str::parse::<ContactRole>).transpose()
    }
}

/// `GET /time-entries`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeEntryQuery {
    pub project_id: Option<u64>,
    pub stage: Option<String>,
}

impl TryFrom<TimeEntryQuery> for TimeEntryFilter {
    type Error = StagebookError;

    fn try_from(query: TimeEntryQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            project: query.project_id.map(ProjectId),
            stage: query.stage.as_deref().map(str::parse::<RibaStage>).transpose()?,
        })
    }
}

/// `GET /analytics/portfolio?ids=3,1,2`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioQuery {
    pub ids: Option<String>,
}

impl PortfolioQuery {
    /// Requested projects in the order given; `None` means the default view.
    pub fn project_ids(&self) -> Result<Option<Vec<ProjectId>>, StagebookError> {
        let Some(ids) = self.ids.as_deref() else {
            return Ok(None);
        };
        ids.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<u64>().map(ProjectId).map_err(|_| {
                    StagebookError::Validation(format!("invalid project id '{s}'"))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

/// `POST /projects/{id}/allocations`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub stage: RibaStage,
    pub allocated_hours: f64,
}

/// `PATCH /allocations/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationUpdateRequest {
    pub allocated_hours: f64,
}

/// `POST /time-entries`
///
/// `stage` defaults to the project's current stage, `date` to today.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEntryRequest {
    pub project_id: ProjectId,
    #[serde(default)]
    pub stage: Option<RibaStage>,
    pub hours: f64,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logged_by: Option<String>,
}

/// `POST /projects/{id}/directory`
///
/// The role is free text matched against the fixed role list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryRequest {
    pub contact_id: ContactId,
    pub role: String,
    #[serde(default)]
    pub notes: Option<String>,
}

// =============================================================================
// HOUR-CARRYING ROWS
// =============================================================================

/// A stage budget with decimal hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationJson {
    pub id: AllocationId,
    pub project_id: ProjectId,
    pub stage: RibaStage,
    pub stage_name: String,
    pub allocated_hours: f64,
    pub is_active: bool,
}

impl From<StageAllocation> for AllocationJson {
    fn from(row: StageAllocation) -> Self {
        Self {
            id: row.id,
            project_id: row.project,
            stage: row.stage,
            stage_name: row.stage.name().to_string(),
            allocated_hours: row.allocated.as_decimal(),
            is_active: row.is_active,
        }
    }
}

/// A logged time entry with decimal hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntryJson {
    pub id: TimeEntryId,
    pub project_id: ProjectId,
    pub stage: RibaStage,
    pub stage_name: String,
    pub hours: f64,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub logged_by: Option<String>,
}

impl From<TimeEntry> for TimeEntryJson {
    fn from(row: TimeEntry) -> Self {
        Self {
            id: row.id,
            project_id: row.project,
            stage: row.stage,
            stage_name: row.stage.name().to_string(),
            hours: row.hours.as_decimal(),
            date: row.logged_on,
            description: row.description,
            logged_by: row.logged_by,
        }
    }
}

// =============================================================================
// ANALYTICS
// =============================================================================

/// Burn for one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageBurnJson {
    pub project_id: ProjectId,
    pub stage: RibaStage,
    pub stage_name: String,
    pub allocated_hours: f64,
    pub used_hours: f64,
    pub remaining_hours: f64,
    pub burn_percentage: f64,
    pub status: RiskStatus,
}

impl From<StageBurn> for StageBurnJson {
    fn from(burn: StageBurn) -> Self {
        Self {
            project_id: burn.project,
            stage: burn.stage,
            stage_name: burn.stage.name().to_string(),
            allocated_hours: burn.allocated.as_decimal(),
            used_hours: burn.used.as_decimal(),
            remaining_hours: burn.remaining,
            burn_percentage: burn.burn_percentage,
            status: burn.status,
        }
    }
}

/// One row of a project's stage breakdown. Burn is absent for zero budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageBreakdownJson {
    pub stage: RibaStage,
    pub stage_name: String,
    pub allocated_hours: f64,
    pub used_hours: f64,
    pub remaining_hours: f64,
    pub burn_percentage: Option<f64>,
    pub status: Option<RiskStatus>,
}

impl From<StageBreakdown> for StageBreakdownJson {
    fn from(row: StageBreakdown) -> Self {
        Self {
            stage: row.stage,
            stage_name: row.stage.name().to_string(),
            allocated_hours: row.allocated.as_decimal(),
            used_hours: row.used.as_decimal(),
            remaining_hours: row.remaining,
            burn_percentage: row.burn_percentage,
            status: row.status,
        }
    }
}

/// Hours logged against a stage that has no budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnallocatedJson {
    pub stage: RibaStage,
    pub stage_name: String,
    pub used_hours: f64,
}

/// `GET /analytics/projects/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPerformanceJson {
    pub project_id: ProjectId,
    pub job_number: String,
    pub name: String,
    pub current_stage: RibaStage,
    pub current_stage_name: String,
    pub stages: Vec<StageBreakdownJson>,
    pub unallocated: Vec<UnallocatedJson>,
    pub total_allocated_hours: f64,
    pub total_used_hours: f64,
    pub total_remaining_hours: f64,
    pub burn_percentage: Option<f64>,
    pub status: Option<RiskStatus>,
    pub stages_at_risk: usize,
    pub stages_overrun: usize,
}

impl From<ProjectPerformance> for ProjectPerformanceJson {
    fn from(p: ProjectPerformance) -> Self {
        Self {
            project_id: p.project,
            job_number: p.job_number,
            name: p.name,
            current_stage: p.current_stage,
            current_stage_name: p.current_stage.name().to_string(),
            stages: p.stages.into_iter().map(StageBreakdownJson::from).collect(),
            unallocated: p
                .unallocated
                .into_iter()
                .map(|(stage, used)| UnallocatedJson {
                    stage,
                    stage_name: stage.name().to_string(),
                    used_hours: used.as_decimal(),
                })
                .collect(),
            total_allocated_hours: p.total_allocated.as_decimal(),
            total_used_hours: p.total_used.as_decimal(),
            total_remaining_hours: p.total_remaining,
            burn_percentage: p.burn_percentage,
            status: p.status,
            stages_at_risk: p.stages_at_risk,
            stages_overrun: p.stages_overrun,
        }
    }
}

/// One project in the portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectBurnJson {
    pub project_id: ProjectId,
    pub job_number: String,
    pub name: String,
    pub allocated_hours: f64,
    pub used_hours: f64,
    pub remaining_hours: f64,
    pub burn_percentage: f64,
    pub status: RiskStatus,
}

impl From<ProjectBurn> for ProjectBurnJson {
    fn from(p: ProjectBurn) -> Self {
        Self {
            project_id: p.project,
            job_number: p.job_number,
            name: p.name,
            allocated_hours: p.allocated.as_decimal(),
            used_hours: p.used.as_decimal(),
            remaining_hours: p.remaining,
            burn_percentage: p.burn_percentage,
            status: p.status,
        }
    }
}

/// Portfolio counts and totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupJson {
    pub project_count: usize,
    pub on_track: usize,
    pub at_risk: usize,
    pub overrun: usize,
    pub at_risk_projects: Vec<String>,
    pub overrun_projects: Vec<String>,
    pub total_allocated_hours: f64,
    pub total_used_hours: f64,
    pub overall_utilisation: Option<f64>,
}

impl From<PortfolioRollup> for RollupJson {
    fn from(r: PortfolioRollup) -> Self {
        Self {
            project_count: r.project_count,
            on_track: r.on_track,
            at_risk: r.at_risk,
            overrun: r.overrun,
            at_risk_projects: r.at_risk_projects,
            overrun_projects: r.overrun_projects,
            total_allocated_hours: r.total_allocated.as_decimal(),
            total_used_hours: r.total_used.as_decimal(),
            overall_utilisation: r.overall_utilisation,
        }
    }
}

/// `GET /analytics/portfolio`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioResponse {
    pub projects: Vec<ProjectBurnJson>,
    pub rollup: RollupJson,
}

impl From<PortfolioSummary> for PortfolioResponse {
    fn from(summary: PortfolioSummary) -> Self {
        let rollup = summary.rollup().into();
        Self {
            projects: summary
                .projects
                .into_iter()
                .map(ProjectBurnJson::from)
                .collect(),
            rollup,
        }
    }
}

// =============================================================================
// EXPORT
// =============================================================================

/// `POST /export`: a base64 snapshot with its checksums.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub size_bytes: usize,
    /// Base64-encoded `STBK` snapshot.
    pub data: String,
    /// 64-bit FNV-1a of the raw snapshot bytes.
    pub checksum: u64,
    /// BLAKE3 of the raw snapshot bytes, hex.
    pub blake3: String,
}

impl ExportResponse {
    pub fn from_snapshot(bytes: &[u8]) -> Self {
        Self {
            size_bytes: bytes.len(),
            data: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes),
            checksum: stagebook_core::snapshot_checksum(bytes),
            blake3: stagebook_core::snapshot_crypto_hash(bytes),
        }
    }
}

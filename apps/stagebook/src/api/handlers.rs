//! # API Endpoint Handlers
//!
//! Every handler takes the session lock, calls one core operation and maps
//! the result to JSON. Mutations take the write half of the lock so each
//! check-then-insert runs as one unit; reads take the read half.

use super::{
    AppState, reports,
    types::{
        AllocationJson, AllocationRequest, AllocationUpdateRequest, ApiError, ContactQuery,
        DirectoryQuery, DirectoryRequest, ExportResponse, HealthResponse, OrganisationQuery,
        PortfolioQuery, PortfolioResponse, ProjectPerformanceJson, ProjectQuery, StageBurnJson,
        StatusResponse, TimeEntryJson, TimeEntryQuery, TimeEntryRequest, VisibilityQuery,
    },
};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
};
use serde::Serialize;
use stagebook_core::{
    AllocationId, Analytics, Contact, ContactFilter, ContactId, ContactPatch, ContactProject,
    ContactRole, Directory, DirectoryEntry, DirectoryEntryId, Hours, NewContact,
    NewOrganisation, NewProject, NewTimeEntry, Organisation, OrganisationFilter, OrganisationId,
    OrganisationPatch, Project, ProjectFilter, ProjectId, ProjectPatch, Registry, RibaStage,
    TimeEntryFilter, Timesheet, Upsert, Visibility, snapshot_to_bytes,
};

type ApiResult<T> = Result<T, ApiError>;

/// Unwrap a JSON body, turning extractor rejections into the common error body.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        ApiError::new(rejection.status(), "invalid_body", rejection.body_text())
    })
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    params.map(|Query(value)| value).map_err(|rejection| {
        ApiError::new(StatusCode::BAD_REQUEST, "validation", rejection.body_text())
    })
}

/// 201 for a new row, 200 for an existing one.
fn upserted<R, J: Serialize>(
    upsert: Upsert<R>,
    to_json: impl FnOnce(R) -> J,
) -> (StatusCode, Json<J>) {
    let status = if upsert.was_created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (status, Json(to_json(upsert.into_inner())))
}

// =============================================================================
// HEALTH / STATUS
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Row counts per table.
pub async fn status_handler(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    let session = state.session.read().await;
    let backend = if session.is_persistent() { "redb" } else { "memory" };
    Ok(Json(StatusResponse {
        backend: backend.to_string(),
        counts: session.counts()?,
    }))
}

// =============================================================================
// ORGANISATIONS
// =============================================================================

pub async fn list_organisations_handler(
    State(state): State<AppState>,
    params: Result<Query<OrganisationQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Organisation>>> {
    let filter: OrganisationFilter = query(params)?.into();
    let session = state.session.read().await;
    Ok(Json(Registry::list_organisations(&*session, &filter)?))
}

pub async fn create_organisation_handler(
    State(state): State<AppState>,
    payload: Result<Json<NewOrganisation>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Organisation>)> {
    let draft = body(payload)?;
    let mut session = state.session.write().await;
    let row = Registry::create_organisation(&mut *session, draft)?;
    tracing::info!(event = "organisation_created", id = %row.id, name = %row.name);
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn get_organisation_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Organisation>> {
    let session = state.session.read().await;
    Ok(Json(Registry::organisation(&*session, OrganisationId(id))?))
}

pub async fn update_organisation_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    payload: Result<Json<OrganisationPatch>, JsonRejection>,
) -> ApiResult<Json<Organisation>> {
    let patch = body(payload)?;
    let mut session = state.session.write().await;
    Ok(Json(Registry::update_organisation(
        &mut *session,
        OrganisationId(id),
        patch,
    )?))
}

pub async fn deactivate_organisation_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Organisation>> {
    let mut session = state.session.write().await;
    let row = Registry::deactivate_organisation(&mut *session, OrganisationId(id))?;
    tracing::info!(event = "organisation_deactivated", id = %row.id);
    Ok(Json(row))
}

// =============================================================================
// CONTACTS
// =============================================================================

pub async fn list_contacts_handler(
    State(state): State<AppState>,
    params: Result<Query<ContactQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Contact>>> {
    let filter: ContactFilter = query(params)?.into();
    let session = state.session.read().await;
    Ok(Json(Registry::list_contacts(&*session, &filter)?))
}

/// Idempotent: an identical active contact is returned with 200.
pub async fn create_contact_handler(
    State(state): State<AppState>,
    payload: Result<Json<NewContact>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Contact>)> {
    let draft = body(payload)?;
    let mut session = state.session.write().await;
    let upsert = Registry::create_contact(&mut *session, draft)?;
    if upsert.was_created() {
        tracing::info!(event = "contact_created", id = %upsert.row().id);
    }
    Ok(upserted(upsert, |row| row))
}

pub async fn get_contact_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Contact>> {
    let session = state.session.read().await;
    Ok(Json(Registry::contact(&*session, ContactId(id))?))
}

pub async fn update_contact_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    payload: Result<Json<ContactPatch>, JsonRejection>,
) -> ApiResult<Json<Contact>> {
    let patch = body(payload)?;
    let mut session = state.session.write().await;
    Ok(Json(Registry::update_contact(&mut *session, ContactId(id), patch)?))
}

pub async fn deactivate_contact_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Contact>> {
    let mut session = state.session.write().await;
    let row = Registry::deactivate_contact(&mut *session, ContactId(id))?;
    tracing::info!(event = "contact_deactivated", id = %row.id);
    Ok(Json(row))
}

/// Every active project the contact appears on.
pub async fn contact_projects_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Vec<ContactProject>>> {
    let session = state.session.read().await;
    Ok(Json(Directory::contact_projects(&*session, ContactId(id))?))
}

// =============================================================================
// PROJECTS
// =============================================================================

pub async fn list_projects_handler(
    State(state): State<AppState>,
    params: Result<Query<ProjectQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Project>>> {
    let filter: ProjectFilter = query(params)?.try_into()?;
    let session = state.session.read().await;
    Ok(Json(Registry::list_projects(&*session, &filter)?))
}

/// Fails with 409 when the job number was ever used before.
pub async fn create_project_handler(
    State(state): State<AppState>,
    payload: Result<Json<NewProject>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let draft = body(payload)?;
    let mut session = state.session.write().await;
    let row = Registry::create_project(&mut *session, draft)?;
    tracing::info!(event = "project_created", id = %row.id, job_number = %row.job_number);
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn get_project_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Project>> {
    let session = state.session.read().await;
    Ok(Json(Registry::project(&*session, ProjectId(id))?))
}

pub async fn update_project_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    payload: Result<Json<ProjectPatch>, JsonRejection>,
) -> ApiResult<Json<Project>> {
    let patch = body(payload)?;
    let mut session = state.session.write().await;
    Ok(Json(Registry::update_project(&mut *session, ProjectId(id), patch)?))
}

pub async fn deactivate_project_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Project>> {
    let mut session = state.session.write().await;
    let row = Registry::deactivate_project(&mut *session, ProjectId(id))?;
    tracing::info!(event = "project_deactivated", id = %row.id, job_number = %row.job_number);
    Ok(Json(row))
}

// =============================================================================
// PROJECT DIRECTORY
// =============================================================================

pub async fn project_directory_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    params: Result<Query<DirectoryQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<DirectoryEntry>>> {
    let params = query(params)?;
    let role = params.role()?;
    let session = state.session.read().await;
    Ok(Json(Directory::project_directory(
        &*session,
        ProjectId(id),
        role,
        Visibility::from_flag(params.include_inactive),
    )?))
}

/// Add a contact to a project's directory, or return the existing row.
pub async fn add_directory_entry_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    payload: Result<Json<DirectoryRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<DirectoryEntry>)> {
    let request = body(payload)?;
    let role: ContactRole = request.role.parse()?;
    let mut session = state.session.write().await;
    let upsert = Directory::add_or_get_directory_entry(
        &mut *session,
        ProjectId(id),
        request.contact_id,
        role,
        request.notes.as_deref(),
    )?;
    if upsert.was_created() {
        let row = upsert.row();
        tracing::info!(
            event = "directory_entry_created",
            id = %row.id,
            project = %row.project,
            contact = %row.contact,
            role = %row.role
        );
    }
    Ok(upserted(upsert, |row| row))
}

pub async fn remove_directory_entry_handler(
    State(state): State<AppState>,
    Path((id, entry)): Path<(u64, u64)>,
) -> ApiResult<Json<DirectoryEntry>> {
    let mut session = state.session.write().await;
    let row = Directory::remove_directory_entry(
        &mut *session,
        ProjectId(id),
        DirectoryEntryId(entry),
    )?;
    tracing::info!(event = "directory_entry_removed", id = %row.id, project = %row.project);
    Ok(Json(row))
}

// =============================================================================
// ALLOCATIONS
// =============================================================================

pub async fn list_allocations_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    params: Result<Query<VisibilityQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<AllocationJson>>> {
    let visibility = Visibility::from_flag(query(params)?.include_inactive);
    let session = state.session.read().await;
    let rows = Timesheet::allocations(&*session, ProjectId(id), visibility)?;
    Ok(Json(rows.into_iter().map(AllocationJson::from).collect()))
}

/// Idempotent per (project, stage): a second request returns the first budget.
pub async fn allocate_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    payload: Result<Json<AllocationRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AllocationJson>)> {
    let request = body(payload)?;
    let hours = Hours::from_decimal(request.allocated_hours)?;
    let mut session = state.session.write().await;
    let upsert = Timesheet::allocate(&mut *session, ProjectId(id), request.stage, hours)?;
    if upsert.was_created() {
        let row = upsert.row();
        tracing::info!(
            event = "allocation_created",
            id = %row.id,
            project = %row.project,
            stage = row.stage.number(),
            hours = %row.allocated
        );
    }
    Ok(upserted(upsert, AllocationJson::from))
}

pub async fn update_allocation_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    payload: Result<Json<AllocationUpdateRequest>, JsonRejection>,
) -> ApiResult<Json<AllocationJson>> {
    let request = body(payload)?;
    let hours = Hours::from_decimal(request.allocated_hours)?;
    let mut session = state.session.write().await;
    let row = Timesheet::update_allocation(&mut *session, AllocationId(id), hours)?;
    tracing::info!(event = "allocation_updated", id = %row.id, hours = %row.allocated);
    Ok(Json(row.into()))
}

/// Soft-delete an allocation so the stage can be budgeted afresh.
pub async fn deactivate_allocation_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<AllocationJson>> {
    let mut session = state.session.write().await;
    let row = Timesheet::deactivate_allocation(&mut *session, AllocationId(id))?;
    tracing::info!(event = "allocation_deactivated", id = %row.id, stage = %row.stage);
    Ok(Json(row.into()))
}

// =============================================================================
// TIME ENTRIES
// =============================================================================

pub async fn list_time_entries_handler(
    State(state): State<AppState>,
    params: Result<Query<TimeEntryQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<TimeEntryJson>>> {
    let filter: TimeEntryFilter = query(params)?.try_into()?;
    let session = state.session.read().await;
    let rows = Timesheet::time_entries(&*session, filter)?;
    Ok(Json(rows.into_iter().map(TimeEntryJson::from).collect()))
}

/// Append a time entry. Stage defaults to the project's current stage.
pub async fn log_time_handler(
    State(state): State<AppState>,
    payload: Result<Json<TimeEntryRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TimeEntryJson>)> {
    let request = body(payload)?;
    let hours = Hours::from_decimal(request.hours)?;
    let logged_on = request
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let mut session = state.session.write().await;
    let stage = match request.stage {
        Some(stage) => stage,
        None => Registry::project(&*session, request.project_id)?.current_stage,
    };
    let row = Timesheet::log_time(
        &mut *session,
        NewTimeEntry {
            project: request.project_id,
            stage,
            hours,
            logged_on,
            description: request.description,
            logged_by: request.logged_by,
        },
    )?;
    tracing::info!(
        event = "time_logged",
        id = %row.id,
        project = %row.project,
        stage = row.stage.number(),
        hours = %row.hours
    );
    Ok((StatusCode::CREATED, Json(row.into())))
}

// =============================================================================
// ANALYTICS
// =============================================================================

pub async fn project_performance_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<ProjectPerformanceJson>> {
    let session = state.session.read().await;
    let performance = Analytics::compute_project_performance(&*session, ProjectId(id))?;
    Ok(Json(performance.into()))
}

/// `stage` accepts `3`, `S3` or `stage 3`.
pub async fn stage_burn_handler(
    State(state): State<AppState>,
    Path((id, stage)): Path<(u64, String)>,
) -> ApiResult<Json<StageBurnJson>> {
    let stage: RibaStage = stage.parse()?;
    let session = state.session.read().await;
    let burn = Analytics::compute_stage_burn(&*session, ProjectId(id), stage)?;
    Ok(Json(burn.into()))
}

/// Portfolio in the order of `ids`, or every allocated Active-status project by id.
pub async fn portfolio_handler(
    State(state): State<AppState>,
    params: Result<Query<PortfolioQuery>, QueryRejection>,
) -> ApiResult<Json<PortfolioResponse>> {
    let ids = query(params)?.project_ids()?;
    let session = state.session.read().await;
    let summary = match ids {
        Some(ids) => Analytics::compute_portfolio_summary(&*session, &ids)?,
        None => Analytics::compute_active_portfolio(&*session)?,
    };
    Ok(Json(summary.into()))
}

// =============================================================================
// CSV REPORTS
// =============================================================================

type CsvDownload = ([(header::HeaderName, String); 2], Vec<u8>);

fn csv_download(job_number: &str, report: &str, body: Vec<u8>) -> CsvDownload {
    let today = chrono::Local::now().date_naive();
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                reports::attachment(job_number, report, today),
            ),
        ],
        body,
    )
}

pub async fn directory_csv_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<CsvDownload> {
    let session = state.session.read().await;
    let project = Registry::project(&*session, ProjectId(id))?;
    let body = reports::directory_csv(&*session, &project)?;
    Ok(csv_download(&project.job_number, "directory", body))
}

pub async fn analytics_csv_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<CsvDownload> {
    let session = state.session.read().await;
    let performance = Analytics::compute_project_performance(&*session, ProjectId(id))?;
    let body = reports::analytics_csv(&performance)?;
    Ok(csv_download(&performance.job_number, "analytics", body))
}

// =============================================================================
// EXPORT
// =============================================================================

/// Snapshot every table, base64-encoded.
pub async fn export_handler(State(state): State<AppState>) -> ApiResult<Json<ExportResponse>> {
    let session = state.session.read().await;
    let tables = session.export_tables()?;
    let bytes = snapshot_to_bytes(&tables)?;
    tracing::info!(event = "snapshot_exported", rows = tables.row_count(), bytes = bytes.len());
    Ok(Json(ExportResponse::from_snapshot(&bytes)))
}

/// Fallback for unknown routes.
pub async fn not_found_handler() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "not_found", "No such route")
}

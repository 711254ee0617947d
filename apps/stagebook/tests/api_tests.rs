//! Integration tests for the Stagebook HTTP API.
//!
//! Uses axum-test to drive the router without starting a real server.

#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use base64::Engine;
use serde_json::{Value, json};
use stagebook::api::{
    AllocationJson, AppState, ErrorBody, ExportResponse, HealthResponse, PortfolioResponse,
    ProjectPerformanceJson, StageBurnJson, StatusResponse, TimeEntryJson, create_router,
};
use stagebook::config::ServerConfig;
use stagebook_core::{
    Contact, DirectoryEntry, Organisation, Project, RiskStatus, Session, snapshot_from_bytes,
};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Server config with the limiter off so tests never race it.
fn test_config() -> ServerConfig {
    ServerConfig {
        rate_limit: 0,
        ..ServerConfig::default()
    }
}

fn create_test_server() -> TestServer {
    server_with(test_config())
}

fn server_with(config: ServerConfig) -> TestServer {
    let router = create_router(AppState::new(Session::new()), &config);
    TestServer::new(router).unwrap()
}

async fn create_project(server: &TestServer, job: &str) -> Project {
    let response = server
        .post("/projects")
        .json(&json!({ "job_number": job, "name": format!("Scheme {job}") }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

async fn allocate(server: &TestServer, project: &Project, stage: u8, hours: f64) -> AllocationJson {
    let response = server
        .post(&format!("/projects/{}/allocations", project.id))
        .json(&json!({ "stage": stage, "allocated_hours": hours }))
        .await;
    assert!(response.status_code().is_success());
    response.json()
}

async fn log_hours(server: &TestServer, project: &Project, stage: u8, hours: f64) {
    server
        .post("/time-entries")
        .json(&json!({
            "project_id": project.id,
            "stage": stage,
            "hours": hours,
            "date": "2025-03-03",
        }))
        .await
        .assert_status(StatusCode::CREATED);
}

async fn post_json(server: &TestServer, path: &str, body: &Value) -> axum_test::TestResponse {
    server.post(path).json(body).await
}

fn error_kind(response: &axum_test::TestResponse) -> String {
    response.json::<ErrorBody>().error.kind
}

// =============================================================================
// HEALTH / STATUS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[tokio::test]
async fn test_status_counts_rows() {
    let server = create_test_server();
    let project = create_project(&server, "SB-1").await;
    allocate(&server, &project, 2, 40.0).await;

    let status: StatusResponse = server.get("/status").await.json();

    assert_eq!(status.backend, "memory");
    assert_eq!(status.counts.projects, 1);
    assert_eq!(status.counts.stage_allocations, 1);
    assert_eq!(status.counts.time_entries, 0);
}

#[tokio::test]
async fn test_unknown_route_uses_error_body() {
    let server = create_test_server();

    let response = server.get("/no/such/thing").await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(error_kind(&response), "not_found");
}

// =============================================================================
// ENTITY STORE
// =============================================================================

#[tokio::test]
async fn test_create_and_list_organisations() {
    let server = create_test_server();

    for name in ["Northgate Structural", "Calder & Finch"] {
        server
            .post("/organisations")
            .json(&json!({ "name": name, "city": "Leeds" }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let orgs: Vec<Organisation> = server.get("/organisations").await.json();
    let names: Vec<&str> = orgs.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, ["Calder & Finch", "Northgate Structural"]);
}

#[tokio::test]
async fn test_blank_name_is_validation_error() {
    let server = create_test_server();

    let response = server
        .post("/organisations")
        .json(&json!({ "name": "   " }))
        .await;

    response.assert_status_bad_request();
    assert_eq!(error_kind(&response), "validation");
}

#[tokio::test]
async fn test_contact_create_is_idempotent() {
    let server = create_test_server();
    let draft = json!({ "first_name": "Mina", "last_name": "Okafor", "email": "mina@example.com" });

    let first = server.post("/contacts").json(&draft).await;
    first.assert_status(StatusCode::CREATED);
    let first: Contact = first.json();

    let again = server
        .post("/contacts")
        .json(&json!({ "first_name": "MINA", "last_name": "okafor", "email": "Mina@Example.com" }))
        .await;
    again.assert_status_ok();
    let again: Contact = again.json();

    assert_eq!(first.id, again.id);
    let all: Vec<Contact> = server.get("/contacts").await.json();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_duplicate_job_number_conflicts() {
    let server = create_test_server();
    let project = create_project(&server, "SB-7").await;

    // Still taken once the first project is soft-deleted.
    server
        .delete(&format!("/projects/{}", project.id))
        .await
        .assert_status_ok();

    let response = server
        .post("/projects")
        .json(&json!({ "job_number": "SB-7", "name": "Another" }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(error_kind(&response), "duplicate");
}

#[tokio::test]
async fn test_soft_delete_hides_row() {
    let server = create_test_server();
    let project = create_project(&server, "SB-8").await;

    let deleted: Project = server
        .delete(&format!("/projects/{}", project.id))
        .await
        .json();
    assert!(!deleted.is_active);

    server
        .get(&format!("/projects/{}", project.id))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let active: Vec<Project> = server.get("/projects").await.json();
    assert!(active.is_empty());

    let all: Vec<Project> = server
        .get("/projects")
        .add_query_param("include_inactive", true)
        .await
        .json();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_project_patch_changes_stage() {
    let server = create_test_server();
    let project = create_project(&server, "SB-9").await;

    let updated: Project = server
        .patch(&format!("/projects/{}", project.id))
        .json(&json!({ "current_stage": 3, "status": "On Hold" }))
        .await
        .json();

    assert_eq!(updated.current_stage.number(), 3);
    assert_eq!(updated.status.label(), "On Hold");
}

#[tokio::test]
async fn test_project_filter_rejects_bad_status() {
    let server = create_test_server();

    let response = server
        .get("/projects")
        .add_query_param("status", "Sleeping")
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_malformed_json_body() {
    let server = create_test_server();

    let response = server
        .post("/projects")
        .bytes(bytes::Bytes::from("not valid json"))
        .content_type("application/json")
        .await;

    assert!(response.status_code().is_client_error());
    assert_eq!(error_kind(&response), "invalid_body");
}

// =============================================================================
// ALLOCATIONS AND TIME ENTRIES
// =============================================================================

#[tokio::test]
async fn test_allocation_returns_existing_budget() {
    let server = create_test_server();
    let project = create_project(&server, "SB-10").await;
    let path = format!("/projects/{}/allocations", project.id);

    let first = server
        .post(&path)
        .json(&json!({ "stage": 2, "allocated_hours": 120.0 }))
        .await;
    first.assert_status(StatusCode::CREATED);
    let first: AllocationJson = first.json();

    let second = server
        .post(&path)
        .json(&json!({ "stage": 2, "allocated_hours": 999.0 }))
        .await;
    second.assert_status_ok();
    let second: AllocationJson = second.json();

    assert_eq!(first.id, second.id);
    assert_eq!(second.allocated_hours, 120.0);
    assert_eq!(second.stage_name, "Concept Design");

    let updated: AllocationJson = server
        .patch(&format!("/allocations/{}", first.id))
        .json(&json!({ "allocated_hours": 150.5 }))
        .await
        .json();
    assert_eq!(updated.allocated_hours, 150.5);
}

#[tokio::test]
async fn test_deactivated_allocation_can_be_replaced() {
    let server = create_test_server();
    let project = create_project(&server, "SB-12").await;
    let first = allocate(&server, &project, 3, 60.0).await;

    let removed = server.delete(&format!("/allocations/{}", first.id)).await;
    removed.assert_status_ok();
    assert!(!removed.json::<AllocationJson>().is_active);

    server
        .delete(&format!("/allocations/{}", first.id))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let response = server
        .post(&format!("/projects/{}/allocations", project.id))
        .json(&json!({ "stage": 3, "allocated_hours": 75.0 }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let second: AllocationJson = response.json();
    assert_ne!(second.id, first.id);

    let listed: Vec<AllocationJson> = server
        .get(&format!("/projects/{}/allocations", project.id))
        .await
        .json();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].allocated_hours, 75.0);
}

#[tokio::test]
async fn test_concurrent_allocations_create_one_row() {
    let server = create_test_server();
    let project = create_project(&server, "SB-13").await;
    let path = format!("/projects/{}/allocations", project.id);
    let request = json!({ "stage": 1, "allocated_hours": 24.0 });

    let (a, b, c, d) = tokio::join!(
        post_json(&server, &path, &request),
        post_json(&server, &path, &request),
        post_json(&server, &path, &request),
        post_json(&server, &path, &request),
    );

    let statuses = [a, b, c, d].map(|r| r.status_code());
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CREATED).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 3);

    let listed: Vec<AllocationJson> = server.get(&path).await.json();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_log_time_defaults_to_current_stage() {
    let server = create_test_server();
    let created = server
        .post("/projects")
        .json(&json!({ "job_number": "SB-11", "name": "Library", "current_stage": 4 }))
        .await;
    let project: Project = created.json();

    let response = server
        .post("/time-entries")
        .json(&json!({ "project_id": project.id, "hours": 7.5, "date": "2025-02-10" }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let entry: TimeEntryJson = response.json();
    assert_eq!(entry.stage.number(), 4);
    assert_eq!(entry.hours, 7.5);

    let listed: Vec<TimeEntryJson> = server
        .get("/time-entries")
        .add_query_param("project_id", project.id.0)
        .await
        .json();
    assert_eq!(listed, vec![entry]);
}

#[tokio::test]
async fn test_log_time_rejects_more_than_a_day() {
    let server = create_test_server();
    let project = create_project(&server, "SB-12").await;

    let response = server
        .post("/time-entries")
        .json(&json!({ "project_id": project.id, "stage": 1, "hours": 24.01 }))
        .await;

    response.assert_status_bad_request();
    assert_eq!(error_kind(&response), "validation");
}

#[tokio::test]
async fn test_log_time_unknown_project() {
    let server = create_test_server();

    let response = server
        .post("/time-entries")
        .json(&json!({ "project_id": 42, "stage": 1, "hours": 1.0 }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

// =============================================================================
// ANALYTICS
// =============================================================================

#[tokio::test]
async fn test_stage_burn_thresholds() {
    let server = create_test_server();
    let project = create_project(&server, "SB-20").await;
    allocate(&server, &project, 3, 100.0).await;
    let path = format!("/analytics/projects/{}/stages/3", project.id);

    for _ in 0..3 {
        log_hours(&server, &project, 3, 24.0).await;
    }
    log_hours(&server, &project, 3, 7.0).await;
    let burn: StageBurnJson = server.get(&path).await.json();
    assert_eq!(burn.used_hours, 79.0);
    assert_eq!(burn.status, RiskStatus::OnTrack);

    log_hours(&server, &project, 3, 1.0).await;
    let burn: StageBurnJson = server.get(&path).await.json();
    assert_eq!(burn.burn_percentage, 80.0);
    assert_eq!(burn.status, RiskStatus::AtRisk);

    log_hours(&server, &project, 3, 20.0).await;
    let burn: StageBurnJson = server.get(&path).await.json();
    assert_eq!(burn.remaining_hours, 0.0);
    assert_eq!(burn.status, RiskStatus::AtRisk);

    log_hours(&server, &project, 3, 1.0).await;
    let burn: StageBurnJson = server.get(&path).await.json();
    assert_eq!(burn.remaining_hours, -1.0);
    assert_eq!(burn.status, RiskStatus::Overrun);
}

#[tokio::test]
async fn test_stage_burn_accepts_stage_labels() {
    let server = create_test_server();
    let project = create_project(&server, "SB-21").await;
    allocate(&server, &project, 3, 10.0).await;

    server
        .get(&format!("/analytics/projects/{}/stages/S3", project.id))
        .await
        .assert_status_ok();
    server
        .get(&format!("/analytics/projects/{}/stages/9", project.id))
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn test_stage_burn_without_allocation() {
    let server = create_test_server();
    let project = create_project(&server, "SB-22").await;
    log_hours(&server, &project, 2, 5.0).await;

    let response = server
        .get(&format!("/analytics/projects/{}/stages/2", project.id))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_kind(&response), "missing_allocation");
}

#[tokio::test]
async fn test_stage_burn_zero_allocation() {
    let server = create_test_server();
    let project = create_project(&server, "SB-23").await;
    allocate(&server, &project, 1, 0.0).await;

    let response = server
        .get(&format!("/analytics/projects/{}/stages/1", project.id))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_kind(&response), "division_undefined");
}

#[tokio::test]
async fn test_project_performance_lists_unallocated_time() {
    let server = create_test_server();
    let project = create_project(&server, "SB-24").await;
    allocate(&server, &project, 1, 40.0).await;
    allocate(&server, &project, 2, 0.0).await;
    log_hours(&server, &project, 1, 8.0).await;
    log_hours(&server, &project, 5, 2.0).await;

    let response = server
        .get(&format!("/analytics/projects/{}", project.id))
        .await;

    response.assert_status_ok();
    let perf: ProjectPerformanceJson = response.json();
    assert_eq!(perf.stages.len(), 2);
    assert_eq!(perf.stages[0].burn_percentage, Some(20.0));
    assert_eq!(perf.stages[1].status, None);
    assert_eq!(perf.unallocated.len(), 1);
    assert_eq!(perf.unallocated[0].stage.number(), 5);
    assert_eq!(perf.total_used_hours, 10.0);
}

#[tokio::test]
async fn test_portfolio_follows_requested_order() {
    let server = create_test_server();
    let a = create_project(&server, "SB-30").await;
    let b = create_project(&server, "SB-31").await;
    allocate(&server, &a, 2, 10.0).await;
    allocate(&server, &b, 2, 10.0).await;
    log_hours(&server, &a, 2, 9.0).await;
    log_hours(&server, &b, 2, 11.0).await;

    let portfolio: PortfolioResponse = server
        .get("/analytics/portfolio")
        .add_query_param("ids", format!("{},999,{},{}", b.id, a.id, b.id))
        .await
        .json();

    let jobs: Vec<&str> = portfolio
        .projects
        .iter()
        .map(|p| p.job_number.as_str())
        .collect();
    assert_eq!(jobs, ["SB-31", "SB-30"]);
    assert_eq!(portfolio.rollup.at_risk, 1);
    assert_eq!(portfolio.rollup.overrun, 1);
    assert_eq!(portfolio.rollup.overrun_projects, vec!["Scheme SB-31".to_string()]);
}

#[tokio::test]
async fn test_portfolio_empty() {
    let server = create_test_server();

    let response = server.get("/analytics/portfolio").await;

    response.assert_status_ok();
    let portfolio: PortfolioResponse = response.json();
    assert!(portfolio.projects.is_empty());
    assert_eq!(portfolio.rollup.project_count, 0);
    assert_eq!(portfolio.rollup.overall_utilisation, None);
}

#[tokio::test]
async fn test_default_portfolio_skips_paused_and_unallocated() {
    let server = create_test_server();
    let live = create_project(&server, "SB-32").await;
    let paused = create_project(&server, "SB-33").await;
    let fresh = create_project(&server, "SB-34").await;
    allocate(&server, &live, 2, 40.0).await;
    allocate(&server, &paused, 2, 10.0).await;
    log_hours(&server, &live, 2, 10.0).await;
    log_hours(&server, &paused, 2, 12.0).await;
    server
        .patch(&format!("/projects/{}", paused.id))
        .json(&json!({ "status": "On Hold" }))
        .await
        .assert_status_ok();

    let portfolio: PortfolioResponse = server.get("/analytics/portfolio").await.json();

    let jobs: Vec<&str> = portfolio
        .projects
        .iter()
        .map(|p| p.job_number.as_str())
        .collect();
    assert_eq!(jobs, ["SB-32"]);
    assert_eq!(portfolio.rollup.overrun, 0);
    assert_eq!(portfolio.rollup.overall_utilisation, Some(25.0));

    let response = server
        .get("/analytics/portfolio")
        .add_query_param("ids", format!("{},{}", live.id, fresh.id))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_kind(&response), "division_undefined");
}

#[tokio::test]
async fn test_portfolio_rejects_bad_ids() {
    let server = create_test_server();

    server
        .get("/analytics/portfolio")
        .add_query_param("ids", "1,two")
        .await
        .assert_status_bad_request();
}

// =============================================================================
// DIRECTORY
// =============================================================================

#[tokio::test]
async fn test_directory_add_is_idempotent() {
    let server = create_test_server();
    let project = create_project(&server, "SB-40").await;
    let contact: Contact = server
        .post("/contacts")
        .json(&json!({ "first_name": "Rhys", "last_name": "Penn" }))
        .await
        .json();
    let path = format!("/projects/{}/directory", project.id);
    let request = json!({ "contact_id": contact.id, "role": "engineer" });

    let first = server.post(&path).json(&request).await;
    first.assert_status(StatusCode::CREATED);
    let first: DirectoryEntry = first.json();

    let again = server.post(&path).json(&request).await;
    again.assert_status_ok();
    let again: DirectoryEntry = again.json();
    assert_eq!(first.id, again.id);

    let projects: Vec<Value> = server
        .get(&format!("/contacts/{}/projects", contact.id))
        .await
        .json();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["job_number"], "SB-40");

    let removed: DirectoryEntry = server
        .delete(&format!("{}/{}", path, first.id))
        .await
        .json();
    assert!(!removed.is_active);

    let listed: Vec<DirectoryEntry> = server.get(&path).await.json();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_directory_rejects_unknown_role() {
    let server = create_test_server();
    let project = create_project(&server, "SB-41").await;
    let contact: Contact = server
        .post("/contacts")
        .json(&json!({ "first_name": "Joan", "last_name": "Whitlock" }))
        .await
        .json();

    let response = server
        .post(&format!("/projects/{}/directory", project.id))
        .json(&json!({ "contact_id": contact.id, "role": "astronaut" }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_concurrent_directory_adds_create_one_row() {
    let server = create_test_server();
    let project = create_project(&server, "SB-42").await;
    let contact: Contact = server
        .post("/contacts")
        .json(&json!({ "first_name": "Ines", "last_name": "Marlow" }))
        .await
        .json();
    let path = format!("/projects/{}/directory", project.id);
    let request = json!({ "contact_id": contact.id, "role": "client" });

    let (a, b, c, d) = tokio::join!(
        post_json(&server, &path, &request),
        post_json(&server, &path, &request),
        post_json(&server, &path, &request),
        post_json(&server, &path, &request),
    );

    let statuses = [a, b, c, d].map(|r| r.status_code());
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CREATED).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 3);

    let listed: Vec<DirectoryEntry> = server.get(&path).await.json();
    assert_eq!(listed.len(), 1);
}

// =============================================================================
// CSV REPORTS
// =============================================================================

#[tokio::test]
async fn test_directory_csv_download() {
    let server = create_test_server();
    let project = create_project(&server, "SB-45").await;
    let contact: Contact = server
        .post("/contacts")
        .json(&json!({
            "first_name": "Rhys",
            "last_name": "Penn",
            "email": "rhys@example.com",
        }))
        .await
        .json();
    server
        .post(&format!("/projects/{}/directory", project.id))
        .json(&json!({ "contact_id": contact.id, "role": "engineer", "notes": "Drainage, levels" }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .get(&format!("/reports/directory/{}/csv", project.id))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.header(header::CONTENT_TYPE),
        HeaderValue::from_static("text/csv; charset=utf-8")
    );
    let disposition = response.header(header::CONTENT_DISPOSITION);
    assert!(
        disposition
            .to_str()
            .unwrap()
            .starts_with("attachment; filename=\"SB-45_directory_")
    );
    let text = response.text();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        [
            "Name,Organisation,Role,Email,Phone,Job Title,Notes",
            "Rhys Penn,,Engineer,rhys@example.com,,,\"Drainage, levels\"",
        ]
    );
}

#[tokio::test]
async fn test_analytics_csv_download() {
    let server = create_test_server();
    let project = create_project(&server, "SB-46").await;
    allocate(&server, &project, 2, 10.0).await;
    log_hours(&server, &project, 2, 11.0).await;
    log_hours(&server, &project, 5, 1.5).await;

    let response = server
        .get(&format!("/reports/analytics/{}/csv", project.id))
        .await;

    response.assert_status_ok();
    let text = response.text();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        [
            "Stage,Stage Name,Allocated Hours,Used Hours,Remaining Hours,Burn Rate (%),Status",
            "2,Concept Design,10.00,11.00,-1.00,110.0,Overrun",
            "5,Manufacturing & Construction,0.00,1.50,-1.50,,Unallocated",
        ]
    );
}

#[tokio::test]
async fn test_csv_reports_unknown_project() {
    let server = create_test_server();

    for path in ["/reports/directory/77/csv", "/reports/analytics/77/csv"] {
        let response = server.get(path).await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(error_kind(&response), "not_found");
    }
}

// =============================================================================
// EXPORT
// =============================================================================

#[tokio::test]
async fn test_export_snapshot_decodes() {
    let server = create_test_server();
    let project = create_project(&server, "SB-50").await;
    allocate(&server, &project, 0, 12.0).await;

    let response = server.post("/export").await;

    response.assert_status_ok();
    let export: ExportResponse = response.json();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&export.data)
        .unwrap();
    assert_eq!(bytes.len(), export.size_bytes);
    assert_eq!(export.blake3.len(), 64);

    let tables = snapshot_from_bytes(&bytes).unwrap();
    assert_eq!(tables.projects.len(), 1);
    assert_eq!(tables.allocations.len(), 1);
}

// =============================================================================
// AUTHENTICATION AND RATE LIMITING
// =============================================================================

fn auth_server(key: &str) -> TestServer {
    server_with(ServerConfig {
        api_key: Some(key.to_string()),
        ..test_config()
    })
}

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let server = auth_server("test-secret-key-12345");

    let response = server
        .get("/status")
        .add_header(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer test-secret-key-12345"),
        )
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_valid_raw_token() {
    let server = auth_server("raw-key");

    let response = server
        .get("/status")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("raw-key"))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_invalid_token_rejected() {
    let server = auth_server("correct-key");

    let response = server
        .get("/projects")
        .add_header(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer wrong-key"),
        )
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(error_kind(&response), "unauthorized");
}

#[tokio::test]
async fn test_auth_missing_header_rejected() {
    let server = auth_server("required-key");

    server
        .get("/status")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_health_endpoint_bypasses_auth() {
    let server = auth_server("secret");

    server.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn test_rate_limit_exceeded() {
    let server = server_with(ServerConfig {
        rate_limit: 1,
        ..ServerConfig::default()
    });

    server.get("/health").await.assert_status_ok();
    let response = server.get("/health").await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    assert_eq!(error_kind(&response), "rate_limited");
}

#[tokio::test]
async fn test_zero_rate_limit_never_throttles() {
    let server = create_test_server();

    for _ in 0..150 {
        server.get("/health").await.assert_status_ok();
    }
}

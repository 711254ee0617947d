//! # CLI Command Implementations
//!
//! Each command opens a session from the configuration, runs one core
//! operation and prints the result as text or, with `--json-mode`, as JSON.

use crate::api::{
    self, AllocationJson, PortfolioResponse, ProjectPerformanceJson, StageBurnJson,
    TimeEntryJson,
};
use crate::config::{Backend, Config};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use stagebook_core::{
    Analytics, ContactFilter, ContactId, ContactRole, Directory, EntityStore, Hours, NewContact,
    NewOrganisation, NewProject, NewTimeEntry, OrganisationId, Project, ProjectFilter,
    ProjectPatch, ProjectStatus, Registry, RibaStage, Session, StagebookError, Tables,
    Timesheet, Visibility,
    formats::MAX_SNAPSHOT_SIZE,
    primitives::MAGIC_BYTES,
    snapshot_checksum, snapshot_crypto_hash, snapshot_from_bytes, snapshot_to_bytes,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE HELPERS
// =============================================================================

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), StagebookError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| StagebookError::Storage(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(StagebookError::Validation(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path, which must be an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, StagebookError> {
    let canonical = path.canonicalize().map_err(|e| {
        StagebookError::Storage(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(StagebookError::Storage(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path whose parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, StagebookError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        StagebookError::Storage(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(StagebookError::Storage(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| StagebookError::Storage("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn open(config: &Config) -> Result<Session, StagebookError> {
    if config.backend == Backend::Memory {
        tracing::warn!("Using the memory backend: changes are discarded on exit");
    }
    config.open_session()
}

/// Find an active project by job number.
fn project_by_job<S: EntityStore>(store: &S, job_number: &str) -> Result<Project, StagebookError> {
    Registry::project_by_job_number(store, job_number)?.ok_or_else(|| {
        StagebookError::Validation(format!("No active project with job number '{}'", job_number))
    })
}

fn burn_label(burn: Option<f64>) -> String {
    burn.map_or_else(|| "n/a".to_string(), |b| format!("{:.1}%", b))
}

// =============================================================================
// SERVER / STATUS / INIT
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: &Config) -> Result<(), StagebookError> {
    let session = open(config)?;

    println!("Stagebook Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", config.server.address());
    println!("  Backend:  {}", config.backend);
    println!("  Database: {:?}", config.database);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(session, &config.server).await
}

/// Show row counts.
pub fn cmd_status(config: &Config, json: bool) -> Result<(), StagebookError> {
    let session = open(config)?;
    let counts = session.counts()?;

    if json {
        print_json(&serde_json::json!({
            "database": config.database.to_string_lossy(),
            "backend": config.backend.label(),
            "counts": counts,
        }));
        return Ok(());
    }

    println!("Stagebook Status");
    println!("================");
    println!("Database: {:?}", config.database);
    println!("Backend:  {}", config.backend);
    println!();
    println!("Organisations:     {}", counts.organisations);
    println!("Contacts:          {}", counts.contacts);
    println!("Projects:          {}", counts.projects);
    println!("Stage allocations: {}", counts.stage_allocations);
    println!("Time entries:      {}", counts.time_entries);
    println!("Directory entries: {}", counts.directory_entries);

    Ok(())
}

/// Initialize a new database.
pub fn cmd_init(config: &Config, force: bool) -> Result<(), StagebookError> {
    if config.backend == Backend::Memory {
        println!("The memory backend needs no initialization");
        return Ok(());
    }

    let path = &config.database;
    if path.exists() {
        if !force {
            return Err(StagebookError::Validation(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(path)
            .map_err(|e| StagebookError::Storage(format!("Remove old database: {}", e)))?;
        tracing::warn!("Removed existing database at {:?}", path);
    }

    Session::with_redb(path)?;
    println!("Initialized new redb database at {:?}", path);
    Ok(())
}

// =============================================================================
// SEED COMMAND
// =============================================================================

/// What `seed` created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub skipped: bool,
    pub organisations: usize,
    pub contacts: usize,
    pub projects: usize,
    pub allocations: usize,
    pub time_entries: usize,
    pub directory_entries: usize,
}

/// (job number, name, current stage, [(stage, allocated, logged)])
type SampleProject = (&'static str, &'static str, u8, &'static [(u8, u64, u64)]);

const SAMPLE_PROJECTS: [SampleProject; 3] = [
    (
        "SB-2401",
        "Riverside Library",
        4,
        &[(0, 20, 18), (1, 40, 41), (2, 120, 100), (3, 160, 90), (4, 200, 30)],
    ),
    (
        "SB-2402",
        "Elm Street Housing",
        2,
        &[(0, 15, 10), (1, 30, 12), (2, 80, 20)],
    ),
    (
        "SB-2403",
        "Quayside Offices",
        5,
        &[(4, 150, 160), (5, 300, 50)],
    ),
];

/// (organisation, city, first name, last name, job title, role)
const SAMPLE_PEOPLE: [(&str, &str, &str, &str, &str, ContactRole); 4] = [
    ("Elmstone Homes", "Bath", "Tom", "Aldridge", "Development Director", ContactRole::Client),
    ("Calder & Finch Architects", "Bristol", "Mina", "Okafor", "Associate", ContactRole::Architect),
    ("Northgate Structural", "Leeds", "Rhys", "Penn", "Senior Engineer", ContactRole::Engineer),
    ("Harbour QS Partnership", "Cardiff", "Joan", "Whitlock", "Partner", ContactRole::QuantitySurveyor),
];

/// Largest single sample entry, in hundredths (a 7.5 hour day).
const SAMPLE_DAY: u64 = 750;

/// Load the sample data into `store`. Does nothing if it is already there.
pub fn seed_sample_data<S: EntityStore>(store: &mut S) -> Result<SeedReport, StagebookError> {
    let mut report = SeedReport::default();
    if Registry::project_by_job_number(store, SAMPLE_PROJECTS[0].0)?.is_some() {
        report.skipped = true;
        return Ok(report);
    }

    let start = NaiveDate::from_ymd_opt(2025, 1, 6)
        .ok_or_else(|| StagebookError::Validation("invalid sample start date".to_string()))?;

    let mut people = Vec::with_capacity(SAMPLE_PEOPLE.len());
    let mut client = None;
    for (org_name, city, first, last, title, role) in SAMPLE_PEOPLE {
        let org = Registry::create_organisation(
            store,
            NewOrganisation {
                name: org_name.to_string(),
                city: Some(city.to_string()),
                ..Default::default()
            },
        )?;
        report.organisations += 1;
        if role == ContactRole::Client {
            client = Some(org.id);
        }

        let contact = Registry::create_contact(
            store,
            NewContact {
                organisation: Some(org.id),
                first_name: first.to_string(),
                last_name: last.to_string(),
                email: Some(format!(
                    "{}.{}@example.com",
                    first.to_lowercase(),
                    last.to_lowercase()
                )),
                job_title: Some(title.to_string()),
                ..Default::default()
            },
        )?;
        if contact.was_created() {
            report.contacts += 1;
        }
        people.push((contact.into_inner().id, role));
    }

    for (job_number, name, current, stages) in SAMPLE_PROJECTS {
        let project = Registry::create_project(
            store,
            NewProject {
                job_number: job_number.to_string(),
                name: name.to_string(),
                client,
                current_stage: Some(RibaStage::try_from(current)?),
                ..Default::default()
            },
        )?;
        report.projects += 1;

        for &(contact, role) in &people {
            Directory::add_or_get_directory_entry(store, project.id, contact, role, None)?;
            report.directory_entries += 1;
        }

        let mut day = 0u64;
        for &(stage, allocated, logged) in stages {
            let stage = RibaStage::try_from(stage)?;
            Timesheet::allocate(store, project.id, stage, Hours::whole(allocated))?;
            report.allocations += 1;

            let mut left = Hours::whole(logged).hundredths();
            while left > 0 {
                let chunk = left.min(SAMPLE_DAY);
                let logged_on = start.checked_add_days(Days::new(day)).unwrap_or(start);
                Timesheet::log_time(
                    store,
                    NewTimeEntry {
                        project: project.id,
                        stage,
                        hours: Hours::from_hundredths(chunk),
                        logged_on,
                        description: Some(format!("{} work", stage.name())),
                        logged_by: Some("seed".to_string()),
                    },
                )?;
                report.time_entries += 1;
                left -= chunk;
                day += 1;
            }
        }
    }

    Ok(report)
}

/// Load fictional sample data.
pub fn cmd_seed(config: &Config, json: bool) -> Result<(), StagebookError> {
    let mut session = open(config)?;
    let report = seed_sample_data(&mut session)?;

    if json {
        print_json(&report);
    } else if report.skipped {
        println!("Sample data already present; nothing to do");
    } else {
        println!(
            "Seeded {} organisations, {} contacts, {} projects, {} allocations, {} time entries",
            report.organisations,
            report.contacts,
            report.projects,
            report.allocations,
            report.time_entries
        );
    }
    tracing::info!(event = "seeded", skipped = report.skipped, projects = report.projects);
    Ok(())
}

// =============================================================================
// PROJECT COMMANDS
// =============================================================================

/// List projects.
pub fn cmd_project_list(
    config: &Config,
    json: bool,
    include_inactive: bool,
    status: Option<ProjectStatus>,
) -> Result<(), StagebookError> {
    let session = open(config)?;
    let projects = Registry::list_projects(
        &session,
        &ProjectFilter {
            status,
            stage: None,
            visibility: Visibility::from_flag(include_inactive),
        },
    )?;

    if json {
        print_json(&projects);
        return Ok(());
    }
    if projects.is_empty() {
        println!("No projects");
        return Ok(());
    }
    for p in &projects {
        println!(
            "{:<10} {:<30} {:<34} {}{}",
            p.job_number,
            p.name,
            p.current_stage.to_string(),
            p.status,
            if p.is_active { "" } else { " (inactive)" }
        );
    }
    Ok(())
}

/// Create a project.
pub fn cmd_project_add(
    config: &Config,
    json: bool,
    job_number: String,
    name: String,
    description: Option<String>,
    stage: Option<RibaStage>,
    client: Option<u64>,
) -> Result<(), StagebookError> {
    let mut session = open(config)?;
    let project = Registry::create_project(
        &mut session,
        NewProject {
            job_number,
            name,
            description,
            client: client.map(OrganisationId),
            current_stage: stage,
            ..Default::default()
        },
    )?;
    tracing::info!(event = "project_created", id = %project.id, job_number = %project.job_number);

    if json {
        print_json(&project);
    } else {
        println!(
            "Created project {} {} (id {})",
            project.job_number, project.name, project.id
        );
    }
    Ok(())
}

/// Set a project's status to Archived and soft-delete it.
pub fn cmd_project_archive(
    config: &Config,
    json: bool,
    job_number: &str,
) -> Result<(), StagebookError> {
    let mut session = open(config)?;
    let project = project_by_job(&session, job_number)?;
    Registry::update_project(
        &mut session,
        project.id,
        ProjectPatch {
            status: Some(ProjectStatus::Archived),
            ..Default::default()
        },
    )?;
    let archived = Registry::deactivate_project(&mut session, project.id)?;
    tracing::info!(event = "project_archived", id = %archived.id, job_number = %archived.job_number);

    if json {
        print_json(&archived);
    } else {
        println!("Archived {} {}", archived.job_number, archived.name);
    }
    Ok(())
}

// =============================================================================
// CONTACT COMMANDS
// =============================================================================

/// List contacts.
pub fn cmd_contact_list(
    config: &Config,
    json: bool,
    search: Option<String>,
    include_inactive: bool,
) -> Result<(), StagebookError> {
    let session = open(config)?;
    let contacts = Registry::list_contacts(
        &session,
        &ContactFilter {
            organisation: None,
            search,
            visibility: Visibility::from_flag(include_inactive),
        },
    )?;

    if json {
        print_json(&contacts);
        return Ok(());
    }
    for c in &contacts {
        println!(
            "{:>4}  {:<28} {}",
            c.id,
            c.full_name(),
            c.email.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

/// Create a contact, or report the identical one that exists.
pub fn cmd_contact_add(
    config: &Config,
    json: bool,
    first_name: String,
    last_name: String,
    email: Option<String>,
    organisation: Option<u64>,
    job_title: Option<String>,
) -> Result<(), StagebookError> {
    let mut session = open(config)?;
    let upsert = Registry::create_contact(
        &mut session,
        NewContact {
            organisation: organisation.map(OrganisationId),
            first_name,
            last_name,
            email,
            job_title,
            ..Default::default()
        },
    )?;
    let created = upsert.was_created();
    let contact = upsert.into_inner();

    if json {
        print_json(&contact);
    } else if created {
        println!("Created contact {} (id {})", contact.full_name(), contact.id);
    } else {
        println!("Contact {} already exists (id {})", contact.full_name(), contact.id);
    }
    Ok(())
}

// =============================================================================
// BUDGET AND TIME COMMANDS
// =============================================================================

/// Budget hours for a stage.
pub fn cmd_allocate(
    config: &Config,
    json: bool,
    job_number: &str,
    stage: RibaStage,
    hours: f64,
) -> Result<(), StagebookError> {
    let hours = Hours::from_decimal(hours)?;
    let mut session = open(config)?;
    let project = project_by_job(&session, job_number)?;
    let upsert = Timesheet::allocate(&mut session, project.id, stage, hours)?;
    let created = upsert.was_created();
    let row = upsert.into_inner();

    if json {
        print_json(&AllocationJson::from(row));
    } else if created {
        println!("Allocated {} h to stage {}", row.allocated, row.stage);
    } else {
        println!(
            "Stage {} already has {} h allocated; unchanged",
            row.stage, row.allocated
        );
    }
    Ok(())
}

/// Log time.
pub fn cmd_log(
    config: &Config,
    json: bool,
    job_number: &str,
    hours: f64,
    stage: Option<RibaStage>,
    date: Option<NaiveDate>,
    description: Option<String>,
    logged_by: Option<String>,
) -> Result<(), StagebookError> {
    let hours = Hours::from_decimal(hours)?;
    let mut session = open(config)?;
    let project = project_by_job(&session, job_number)?;
    let entry = Timesheet::log_time(
        &mut session,
        NewTimeEntry {
            project: project.id,
            stage: stage.unwrap_or(project.current_stage),
            hours,
            logged_on: date.unwrap_or_else(|| chrono::Local::now().date_naive()),
            description,
            logged_by,
        },
    )?;

    if json {
        print_json(&TimeEntryJson::from(entry));
    } else {
        println!(
            "Logged {} h on {} against {} stage {}",
            entry.hours, entry.logged_on, project.job_number, entry.stage
        );
    }
    Ok(())
}

// =============================================================================
// ANALYTICS COMMANDS
// =============================================================================

/// Burn rate of one stage.
pub fn cmd_burn(
    config: &Config,
    json: bool,
    job_number: &str,
    stage: RibaStage,
) -> Result<(), StagebookError> {
    let session = open(config)?;
    let project = project_by_job(&session, job_number)?;
    let burn = Analytics::compute_stage_burn(&session, project.id, stage)?;

    if json {
        print_json(&StageBurnJson::from(burn));
        return Ok(());
    }

    println!("{} {} - Stage {}", project.job_number, project.name, burn.stage);
    println!("  Allocated: {} h", burn.allocated);
    println!("  Used:      {} h", burn.used);
    println!("  Remaining: {:.2} h", burn.remaining);
    println!("  Burn:      {:.1}%", burn.burn_percentage);
    println!("  Status:    {}", burn.status);
    Ok(())
}

/// Stage-by-stage performance of one project.
pub fn cmd_performance(config: &Config, json: bool, job_number: &str) -> Result<(), StagebookError> {
    let session = open(config)?;
    let project = project_by_job(&session, job_number)?;
    let perf = Analytics::compute_project_performance(&session, project.id)?;

    if json {
        print_json(&ProjectPerformanceJson::from(perf));
        return Ok(());
    }

    println!("{} {}", perf.job_number, perf.name);
    println!("Current stage: {}", perf.current_stage);
    println!();
    println!(
        "{:<34} {:>10} {:>10} {:>10} {:>8}  Status",
        "Stage", "Allocated", "Used", "Remaining", "Burn"
    );
    for row in &perf.stages {
        println!(
            "{:<34} {:>10} {:>10} {:>10.2} {:>8}  {}",
            row.stage.to_string(),
            row.allocated.to_string(),
            row.used.to_string(),
            row.remaining,
            burn_label(row.burn_percentage),
            row.status.map_or("-", |s| s.label())
        );
    }
    for (stage, used) in &perf.unallocated {
        println!("{:<34} {:>10} {:>10}  (no budget)", stage.to_string(), "-", used.to_string());
    }
    println!();
    println!(
        "Total: {} of {} h used, {} ({})",
        perf.total_used,
        perf.total_allocated,
        burn_label(perf.burn_percentage),
        perf.status.map_or("-", |s| s.label())
    );
    println!(
        "Stages at risk: {}, overrun: {}",
        perf.stages_at_risk, perf.stages_overrun
    );
    Ok(())
}

/// Burn and risk across projects.
pub fn cmd_portfolio(
    config: &Config,
    json: bool,
    job_numbers: &[String],
) -> Result<(), StagebookError> {
    let session = open(config)?;
    let summary = if job_numbers.is_empty() {
        Analytics::compute_active_portfolio(&session)?
    } else {
        let ids = job_numbers
            .iter()
            .map(|job| project_by_job(&session, job).map(|p| p.id))
            .collect::<Result<Vec<_>, _>>()?;
        Analytics::compute_portfolio_summary(&session, &ids)?
    };

    if json {
        print_json(&PortfolioResponse::from(summary));
        return Ok(());
    }
    if summary.is_empty() {
        println!("No projects to summarise");
        return Ok(());
    }

    for p in &summary.projects {
        println!(
            "{:<10} {:<30} {:>10} / {:>10} h {:>7.1}%  {}",
            p.job_number,
            p.name,
            p.used.to_string(),
            p.allocated.to_string(),
            p.burn_percentage,
            p.status
        );
    }
    let rollup = summary.rollup();
    println!();
    println!(
        "{} projects: {} on track, {} at risk, {} overrun",
        rollup.project_count, rollup.on_track, rollup.at_risk, rollup.overrun
    );
    if let Some(utilisation) = rollup.overall_utilisation {
        println!(
            "Utilisation: {utilisation:.1}% ({} of {} h)",
            rollup.total_used, rollup.total_allocated
        );
    }
    if !rollup.overrun_projects.is_empty() {
        println!("Overrun: {}", rollup.overrun_projects.join(", "));
    }
    if !rollup.at_risk_projects.is_empty() {
        println!("At risk: {}", rollup.at_risk_projects.join(", "));
    }
    Ok(())
}

// =============================================================================
// DIRECTORY COMMANDS
// =============================================================================

/// Add a contact to a project directory.
pub fn cmd_directory_add(
    config: &Config,
    json: bool,
    job_number: &str,
    contact: u64,
    role: ContactRole,
    notes: Option<String>,
) -> Result<(), StagebookError> {
    let mut session = open(config)?;
    let project = project_by_job(&session, job_number)?;
    let upsert = Directory::add_or_get_directory_entry(
        &mut session,
        project.id,
        ContactId(contact),
        role,
        notes.as_deref(),
    )?;
    let created = upsert.was_created();
    let entry = upsert.into_inner();

    if json {
        print_json(&entry);
    } else if created {
        println!("Added contact {} to {} as {}", entry.contact, project.job_number, entry.role);
    } else {
        println!(
            "Contact {} is already {} on {}",
            entry.contact, entry.role, project.job_number
        );
    }
    Ok(())
}

/// List a project's directory.
pub fn cmd_directory_list(
    config: &Config,
    json: bool,
    job_number: &str,
    role: Option<ContactRole>,
) -> Result<(), StagebookError> {
    let session = open(config)?;
    let project = project_by_job(&session, job_number)?;
    let entries = Directory::project_directory(&session, project.id, role, Visibility::ActiveOnly)?;

    if json {
        print_json(&entries);
        return Ok(());
    }

    println!("{} {} directory", project.job_number, project.name);
    for entry in &entries {
        // The contact may have been deactivated since it was added.
        let name = Registry::contact(&session, entry.contact)
            .map(|c| c.full_name())
            .unwrap_or_else(|_| format!("contact {} (inactive)", entry.contact));
        println!("  {:<20} {}", entry.role.label(), name);
    }
    Ok(())
}

// =============================================================================
// EXPORT / IMPORT
// =============================================================================

/// Export every table.
pub fn cmd_export(config: &Config, output: &Path, format: &str) -> Result<(), StagebookError> {
    let validated_output = validate_output_path(output)?;
    let session = open(config)?;
    let tables = session.export_tables()?;

    let data = match format {
        "snapshot" => {
            let data = snapshot_to_bytes(&tables)?;
            println!("Checksum: {}", snapshot_checksum(&data));
            println!("BLAKE3:   {}", snapshot_crypto_hash(&data));
            data
        }
        "json" => serde_json::to_vec_pretty(&tables)
            .map_err(|e| StagebookError::Serialization(e.to_string()))?,
        _ => {
            return Err(StagebookError::Validation(format!(
                "Unknown format: {}. Use: snapshot, json",
                format
            )));
        }
    };

    std::fs::write(&validated_output, &data)
        .map_err(|e| StagebookError::Storage(format!("Write file: {}", e)))?;

    println!(
        "Exported {} rows ({} bytes) to {:?}",
        tables.row_count(),
        data.len(),
        validated_output
    );
    Ok(())
}

/// Decode an exported file: snapshot bytes or JSON tables.
pub fn decode_export(data: &[u8]) -> Result<Tables, StagebookError> {
    if data.starts_with(MAGIC_BYTES) {
        return snapshot_from_bytes(data);
    }
    let tables: Tables = serde_json::from_slice(data)
        .map_err(|e| StagebookError::Serialization(format!("Could not parse export: {}", e)))?;
    tables.validate_keys()?;
    Ok(tables)
}

/// Replace the database contents from an export.
pub fn cmd_import(config: &Config, input: &Path, force: bool) -> Result<(), StagebookError> {
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_SNAPSHOT_SIZE as u64)?;

    let data = std::fs::read(&validated_path)
        .map_err(|e| StagebookError::Storage(format!("Read file: {}", e)))?;
    let tables = decode_export(&data)?;

    let mut session = open(config)?;
    if !force && session.export_tables()?.row_count() > 0 {
        return Err(StagebookError::Validation(
            "Database is not empty. Use --force to replace its contents.".to_string(),
        ));
    }

    let rows = tables.row_count();
    session.import_tables(tables)?;
    session.compact()?;
    tracing::info!(event = "snapshot_imported", rows);
    println!("Imported {} rows", rows);
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

//! # Backend Parity Tests
//!
//! Every scenario runs against both the in-memory store and a redb-backed
//! session; the two must behave identically.
//!
//! ## Groups
//! - directory: idempotent junction rows
//! - budgets: allocations and burn classification
//! - soft_delete: inactive rows kept for audit
//! - uniqueness: job numbers

use chrono::NaiveDate;
use stagebook_core::{
    Analytics, ContactFilter, ContactId, ContactRole, Directory, EntityKind, EntityStore, Hours,
    MemoryStore, NewContact, NewOrganisation, NewProject, NewTimeEntry, ProjectId, Registry,
    RibaStage, RiskStatus, Session, StageAllocation, StagebookError, TimeEntry, TimeEntryFilter,
    Timesheet, Visibility,
};
use tempfile::TempDir;

/// Run a scenario against both backends.
macro_rules! on_both_backends {
    ($name:ident, $scenario:path) => {
        mod $name {
            use super::*;

            #[test]
            fn memory() {
                let mut store = MemoryStore::new();
                $scenario(&mut store);
            }

            #[test]
            fn redb() {
                let temp = TempDir::new().expect("temp dir");
                let mut session =
                    Session::with_redb(temp.path().join("parity.redb")).expect("open db");
                $scenario(&mut session);
            }
        }
    };
}

// =============================================================================
// FIXTURES
// =============================================================================

fn project<S: EntityStore>(store: &mut S, job: &str) -> ProjectId {
    Registry::create_project(
        store,
        NewProject {
            job_number: job.to_string(),
            name: format!("Scheme {job}"),
            ..Default::default()
        },
    )
    .expect("project")
    .id
}

fn contact<S: EntityStore>(store: &mut S, first: &str, last: &str) -> ContactId {
    let org = Registry::create_organisation(
        store,
        NewOrganisation {
            name: "Calder & Finch".to_string(),
            ..Default::default()
        },
    )
    .expect("organisation");
    Registry::create_contact(
        store,
        NewContact {
            organisation: Some(org.id),
            first_name: first.to_string(),
            last_name: last.to_string(),
            ..Default::default()
        },
    )
    .expect("contact")
    .into_inner()
    .id
}

/// Log `total` whole hours in chunks no larger than one day.
fn log_hours<S: EntityStore>(store: &mut S, project: ProjectId, stage: RibaStage, total: u64) {
    let mut left = total;
    while left > 0 {
        let chunk = left.min(24);
        Timesheet::log_time(
            store,
            NewTimeEntry {
                project,
                stage,
                hours: Hours::whole(chunk),
                logged_on: NaiveDate::from_ymd_opt(2025, 2, 14).expect("date"),
                description: Some("site visit".to_string()),
                logged_by: Some("tester".to_string()),
            },
        )
        .expect("log");
        left -= chunk;
    }
}

// =============================================================================
// SCENARIOS
// =============================================================================

fn directory_add_twice_yields_one_row<S: EntityStore>(store: &mut S) {
    let p = project(store, "J-100");
    let c = contact(store, "Mina", "Okafor");

    let first = Directory::add_or_get_directory_entry(store, p, c, ContactRole::Engineer, None)
        .expect("first");
    let second = Directory::add_or_get_directory_entry(store, p, c, ContactRole::Engineer, None)
        .expect("second");

    assert!(first.was_created());
    assert!(!second.was_created());
    assert_eq!(first.row().id, second.row().id);
    let rows = Directory::project_directory(store, p, None, Visibility::ActiveOnly).expect("list");
    assert_eq!(rows.len(), 1);
}

fn classification_boundaries<S: EntityStore>(store: &mut S) {
    let cases = [
        (RibaStage::StrategicDefinition, 79, RiskStatus::OnTrack),
        (RibaStage::PreparationAndBriefing, 80, RiskStatus::AtRisk),
        (RibaStage::ConceptDesign, 100, RiskStatus::AtRisk),
        (RibaStage::SpatialCoordination, 101, RiskStatus::Overrun),
    ];
    let p = project(store, "J-200");

    for (stage, logged, expected) in cases {
        Timesheet::allocate(store, p, stage, Hours::whole(100)).expect("allocate");
        log_hours(store, p, stage, logged);
        let burn = Analytics::compute_stage_burn(store, p, stage).expect("burn");
        assert_eq!(burn.status, expected, "{logged} of 100 hours");
    }
}

fn allocation_twice_returns_existing<S: EntityStore>(store: &mut S) {
    let p = project(store, "J-300");

    let first = Timesheet::allocate(store, p, RibaStage::TechnicalDesign, Hours::whole(60))
        .expect("first")
        .into_inner();
    let second = Timesheet::allocate(store, p, RibaStage::TechnicalDesign, Hours::whole(90))
        .expect("second");

    assert!(!second.was_created());
    assert_eq!(second.into_inner(), first);
    assert_eq!(store.count::<StageAllocation>().expect("count"), 1);
}

fn soft_deleted_contact_keeps_history<S: EntityStore>(store: &mut S) {
    let p = project(store, "J-400");
    let c = contact(store, "Rhys", "Penn");
    Directory::add_or_get_directory_entry(store, p, c, ContactRole::ProjectManager, None)
        .expect("add");
    log_hours(store, p, RibaStage::ConceptDesign, 5);

    Registry::deactivate_contact(store, c).expect("deactivate");

    // Active view hides the contact, audit view still has it.
    let active = Registry::list_contacts(store, &ContactFilter::default()).expect("list");
    assert!(active.iter().all(|row| row.id != c));
    let audit = Registry::list_contacts(
        store,
        &ContactFilter {
            visibility: Visibility::IncludeInactive,
            ..Default::default()
        },
    )
    .expect("audit");
    assert!(audit.iter().any(|row| row.id == c && !row.is_active));

    // Junction and time rows survive.
    let directory =
        Directory::project_directory(store, p, None, Visibility::ActiveOnly).expect("directory");
    assert_eq!(directory.len(), 1);
    assert_eq!(directory[0].contact, c);
    let entries = Timesheet::time_entries(
        store,
        TimeEntryFilter {
            project: Some(p),
            stage: None,
        },
    )
    .expect("entries");
    assert_eq!(entries.len(), 1);
    assert_eq!(store.count::<TimeEntry>().expect("count"), 1);

    assert!(matches!(
        Registry::contact(store, c),
        Err(StagebookError::NotFound {
            kind: EntityKind::Contact,
            ..
        })
    ));
}

fn duplicate_job_number_rejected<S: EntityStore>(store: &mut S) {
    project(store, "J-500");
    let again = Registry::create_project(
        store,
        NewProject {
            job_number: "J-500".to_string(),
            name: "Second attempt".to_string(),
            ..Default::default()
        },
    );
    assert!(matches!(again, Err(StagebookError::Duplicate { .. })));
}

fn empty_portfolio<S: EntityStore>(store: &mut S) {
    project(store, "J-600");
    let summary = Analytics::compute_portfolio_summary(store, &[]).expect("summary");
    assert!(summary.is_empty());
}

fn ids_are_never_reused<S: EntityStore>(store: &mut S) {
    let first = project(store, "J-700");
    Registry::deactivate_project(store, first).expect("deactivate");
    let second = project(store, "J-701");
    assert!(second > first);
}

// =============================================================================
// TEST GROUPS
// =============================================================================

on_both_backends!(directory, directory_add_twice_yields_one_row);
on_both_backends!(budgets, classification_boundaries);
on_both_backends!(allocations, allocation_twice_returns_existing);
on_both_backends!(soft_delete, soft_deleted_contact_keeps_history);
on_both_backends!(uniqueness, duplicate_job_number_rejected);
on_both_backends!(portfolio, empty_portfolio);
on_both_backends!(identifiers, ids_are_never_reused);

// =============================================================================
// PERSISTENCE
// =============================================================================

mod persistence {
    use super::*;

    #[test]
    fn data_survives_reopen() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("reopen.redb");

        let p = {
            let mut session = Session::with_redb(&path).expect("open db");
            let p = project(&mut session, "J-800");
            Timesheet::allocate(&mut session, p, RibaStage::Handover, Hours::whole(10))
                .expect("allocate");
            log_hours(&mut session, p, RibaStage::Handover, 9);
            p
        };

        let session = Session::with_redb(&path).expect("reopen db");
        let burn =
            Analytics::compute_stage_burn(&session, p, RibaStage::Handover).expect("burn");
        assert_eq!(burn.used, Hours::whole(9));
        assert_eq!(burn.status, RiskStatus::AtRisk);
    }

    #[test]
    fn export_import_preserves_analytics() {
        let mut memory = Session::new();
        let p = project(&mut memory, "J-900");
        Timesheet::allocate(&mut memory, p, RibaStage::Use, Hours::whole(50)).expect("allocate");
        log_hours(&mut memory, p, RibaStage::Use, 30);

        let bytes = stagebook_core::snapshot_to_bytes(&memory.export_tables().expect("export"))
            .expect("encode");
        let tables = stagebook_core::snapshot_from_bytes(&bytes).expect("decode");

        let temp = TempDir::new().expect("temp dir");
        let mut restored = Session::with_redb(temp.path().join("import.redb")).expect("open db");
        restored.import_tables(tables).expect("import");

        let before = Analytics::compute_portfolio_summary(&memory, &[p]).expect("before");
        let after = Analytics::compute_portfolio_summary(&restored, &[p]).expect("after");
        assert_eq!(before, after);
    }
}

//! # Property-Based Tests
//!
//! Idempotence, monotonicity and determinism invariants checked with proptest.

use chrono::NaiveDate;
use proptest::collection::vec;
use proptest::prelude::*;
use stagebook_core::{
    Analytics, ContactRole, Directory, EntityStore, Hours, MemoryStore, NewContact, NewProject,
    NewTimeEntry, ProjectId, Registry, RibaStage, RiskStatus, StageAllocation, Timesheet,
    Visibility,
};

fn project(store: &mut MemoryStore, job: &str) -> ProjectId {
    Registry::create_project(
        store,
        NewProject {
            job_number: job.to_string(),
            name: "Property".to_string(),
            ..Default::default()
        },
    )
    .expect("project")
    .id
}

fn log(store: &mut MemoryStore, project: ProjectId, stage: RibaStage, hundredths: u64) {
    Timesheet::log_time(
        store,
        NewTimeEntry {
            project,
            stage,
            hours: Hours::from_hundredths(hundredths),
            logged_on: NaiveDate::from_ymd_opt(2025, 1, 1).expect("date"),
            description: None,
            logged_by: None,
        },
    )
    .expect("log");
}

fn any_stage() -> impl Strategy<Value = RibaStage> {
    (0u8..8).prop_map(|n| RibaStage::try_from(n).expect("stage in range"))
}

fn any_role() -> impl Strategy<Value = ContactRole> {
    (0usize..ContactRole::ALL.len()).prop_map(|i| ContactRole::ALL[i])
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Adding the same directory triple any number of times leaves one row.
    #[test]
    fn directory_add_is_idempotent(role in any_role(), repeats in 1usize..6) {
        let mut store = MemoryStore::new();
        let p = project(&mut store, "J-1");
        let contact = Registry::create_contact(
            &mut store,
            NewContact {
                first_name: "Ada".to_string(),
                last_name: "Reyes".to_string(),
                ..Default::default()
            },
        )
        .expect("contact")
        .into_inner()
        .id;

        let mut ids = Vec::new();
        for _ in 0..repeats {
            let row = Directory::add_or_get_directory_entry(&mut store, p, contact, role, None)
                .expect("add")
                .into_inner();
            ids.push(row.id);
        }

        ids.dedup();
        prop_assert_eq!(ids.len(), 1);
        let rows = Directory::project_directory(&store, p, None, Visibility::ActiveOnly)
            .expect("list");
        prop_assert_eq!(rows.len(), 1);
    }

    /// Allocating the same (project, stage) twice returns the first row.
    #[test]
    fn allocation_is_idempotent(stage in any_stage(), first in 0u64..5000, second in 0u64..5000) {
        let mut store = MemoryStore::new();
        let p = project(&mut store, "J-1");

        let a = Timesheet::allocate(&mut store, p, stage, Hours::whole(first)).expect("first");
        let b = Timesheet::allocate(&mut store, p, stage, Hours::whole(second)).expect("second");

        prop_assert_eq!(a.row(), b.row());
        prop_assert_eq!(store.count::<StageAllocation>().expect("count"), 1);
    }

    /// Burn percentage strictly increases as hours are logged.
    #[test]
    fn burn_strictly_increases(
        allocated in 1u64..2000,
        entries in vec(1u64..=2400, 1..30)
    ) {
        let mut store = MemoryStore::new();
        let p = project(&mut store, "J-1");
        let stage = RibaStage::TechnicalDesign;
        Timesheet::allocate(&mut store, p, stage, Hours::whole(allocated)).expect("allocate");

        let mut previous = Analytics::compute_stage_burn(&store, p, stage)
            .expect("burn")
            .burn_percentage;
        for hundredths in entries {
            log(&mut store, p, stage, hundredths);
            let burn = Analytics::compute_stage_burn(&store, p, stage)
                .expect("burn")
                .burn_percentage;
            prop_assert!(burn > previous, "{} should exceed {}", burn, previous);
            previous = burn;
        }
    }

    /// Classification never moves back towards "On Track" as hours grow.
    #[test]
    fn status_is_monotonic(allocated in 1u64..500, entries in vec(1u64..=2400, 1..30)) {
        let mut store = MemoryStore::new();
        let p = project(&mut store, "J-1");
        let stage = RibaStage::ConceptDesign;
        Timesheet::allocate(&mut store, p, stage, Hours::whole(allocated)).expect("allocate");

        let mut previous = RiskStatus::OnTrack;
        for hundredths in entries {
            log(&mut store, p, stage, hundredths);
            let status = Analytics::compute_stage_burn(&store, p, stage).expect("burn").status;
            prop_assert!(status >= previous);
            previous = status;
        }
    }

    /// Portfolio output follows input order regardless of id order.
    #[test]
    fn portfolio_preserves_order(order in Just(vec![0usize, 1, 2]).prop_shuffle()) {
        let mut store = MemoryStore::new();
        let ids: Vec<ProjectId> = (0..3)
            .map(|i| {
                let p = project(&mut store, &format!("J-{i}"));
                Timesheet::allocate(&mut store, p, RibaStage::Use, Hours::whole(10))
                    .expect("allocate");
                p
            })
            .collect();

        let requested: Vec<ProjectId> = order.iter().map(|&i| ids[i]).collect();
        let summary = Analytics::compute_portfolio_summary(&store, &requested).expect("summary");
        let returned: Vec<ProjectId> = summary.projects.iter().map(|p| p.project).collect();
        prop_assert_eq!(returned, requested);
    }

    /// Hour sums do not depend on logging order.
    #[test]
    fn hour_sums_are_order_independent(entries in vec(1u64..=2400, 1..20)) {
        let mut forward = MemoryStore::new();
        let mut backward = MemoryStore::new();
        let pf = project(&mut forward, "J-1");
        let pb = project(&mut backward, "J-1");

        for &h in &entries {
            log(&mut forward, pf, RibaStage::Handover, h);
        }
        for &h in entries.iter().rev() {
            log(&mut backward, pb, RibaStage::Handover, h);
        }

        prop_assert_eq!(
            Timesheet::hours_logged(&forward, pf, RibaStage::Handover).expect("sum"),
            Timesheet::hours_logged(&backward, pb, RibaStage::Handover).expect("sum")
        );
    }
}

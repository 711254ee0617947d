//! # CSV Reports
//!
//! Spreadsheet downloads of a project's directory and stage analytics.
//! Rows are rendered with the `csv` crate into an in-memory buffer.

use stagebook_core::{
    Contact, Directory, EntityStore, Hours, Organisation, Project, ProjectPerformance, RibaStage,
    StagebookError, Visibility,
};

const DIRECTORY_HEADER: [&str; 7] = [
    "Name",
    "Organisation",
    "Role",
    "Email",
    "Phone",
    "Job Title",
    "Notes",
];

const ANALYTICS_HEADER: [&str; 7] = [
    "Stage",
    "Stage Name",
    "Allocated Hours",
    "Used Hours",
    "Remaining Hours",
    "Burn Rate (%)",
    "Status",
];

fn csv_error(e: csv::Error) -> StagebookError {
    StagebookError::Serialization(format!("CSV write failed: {}", e))
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, StagebookError> {
    writer
        .into_inner()
        .map_err(|e| StagebookError::Serialization(format!("CSV flush failed: {}", e.error())))
}

/// `attachment` disposition with a file name safe to put in a header.
pub fn attachment(job_number: &str, report: &str, today: chrono::NaiveDate) -> String {
    let job: String = job_number
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{}_{}_{}.csv\"",
        job,
        report,
        today.format("%Y%m%d")
    )
}

/// Active directory rows of a project, one contact per line.
///
/// Contacts and organisations deactivated since the entry was made are
/// still named.
pub fn directory_csv<S: EntityStore>(
    store: &S,
    project: &Project,
) -> Result<Vec<u8>, StagebookError> {
    let entries =
        Directory::project_directory(store, project.id, None, Visibility::ActiveOnly)?;

    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(DIRECTORY_HEADER).map_err(csv_error)?;
    for entry in entries {
        let contact: Option<Contact> = store.get(entry.contact.0)?;
        let organisation: Option<Organisation> =
            match contact.as_ref().and_then(|c| c.organisation) {
                Some(id) => store.get(id.0)?,
                None => None,
            };
        let text = |value: Option<&String>| value.cloned().unwrap_or_default();

        writer
            .write_record([
                contact.as_ref().map_or_else(|| "Unknown".to_string(), Contact::full_name),
                organisation.map(|o| o.name).unwrap_or_default(),
                entry.role.label().to_string(),
                text(contact.as_ref().and_then(|c| c.email.as_ref())),
                text(contact.as_ref().and_then(|c| c.phone.as_ref())),
                text(contact.as_ref().and_then(|c| c.job_title.as_ref())),
                text(entry.notes.as_ref()),
            ])
            .map_err(csv_error)?;
    }
    finish(writer)
}

/// One line per stage with allocated or logged hours, in stage order.
///
/// Burn and status are blank where the stage has no allocated hours.
pub fn analytics_csv(performance: &ProjectPerformance) -> Result<Vec<u8>, StagebookError> {
    let mut rows: Vec<(RibaStage, [String; 5])> = performance
        .stages
        .iter()
        .map(|s| {
            (
                s.stage,
                [
                    s.allocated.to_string(),
                    s.used.to_string(),
                    format!("{:.2}", s.remaining),
                    s.burn_percentage.map(|p| format!("{:.1}", p)).unwrap_or_default(),
                    s.status.map(|r| r.label().to_string()).unwrap_or_default(),
                ],
            )
        })
        .collect();
    rows.extend(performance.unallocated.iter().map(|(stage, used)| {
        (
            *stage,
            [
                Hours::default().to_string(),
                used.to_string(),
                format!("-{}", used),
                String::new(),
                "Unallocated".to_string(),
            ],
        )
    }));
    rows.sort_by_key(|(stage, _)| *stage);

    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(ANALYTICS_HEADER).map_err(csv_error)?;
    for (stage, [allocated, used, remaining, burn, status]) in rows {
        writer
            .write_record([
                stage.number().to_string(),
                stage.name().to_string(),
                allocated,
                used,
                remaining,
                burn,
                status,
            ])
            .map_err(csv_error)?;
    }
    finish(writer)
}

//! # Registry Module
//!
//! Create, read, update and soft-delete for organisations, contacts and
//! projects.
//!
//! - Reads by id return active rows only; inactive rows are `NotFound`
//! - List queries hide inactive rows unless asked for an audit view
//! - Contacts are created idempotently
//! - Project job numbers are unique across every row ever created

use crate::primitives::{
    MAX_JOB_NUMBER_LENGTH, MAX_NAME_LENGTH, MAX_PERSON_NAME_LENGTH, MAX_TEXT_LENGTH,
};
use crate::store::{EntityStore, Upsert};
use crate::validate::{contains_folded, optional, required, search_term};
use crate::{
    Contact, ContactId, EntityKind, Organisation, OrganisationId, Project, ProjectId,
    ProjectStatus, RibaStage, StagebookError, Visibility,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Country used when an organisation is created without one.
pub const DEFAULT_COUNTRY: &str = "United Kingdom";

/// Short free-text fields (phone, email, address lines, ...).
const MAX_FIELD_LENGTH: usize = 255;

// =============================================================================
// DRAFTS AND PATCHES
// =============================================================================

/// Input for creating an organisation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewOrganisation {
    pub name: String,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
}

/// Partial update for an organisation. `None` leaves a field unchanged;
/// a blank string clears an optional field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganisationPatch {
    pub name: Option<String>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
}

/// Input for creating a contact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewContact {
    pub organisation: Option<OrganisationId>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
}

/// Partial update for a contact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactPatch {
    pub organisation: Option<OrganisationId>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
}

/// Input for creating a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewProject {
    pub job_number: String,
    pub name: String,
    pub description: Option<String>,
    pub client: Option<OrganisationId>,
    pub current_stage: Option<RibaStage>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<NaiveDate>,
    pub target_completion: Option<NaiveDate>,
}

/// Partial update for a project. The job number is immutable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub client: Option<OrganisationId>,
    pub current_stage: Option<RibaStage>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<NaiveDate>,
    pub target_completion: Option<NaiveDate>,
}

// =============================================================================
// FILTERS
// =============================================================================

/// Organisation list query.
#[derive(Debug, Clone, Default)]
pub struct OrganisationFilter {
    /// Case-insensitive substring of the name.
    pub search: Option<String>,
    pub visibility: Visibility,
}

/// Contact list query.
#[derive(Debug, Clone, Default)]
pub struct ContactFilter {
    pub organisation: Option<OrganisationId>,
    /// Case-insensitive substring of first name, last name or email.
    pub search: Option<String>,
    pub visibility: Visibility,
}

/// Project list query.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub stage: Option<RibaStage>,
    pub visibility: Visibility,
}

// =============================================================================
// REGISTRY
// =============================================================================

/// CRUD operations over the organisation, contact and project tables.
pub struct Registry;

impl Registry {
    // -------------------------------------------------------------------------
    // Organisations
    // -------------------------------------------------------------------------

    /// Create an organisation. Names need not be unique.
    pub fn create_organisation<S: EntityStore>(
        store: &mut S,
        draft: NewOrganisation,
    ) -> Result<Organisation, StagebookError> {
        let name = required("organisation name", &draft.name, MAX_NAME_LENGTH)?;
        let address_line_1 = optional("address line 1", draft.address_line_1.as_deref(), MAX_FIELD_LENGTH)?;
        let address_line_2 = optional("address line 2", draft.address_line_2.as_deref(), MAX_FIELD_LENGTH)?;
        let city = optional("city", draft.city.as_deref(), MAX_FIELD_LENGTH)?;
        let postcode = optional("postcode", draft.postcode.as_deref(), MAX_FIELD_LENGTH)?;
        let country = optional("country", draft.country.as_deref(), MAX_FIELD_LENGTH)?
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string());
        let phone = optional("phone", draft.phone.as_deref(), MAX_FIELD_LENGTH)?;
        let email = optional("email", draft.email.as_deref(), MAX_FIELD_LENGTH)?;
        let website = optional("website", draft.website.as_deref(), MAX_FIELD_LENGTH)?;

        store.insert(|id| Organisation {
            id: OrganisationId(id),
            name,
            address_line_1,
            address_line_2,
            city,
            postcode,
            country,
            phone,
            email,
            website,
            is_active: true,
        })
    }

    /// Fetch an active organisation.
    pub fn organisation<S: EntityStore>(
        store: &S,
        id: OrganisationId,
    ) -> Result<Organisation, StagebookError> {
        store.get_active(id.0)
    }

    /// Apply a partial update to an active organisation.
    pub fn update_organisation<S: EntityStore>(
        store: &mut S,
        id: OrganisationId,
        patch: OrganisationPatch,
    ) -> Result<Organisation, StagebookError> {
        store.update::<Organisation>(id.0, |org| {
            ensure_active(org.is_active, EntityKind::Organisation, id.0)?;
            if let Some(name) = &patch.name {
                org.name = required("organisation name", name, MAX_NAME_LENGTH)?;
            }
            patch_optional(&mut org.address_line_1, "address line 1", patch.address_line_1.as_deref())?;
            patch_optional(&mut org.address_line_2, "address line 2", patch.address_line_2.as_deref())?;
            patch_optional(&mut org.city, "city", patch.city.as_deref())?;
            patch_optional(&mut org.postcode, "postcode", patch.postcode.as_deref())?;
            if let Some(country) = &patch.country {
                org.country = optional("country", Some(country), MAX_FIELD_LENGTH)?
                    .unwrap_or_else(|| DEFAULT_COUNTRY.to_string());
            }
            patch_optional(&mut org.phone, "phone", patch.phone.as_deref())?;
            patch_optional(&mut org.email, "email", patch.email.as_deref())?;
            patch_optional(&mut org.website, "website", patch.website.as_deref())?;
            Ok(())
        })
    }

    /// Soft-delete an organisation. Its contacts keep their (now weak) link.
    pub fn deactivate_organisation<S: EntityStore>(
        store: &mut S,
        id: OrganisationId,
    ) -> Result<Organisation, StagebookError> {
        store.deactivate(id.0)
    }

    /// List organisations ordered by name.
    pub fn list_organisations<S: EntityStore>(
        store: &S,
        filter: &OrganisationFilter,
    ) -> Result<Vec<Organisation>, StagebookError> {
        let search = search_term(filter.search.as_deref());
        let mut rows = store.select::<Organisation>(filter.visibility, |org| {
            search
                .as_deref()
                .is_none_or(|term| contains_folded(&org.name, term))
        })?;
        rows.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    // -------------------------------------------------------------------------
    // Contacts
    // -------------------------------------------------------------------------

    /// Create a contact, or return the active contact with the same
    /// organisation, name and email.
    ///
    /// Names and email are compared case-insensitively.
    pub fn create_contact<S: EntityStore>(
        store: &mut S,
        draft: NewContact,
    ) -> Result<Upsert<Contact>, StagebookError> {
        let first_name = required("first name", &draft.first_name, MAX_PERSON_NAME_LENGTH)?;
        let last_name = required("last name", &draft.last_name, MAX_PERSON_NAME_LENGTH)?;
        let email = optional("email", draft.email.as_deref(), MAX_FIELD_LENGTH)?;
        let phone = optional("phone", draft.phone.as_deref(), MAX_FIELD_LENGTH)?;
        let job_title = optional("job title", draft.job_title.as_deref(), MAX_FIELD_LENGTH)?;

        if let Some(org) = draft.organisation {
            Self::organisation(store, org)?;
        }

        let organisation = draft.organisation;
        let key_first = first_name.to_lowercase();
        let key_last = last_name.to_lowercase();
        let key_email = email.as_deref().map(str::to_lowercase);

        store.insert_unique(
            |c: &Contact| {
                c.is_active
                    && c.organisation == organisation
                    && c.first_name.to_lowercase() == key_first
                    && c.last_name.to_lowercase() == key_last
                    && c.email.as_deref().map(str::to_lowercase) == key_email
            },
            |id| Contact {
                id: ContactId(id),
                organisation,
                first_name,
                last_name,
                email,
                phone,
                job_title,
                is_active: true,
            },
        )
    }

    /// Fetch an active contact.
    pub fn contact<S: EntityStore>(store: &S, id: ContactId) -> Result<Contact, StagebookError> {
        store.get_active(id.0)
    }

    /// Apply a partial update to an active contact.
    ///
    /// Contacts are global, so the change is visible from every project
    /// directory that references them.
    pub fn update_contact<S: EntityStore>(
        store: &mut S,
        id: ContactId,
        patch: ContactPatch,
    ) -> Result<Contact, StagebookError> {
        if let Some(org) = patch.organisation {
            Self::organisation(store, org)?;
        }

        store.update::<Contact>(id.0, |contact| {
            ensure_active(contact.is_active, EntityKind::Contact, id.0)?;
            if let Some(org) = patch.organisation {
                contact.organisation = Some(org);
            }
            if let Some(first) = &patch.first_name {
                contact.first_name = required("first name", first, MAX_PERSON_NAME_LENGTH)?;
            }
            if let Some(last) = &patch.last_name {
                contact.last_name = required("last name", last, MAX_PERSON_NAME_LENGTH)?;
            }
            patch_optional(&mut contact.email, "email", patch.email.as_deref())?;
            patch_optional(&mut contact.phone, "phone", patch.phone.as_deref())?;
            patch_optional(&mut contact.job_title, "job title", patch.job_title.as_deref())?;
            Ok(())
        })
    }

    /// Soft-delete a contact. Directory rows and time entries are untouched.
    pub fn deactivate_contact<S: EntityStore>(
        store: &mut S,
        id: ContactId,
    ) -> Result<Contact, StagebookError> {
        store.deactivate(id.0)
    }

    /// List contacts ordered by last name, then first name.
    pub fn list_contacts<S: EntityStore>(
        store: &S,
        filter: &ContactFilter,
    ) -> Result<Vec<Contact>, StagebookError> {
        let search = search_term(filter.search.as_deref());
        let mut rows = store.select::<Contact>(filter.visibility, |c| {
            filter.organisation.is_none_or(|org| c.organisation == Some(org))
                && search.as_deref().is_none_or(|term| {
                    contains_folded(&c.first_name, term)
                        || contains_folded(&c.last_name, term)
                        || c.email.as_deref().is_some_and(|e| contains_folded(e, term))
                })
        })?;
        rows.sort_by(|a, b| {
            a.last_name
                .to_lowercase()
                .cmp(&b.last_name.to_lowercase())
                .then_with(|| a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()))
                .then(a.id.cmp(&b.id))
        });
        Ok(rows)
    }

    // -------------------------------------------------------------------------
    // Projects
    // -------------------------------------------------------------------------

    /// Create a project.
    ///
    /// Fails with `Duplicate` if any project, active or not, already uses the
    /// job number.
    pub fn create_project<S: EntityStore>(
        store: &mut S,
        draft: NewProject,
    ) -> Result<Project, StagebookError> {
        let job_number = required("job number", &draft.job_number, MAX_JOB_NUMBER_LENGTH)?;
        let name = required("project name", &draft.name, MAX_NAME_LENGTH)?;
        let description = optional("description", draft.description.as_deref(), MAX_TEXT_LENGTH)?;
        check_dates(draft.start_date, draft.target_completion)?;
        if let Some(client) = draft.client {
            Self::organisation(store, client)?;
        }

        let wanted = job_number.clone();
        let outcome = store.insert_unique(
            |p: &Project| p.job_number == wanted,
            |id| Project {
                id: ProjectId(id),
                job_number,
                name,
                description,
                client: draft.client,
                current_stage: draft.current_stage.unwrap_or(RibaStage::StrategicDefinition),
                status: draft.status.unwrap_or_default(),
                start_date: draft.start_date,
                target_completion: draft.target_completion,
                is_active: true,
            },
        )?;

        match outcome {
            Upsert::Created(project) => Ok(project),
            Upsert::Existing(existing) => Err(StagebookError::Duplicate {
                kind: EntityKind::Project,
                detail: format!(
                    "job number '{}' already used by project {}",
                    existing.job_number, existing.id
                ),
            }),
        }
    }

    /// Fetch an active project.
    pub fn project<S: EntityStore>(store: &S, id: ProjectId) -> Result<Project, StagebookError> {
        store.get_active(id.0)
    }

    /// Look up an active project by its job number.
    pub fn project_by_job_number<S: EntityStore>(
        store: &S,
        job_number: &str,
    ) -> Result<Option<Project>, StagebookError> {
        let wanted = job_number.trim();
        Ok(store
            .select::<Project>(Visibility::ActiveOnly, |p| p.job_number == wanted)?
            .into_iter()
            .next())
    }

    /// Apply a partial update to an active project.
    pub fn update_project<S: EntityStore>(
        store: &mut S,
        id: ProjectId,
        patch: ProjectPatch,
    ) -> Result<Project, StagebookError> {
        if let Some(client) = patch.client {
            Self::organisation(store, client)?;
        }

        store.update::<Project>(id.0, |project| {
            ensure_active(project.is_active, EntityKind::Project, id.0)?;
            if let Some(name) = &patch.name {
                project.name = required("project name", name, MAX_NAME_LENGTH)?;
            }
            if let Some(description) = &patch.description {
                project.description = optional("description", Some(description), MAX_TEXT_LENGTH)?;
            }
            if let Some(client) = patch.client {
                project.client = Some(client);
            }
            if let Some(stage) = patch.current_stage {
                project.current_stage = stage;
            }
            if let Some(status) = patch.status {
                project.status = status;
            }
            if let Some(start) = patch.start_date {
                project.start_date = Some(start);
            }
            if let Some(target) = patch.target_completion {
                project.target_completion = Some(target);
            }
            check_dates(project.start_date, project.target_completion)
        })
    }

    /// Soft-delete a project. Allocations, time entries and directory rows
    /// are kept for audit.
    pub fn deactivate_project<S: EntityStore>(
        store: &mut S,
        id: ProjectId,
    ) -> Result<Project, StagebookError> {
        store.deactivate(id.0)
    }

    /// List projects ordered by job number.
    pub fn list_projects<S: EntityStore>(
        store: &S,
        filter: &ProjectFilter,
    ) -> Result<Vec<Project>, StagebookError> {
        let mut rows = store.select::<Project>(filter.visibility, |p| {
            filter.status.is_none_or(|s| p.status == s)
                && filter.stage.is_none_or(|s| p.current_stage == s)
        })?;
        rows.sort_by(|a, b| a.job_number.cmp(&b.job_number));
        Ok(rows)
    }
}

fn ensure_active(is_active: bool, kind: EntityKind, id: u64) -> Result<(), StagebookError> {
    if is_active {
        Ok(())
    } else {
        Err(StagebookError::not_found(kind, id))
    }
}

fn patch_optional(
    slot: &mut Option<String>,
    field: &str,
    value: Option<&str>,
) -> Result<(), StagebookError> {
    if value.is_some() {
        *slot = optional(field, value, MAX_FIELD_LENGTH)?;
    }
    Ok(())
}

fn check_dates(start: Option<NaiveDate>, target: Option<NaiveDate>) -> Result<(), StagebookError> {
    match (start, target) {
        (Some(start), Some(target)) if target < start => Err(StagebookError::Validation(format!(
            "target completion {target} is before start date {start}"
        ))),
        _ => Ok(()),
    }
}

// =============================================================================
// TESTS
// =============================================================================

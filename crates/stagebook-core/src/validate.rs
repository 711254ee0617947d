//! Input validation shared by the registry, timesheet and directory.

use crate::StagebookError;

/// Trim and check a required text field.
pub(crate) fn required(field: &str, value: &str, max: usize) -> Result<String, StagebookError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StagebookError::Validation(format!("{field} must not be empty")));
    }
    check_length(field, trimmed, max)?;
    Ok(trimmed.to_string())
}

/// Trim an optional text field; blank input becomes `None`.
pub(crate) fn optional(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, StagebookError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(trimmed) => {
            check_length(field, trimmed, max)?;
            Ok(Some(trimmed.to_string()))
        }
    }
}

fn check_length(field: &str, value: &str, max: usize) -> Result<(), StagebookError> {
    let len = value.chars().count();
    if len > max {
        return Err(StagebookError::Validation(format!(
            "{field} must be at most {max} characters (got {len})"
        )));
    }
    Ok(())
}

/// Case-insensitive substring match.
pub(crate) fn contains_folded(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Lower-cased, trimmed search term, or `None` when blank.
pub(crate) fn search_term(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

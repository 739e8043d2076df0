//! Validation rules for machines and machine collections.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Collection names are limited to ASCII letters, digits and hyphens.
const COLLECTION_NAME_PATTERN: &str = r"^[A-Za-z0-9\-]+$";

static COLLECTION_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(COLLECTION_NAME_PATTERN).expect("valid regex"));

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_SERIAL_LEN: usize = 100;

pub fn validate_collection_name(name: &str) -> Result<(), CoreError> {
    if name.len() > MAX_NAME_LEN || !COLLECTION_NAME_RE.is_match(name) {
        return Err(CoreError::Validation(format!(
            "Collection name '{name}' may only contain letters, digits and hyphens \
             (max {MAX_NAME_LEN} characters)"
        )));
    }
    Ok(())
}

/// Check the user-supplied fields of a new machine.
pub fn validate_machine_fields(
    name: &str,
    serial_number: &str,
    importance: i32,
) -> Result<(), CoreError> {
    if name.trim().is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Machine name must be 1-{MAX_NAME_LEN} characters"
        )));
    }
    if serial_number.trim().is_empty() || serial_number.chars().count() > MAX_SERIAL_LEN {
        return Err(CoreError::Validation(format!(
            "Serial number must be 1-{MAX_SERIAL_LEN} characters"
        )));
    }
    if importance < 0 {
        return Err(CoreError::Validation(
            "Importance must not be negative".to_string(),
        ));
    }
    Ok(())
}

//! Warning severities and text validation.

use crate::error::CoreError;
use crate::roles::Role;
use crate::text_enum::text_enum;

/// Maximum length of a warning's text, in characters.
pub const MAX_WARNING_TEXT_LEN: usize = 255;

text_enum! {
    pub enum WarningSeverity {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
    }
}

impl Default for WarningSeverity {
    fn default() -> Self {
        WarningSeverity::Medium
    }
}

/// Trim warning text and check it is non-empty and within
/// [`MAX_WARNING_TEXT_LEN`].
///
/// Idempotent creation compares the normalized text, so `"  Hot "` and
/// `"Hot"` refer to the same active warning.
pub fn normalize_warning_text(text: &str) -> Result<String, CoreError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Warning text must not be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_WARNING_TEXT_LEN {
        return Err(CoreError::Validation(format!(
            "Warning text must be at most {MAX_WARNING_TEXT_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Any maintenance staff member may raise a warning.
pub fn authorize_raise(role: Role) -> Result<(), CoreError> {
    if role.is_staff() {
        Ok(())
    } else {
        Err(CoreError::PermissionDenied(format!(
            "Role '{role}' may not raise warnings"
        )))
    }
}

/// Clearing warnings is repair work, matching who may report a machine `OK`.
pub fn authorize_resolve(role: Role) -> Result<(), CoreError> {
    match role {
        Role::Repair | Role::Manager => Ok(()),
        _ => Err(CoreError::PermissionDenied(format!(
            "Role '{role}' may not resolve warnings"
        ))),
    }
}

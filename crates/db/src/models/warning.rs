//! Warning entity model.

use millwright_core::types::{DbId, Timestamp};
use millwright_core::warning::WarningSeverity;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `warnings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Warning {
    pub id: DbId,
    pub machine_id: DbId,
    pub text: String,
    #[sqlx(try_from = "String")]
    pub severity: WarningSeverity,
    pub active: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub resolved_by: Option<DbId>,
    pub resolved_at: Option<Timestamp>,
    pub resolution_note: Option<String>,
    pub auto_resolution: bool,
}

/// Filters for listing a machine's warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct WarningFilter {
    pub active_only: bool,
    pub severity: Option<WarningSeverity>,
}

/// How a warning (or a batch of warnings) is being resolved.
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    pub resolved_by: DbId,
    pub note: Option<&'a str>,
    /// Set when the resolution was triggered by a status report rather than
    /// by someone resolving the warning directly.
    pub auto: bool,
}

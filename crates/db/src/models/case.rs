//! Case entity models, audit rows and statistics rows.

use millwright_core::case_workflow::{CasePriority, CaseStatus};
use millwright_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `cases` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Case {
    pub id: DbId,
    pub case_number: String,
    pub machine_id: DbId,
    pub title: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub status: CaseStatus,
    #[sqlx(try_from = "String")]
    pub priority: CasePriority,
    pub created_by: Option<DbId>,
    pub assigned_to: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
    pub closed_at: Option<Timestamp>,
}

/// DTO for opening a case.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCase {
    pub machine_id: DbId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: CasePriority,
    pub assigned_to: Option<DbId>,
}

/// Filters for listing cases.
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub status: Option<CaseStatus>,
    pub machine_id: Option<DbId>,
}

/// An open case with the importance of its machine, for priority ordering.
#[derive(Debug, Clone, FromRow)]
pub struct OpenCaseCandidate {
    #[sqlx(flatten)]
    pub case: Case,
    pub machine_importance: i32,
}

/// A case joined with the names a report shows in place of ids.
#[derive(Debug, Clone, FromRow)]
pub struct CaseReportRow {
    #[sqlx(flatten)]
    pub case: Case,
    pub machine_name: String,
    pub created_by_name: Option<String>,
    pub assigned_to_name: Option<String>,
}

/// A row from the `case_status_changes` table. Append-only.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CaseStatusChange {
    pub id: DbId,
    pub case_id: DbId,
    #[sqlx(try_from = "String")]
    pub previous_status: CaseStatus,
    #[sqlx(try_from = "String")]
    pub new_status: CaseStatus,
    pub changed_by: Option<DbId>,
    pub changed_at: Timestamp,
}

/// A row from the `case_assignment_history` table. Append-only.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CaseAssignmentChange {
    pub id: DbId,
    pub case_id: DbId,
    pub previous_assignee: Option<DbId>,
    pub new_assignee: Option<DbId>,
    pub changed_by: Option<DbId>,
    pub changed_at: Timestamp,
}

/// A row from the `case_comments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CaseComment {
    pub id: DbId,
    pub case_id: DbId,
    pub author_id: Option<DbId>,
    pub text: String,
    pub created_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Bounds for case statistics. `from` is inclusive, `to` exclusive, both on
/// `created_at`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsWindow {
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub machine_id: Option<DbId>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CaseStatusCount {
    #[sqlx(try_from = "String")]
    pub status: CaseStatus,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CasePriorityCount {
    #[sqlx(try_from = "String")]
    pub priority: CasePriority,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MachineCaseCount {
    pub machine_id: DbId,
    pub machine_name: String,
    pub case_count: i64,
}

//! Case lifecycle state machine and the single role-permission table that
//! gates every status transition.
//!
//! Everything here is pure: the engine in `millwright-api` loads the case,
//! asks [`authorize_transition`] whether the acting user may move it, and
//! only then writes.

use chrono::{Datelike, Timelike};

use crate::error::CoreError;
use crate::roles::Role;
use crate::text_enum::text_enum;
use crate::types::{DbId, Timestamp};

text_enum! {
    /// Lifecycle status of a case.
    pub enum CaseStatus {
        Open => "OPEN",
        InProgress => "IN_PROGRESS",
        Resolved => "RESOLVED",
        /// Terminal.
        Closed => "CLOSED",
    }
}

text_enum! {
    /// Urgency of a case.
    pub enum CasePriority {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        Critical => "CRITICAL",
    }
}

impl Default for CasePriority {
    fn default() -> Self {
        CasePriority::Medium
    }
}

impl CaseStatus {
    /// Statuses reachable from `self` in one step.
    pub fn allowed_targets(self) -> &'static [CaseStatus] {
        match self {
            CaseStatus::Open => &[CaseStatus::InProgress, CaseStatus::Closed],
            CaseStatus::InProgress => &[CaseStatus::Resolved, CaseStatus::Open],
            CaseStatus::Resolved => &[CaseStatus::Closed, CaseStatus::InProgress],
            CaseStatus::Closed => &[],
        }
    }
}

/// Whether `to` is reachable from `from` in a single transition.
pub fn can_transition(from: CaseStatus, to: CaseStatus) -> bool {
    from.allowed_targets().contains(&to)
}

/// Roles allowed to perform the `(from, to)` edge, excluding the manager
/// override. Empty for edges that are not in the transition table.
pub fn allowed_roles(from: CaseStatus, to: CaseStatus) -> &'static [Role] {
    use CaseStatus::*;
    match (from, to) {
        (Open, InProgress) => &[Role::Repair, Role::Manager],
        (Open, Closed) => &[Role::Manager],
        (InProgress, Resolved) => &[Role::Repair, Role::Manager],
        (InProgress, Open) => &[Role::Repair, Role::Manager],
        (Resolved, Closed) => &[Role::Technician, Role::Manager],
        (Resolved, InProgress) => &[Role::Repair, Role::Manager],
        _ => &[],
    }
}

/// Check both the transition table and the permission table.
///
/// Reachability is checked first, so an unreachable target always yields
/// [`CoreError::InvalidTransition`] regardless of role.
pub fn authorize_transition(from: CaseStatus, to: CaseStatus, role: Role) -> Result<(), CoreError> {
    if !can_transition(from, to) {
        return Err(CoreError::invalid_transition(from, to));
    }
    if role.is_manager() || allowed_roles(from, to).contains(&role) {
        return Ok(());
    }
    Err(CoreError::PermissionDenied(format!(
        "Role '{role}' may not move a case from {from} to {to}"
    )))
}

/// Opening a case is open to all maintenance staff.
pub fn authorize_create(role: Role) -> Result<(), CoreError> {
    if role.is_staff() {
        Ok(())
    } else {
        Err(CoreError::PermissionDenied(format!(
            "Role '{role}' may not open cases"
        )))
    }
}

/// Reassignment is limited to repair staff and managers.
pub fn authorize_reassign(role: Role) -> Result<(), CoreError> {
    match role {
        Role::Repair | Role::Manager => Ok(()),
        _ => Err(CoreError::PermissionDenied(format!(
            "Role '{role}' may not reassign cases"
        ))),
    }
}

/// Changing a case's priority is triage work, held by the same roles as
/// reassignment.
pub fn authorize_reprioritize(role: Role) -> Result<(), CoreError> {
    match role {
        Role::Repair | Role::Manager => Ok(()),
        _ => Err(CoreError::PermissionDenied(format!(
            "Role '{role}' may not change case priority"
        ))),
    }
}

/// Comments are open to all maintenance staff.
pub fn authorize_comment(role: Role) -> Result<(), CoreError> {
    if role.is_staff() {
        Ok(())
    } else {
        Err(CoreError::PermissionDenied(format!(
            "Role '{role}' may not comment on cases"
        )))
    }
}

/// Timestamps to stamp when a case arrives at `to`.
///
/// `resolved_at` / `closed_at` are only ever set on first arrival; the
/// returned flags say whether the column should be written now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamps {
    pub resolved: bool,
    pub closed: bool,
}

pub fn stamps_for(
    to: CaseStatus,
    resolved_at: Option<Timestamp>,
    closed_at: Option<Timestamp>,
) -> Stamps {
    Stamps {
        resolved: to == CaseStatus::Resolved && resolved_at.is_none(),
        closed: to == CaseStatus::Closed && closed_at.is_none(),
    }
}

pub const MAX_TITLE_LEN: usize = 200;

/// Trim a case title and check it is non-empty and within [`MAX_TITLE_LEN`].
pub fn normalize_title(title: &str) -> Result<String, CoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "Case title must be 1-{MAX_TITLE_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Human-readable case number, e.g. `CASE-202603011405-7-42`.
///
/// The trailing case id keeps the number unique when two cases are opened on
/// the same machine within the same minute.
pub fn case_number(created_at: Timestamp, machine_id: DbId, case_id: DbId) -> String {
    format!(
        "CASE-{:04}{:02}{:02}{:02}{:02}-{machine_id}-{case_id}",
        created_at.year(),
        created_at.month(),
        created_at.day(),
        created_at.hour(),
        created_at.minute(),
    )
}

/// Upper bound on the age contribution to [`priority_score`] (20 days).
pub const MAX_AGE_SCORE: i64 = 100;

/// Numerical urgency used to order the open-case queue (higher first).
///
/// Base score by priority, plus five points per day of age capped at
/// [`MAX_AGE_SCORE`], plus fifty points per unit of machine importance with a
/// floor of one.
pub fn priority_score(
    priority: CasePriority,
    created_at: Timestamp,
    machine_importance: i32,
    now: Timestamp,
) -> i64 {
    let base = match priority {
        CasePriority::Critical => 1000,
        CasePriority::High => 500,
        CasePriority::Medium => 100,
        CasePriority::Low => 10,
    };
    let age_days = (now - created_at).num_days().max(0);
    let age_score = (age_days * 5).min(MAX_AGE_SCORE);
    let importance = i64::from(machine_importance.max(1));
    base + age_score + importance * 50
}

//! Notification types, severities and retention.

use chrono::Duration;

use crate::case_workflow::CasePriority;
use crate::machine_status::MachineStatus;
use crate::text_enum::text_enum;
use crate::types::{DbId, Timestamp};
use crate::warning::WarningSeverity;

text_enum! {
    /// The event a notification reports. Email preferences are keyed by type.
    pub enum NotificationType {
        WarningCreated => "WARNING_CREATED",
        WarningResolved => "WARNING_RESOLVED",
        CaseCreated => "CASE_CREATED",
        CaseUpdated => "CASE_UPDATED",
        CaseResolved => "CASE_RESOLVED",
        AssignmentChanged => "ASSIGNMENT_CHANGED",
        CommentAdded => "COMMENT_ADDED",
        MachineStatusChanged => "MACHINE_STATUS_CHANGED",
    }
}

text_enum! {
    pub enum NotificationSeverity {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
    }
}

impl From<WarningSeverity> for NotificationSeverity {
    fn from(severity: WarningSeverity) -> Self {
        match severity {
            WarningSeverity::Low => NotificationSeverity::Low,
            WarningSeverity::Medium => NotificationSeverity::Medium,
            WarningSeverity::High => NotificationSeverity::High,
        }
    }
}

impl From<CasePriority> for NotificationSeverity {
    fn from(priority: CasePriority) -> Self {
        match priority {
            CasePriority::Low => NotificationSeverity::Low,
            CasePriority::Medium => NotificationSeverity::Medium,
            CasePriority::High | CasePriority::Critical => NotificationSeverity::High,
        }
    }
}

impl From<MachineStatus> for NotificationSeverity {
    /// Severity of a notice announcing that a machine entered `status`.
    fn from(status: MachineStatus) -> Self {
        match status {
            MachineStatus::Ok => NotificationSeverity::Low,
            MachineStatus::Warning => NotificationSeverity::Medium,
            MachineStatus::Fault => NotificationSeverity::High,
        }
    }
}

/// Entity types a notification may link back to.
pub const ENTITY_MACHINE: &str = "machine";
pub const ENTITY_CASE: &str = "case";
pub const ENTITY_WARNING: &str = "warning";

/// Read notifications older than this many days are purged.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Cutoff before which read notifications are eligible for purging.
pub fn retention_cutoff(now: Timestamp, retention_days: i64) -> Timestamp {
    now - Duration::days(retention_days.max(0))
}

/// A notification's link to the entity it is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRef {
    pub entity_type: &'static str,
    pub entity_id: DbId,
}

impl EntityRef {
    pub fn machine(id: DbId) -> Self {
        Self { entity_type: ENTITY_MACHINE, entity_id: id }
    }

    pub fn case(id: DbId) -> Self {
        Self { entity_type: ENTITY_CASE, entity_id: id }
    }

    pub fn warning(id: DbId) -> Self {
        Self { entity_type: ENTITY_WARNING, entity_id: id }
    }
}

//! Derived machine status and the manual status-report table.
//!
//! A machine's status is never stored. It is folded from the machine's open
//! cases and active warnings every time it is read; the SQL derivation in
//! `millwright-db` (`MachineRepo`) must stay in step with [`MachineStatus::derive`].

use crate::error::CoreError;
use crate::roles::Role;
use crate::text_enum::text_enum;

text_enum! {
    /// Operating status of a machine. Variant order is severity order, so
    /// `Ord` gives `Ok < Warning < Fault`.
    #[derive(PartialOrd, Ord)]
    pub enum MachineStatus {
        Ok => "OK",
        Warning => "Warning",
        Fault => "Fault",
    }
}

impl MachineStatus {
    /// Fold open-case and active-warning counts into a status.
    ///
    /// Any open case wins over any number of warnings.
    pub fn derive(open_cases: i64, active_warnings: i64) -> Self {
        if open_cases > 0 {
            MachineStatus::Fault
        } else if active_warnings > 0 {
            MachineStatus::Warning
        } else {
            MachineStatus::Ok
        }
    }
}

/// Most severe status in the set; `Ok` for an empty set.
pub fn aggregate_status<I>(statuses: I) -> MachineStatus
where
    I: IntoIterator<Item = MachineStatus>,
{
    statuses.into_iter().max().unwrap_or(MachineStatus::Ok)
}

/// Reason recorded on the history row written when a machine is created.
pub const INITIAL_STATUS_REASON: &str = "Initial machine creation";

/// Warning text used when a manual Warning report carries no reason.
pub const DEFAULT_WARNING_REASON: &str = "Reported manually";

/// Case title used when a manual Fault report carries no reason.
pub const DEFAULT_FAULT_REASON: &str = "Fault reported";

// ---------------------------------------------------------------------------
// Manual status reports
// ---------------------------------------------------------------------------

/// What the engine must do to honour a manual status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusReportAction {
    /// Record a warning against the machine.
    RaiseWarning,
    /// Open a case against the machine.
    OpenCase,
    /// Resolve every active warning on the machine.
    ClearWarnings,
}

/// Roles that may report a machine into `target`.
pub fn report_roles(target: MachineStatus) -> &'static [Role] {
    match target {
        MachineStatus::Warning => &[Role::Technician, Role::Manager],
        MachineStatus::Fault => &[Role::Technician, Role::Repair, Role::Manager],
        MachineStatus::Ok => &[Role::Repair, Role::Manager],
    }
}

/// Decide whether `role` may report a machine currently in `current` as
/// `target`, and what that report translates into.
///
/// Status only changes through cases and warnings, so a report of the status
/// the machine is already in is rejected, as is clearing a machine that still
/// has open cases (which is exactly when it is in `Fault`).
pub fn authorize_status_report(
    current: MachineStatus,
    target: MachineStatus,
    role: Role,
) -> Result<StatusReportAction, CoreError> {
    if current == target {
        return Err(CoreError::invalid_transition(current, target));
    }
    let action = match target {
        MachineStatus::Warning => StatusReportAction::RaiseWarning,
        MachineStatus::Fault => StatusReportAction::OpenCase,
        MachineStatus::Ok if current == MachineStatus::Fault => {
            return Err(CoreError::InvalidTransition {
                from: current.to_string(),
                to: format!("{target} (machine has open cases)"),
            });
        }
        MachineStatus::Ok => StatusReportAction::ClearWarnings,
    };
    if !report_roles(target).contains(&role) {
        return Err(CoreError::PermissionDenied(format!(
            "Role '{role}' may not report a machine as {target}"
        )));
    }
    Ok(action)
}

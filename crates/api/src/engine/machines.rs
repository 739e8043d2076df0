//! Machine registration, assignments and manual status reports.

use millwright_core::case_workflow::{self as workflow, CasePriority};
use millwright_core::error::CoreError;
use millwright_core::machine::validate_machine_fields;
use millwright_core::machine_status::{
    aggregate_status, authorize_status_report, MachineStatus, StatusReportAction,
    DEFAULT_FAULT_REASON, DEFAULT_WARNING_REASON, INITIAL_STATUS_REASON,
};
use millwright_core::notification::{EntityRef, NotificationSeverity, NotificationType};
use millwright_core::types::DbId;
use millwright_core::warning::{normalize_warning_text, WarningSeverity};
use millwright_db::models::case::{Case, CreateCase};
use millwright_db::models::machine::{CreateMachine, Machine, MachineAssignment, MachineStatusCount};
use millwright_db::models::warning::{Resolution, Warning};
use millwright_db::repositories::{
    MachineRepo, MachineStatusChangeRepo, UserRepo, WarningRepo,
};
use millwright_notify::Notice;
use serde::Serialize;

use crate::engine::status_watch::{announce_shift, StatusWatch};
use crate::engine::warnings::{announce_raised, announce_resolved, raise_in_tx, RaisedWarning};
use crate::engine::{announce, cases, Actor};
use crate::error::AppResult;
use crate::state::AppState;

fn not_found(id: DbId) -> CoreError {
    CoreError::NotFound { entity: "Machine", id }
}

pub async fn find(state: &AppState, machine_id: DbId) -> AppResult<Machine> {
    Ok(MachineRepo::find_by_id(&state.pool, machine_id)
        .await?
        .ok_or_else(|| not_found(machine_id))?)
}

/// Register a machine and write its initial `OK -> OK` history row.
pub async fn create_machine(
    state: &AppState,
    actor: Actor,
    mut input: CreateMachine,
) -> AppResult<Machine> {
    input.name = input.name.trim().to_string();
    input.serial_number = input.serial_number.trim().to_string();
    validate_machine_fields(&input.name, &input.serial_number, input.importance)?;

    let mut tx = state.pool.begin().await?;
    let id = MachineRepo::insert(&mut tx, &input, actor.user_id).await?;
    MachineStatusChangeRepo::record(
        &mut tx,
        id,
        MachineStatus::Ok,
        MachineStatus::Ok,
        Some(actor.user_id),
        INITIAL_STATUS_REASON,
    )
    .await?;
    let machine = MachineRepo::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| CoreError::Internal(format!("Machine {id} vanished after insert")))?;
    tx.commit().await?;

    tracing::info!(machine_id = id, name = %machine.name, user_id = actor.user_id, "Machine created");
    Ok(machine)
}

/// Assign a user to a machine. Assigning someone already assigned is a
/// conflict.
pub async fn assign_user(
    state: &AppState,
    actor: Actor,
    machine_id: DbId,
    user_id: DbId,
) -> AppResult<MachineAssignment> {
    let machine = find(state, machine_id).await?;
    if UserRepo::find_by_id(&state.pool, user_id).await?.is_none() {
        return Err(CoreError::NotFound { entity: "User", id: user_id }.into());
    }
    let assignment = MachineRepo::assign_user(&state.pool, machine_id, user_id, actor.user_id)
        .await?
        .ok_or_else(|| {
            CoreError::Conflict(format!(
                "User {user_id} is already assigned to machine {machine_id}"
            ))
        })?;

    tracing::info!(machine_id, user_id, assigned_by = actor.user_id, "User assigned to machine");
    let notice = Notice::new(
        NotificationType::AssignmentChanged,
        NotificationSeverity::Low,
        format!("New Machine Assignment: {}", machine.name),
        format!(
            "You have been assigned to machine: {} ({})",
            machine.name, machine.model_number
        ),
    )
    .about(EntityRef::machine(machine_id));
    announce(state, Ok(vec![user_id]), notice).await;
    Ok(assignment)
}

pub async fn unassign_user(state: &AppState, machine_id: DbId, user_id: DbId) -> AppResult<()> {
    if !MachineRepo::unassign_user(&state.pool, machine_id, user_id).await? {
        return Err(CoreError::NotFound {
            entity: "MachineAssignment",
            id: user_id,
        }
        .into());
    }
    tracing::info!(machine_id, user_id, "User unassigned from machine");
    Ok(())
}

// ---------------------------------------------------------------------------
// Manual status reports
// ---------------------------------------------------------------------------

/// What a manual status report did, besides any status change.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReportEffect {
    WarningRaised { warning: Warning, created: bool },
    CaseOpened { case: Case },
    WarningsCleared { warnings: Vec<Warning> },
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub machine: Machine,
    pub effect: ReportEffect,
}

/// Report a machine as being in `target`.
///
/// Status stays derived: a Warning report raises a warning, a Fault report
/// opens a case and an OK report resolves the active warnings.
pub async fn report_status(
    state: &AppState,
    actor: Actor,
    machine_id: DbId,
    target: MachineStatus,
    reason: Option<&str>,
) -> AppResult<StatusReport> {
    let reason = reason.map(str::trim).filter(|r| !r.is_empty());

    let mut tx = state.pool.begin().await?;
    let watch = StatusWatch::lock(&mut tx, machine_id).await?;
    let action = authorize_status_report(watch.before(), target, actor.role)?;

    let (effect, history_reason) = match action {
        StatusReportAction::RaiseWarning => {
            let text = normalize_warning_text(reason.unwrap_or(DEFAULT_WARNING_REASON))?;
            let RaisedWarning { warning, created } =
                raise_in_tx(&mut tx, machine_id, &text, WarningSeverity::default(), actor.user_id)
                    .await?;
            (
                ReportEffect::WarningRaised { warning, created },
                format!("Reported as Warning: {text}"),
            )
        }
        StatusReportAction::OpenCase => {
            let input = CreateCase {
                machine_id,
                title: workflow::normalize_title(reason.unwrap_or(DEFAULT_FAULT_REASON))?,
                description: String::new(),
                priority: CasePriority::default(),
                assigned_to: None,
            };
            let case = cases::open_in_tx(&mut tx, &input, actor.user_id).await?;
            let history_reason = format!("Reported as Fault: case {} opened", case.case_number);
            (ReportEffect::CaseOpened { case }, history_reason)
        }
        StatusReportAction::ClearWarnings => {
            let resolution = Resolution {
                resolved_by: actor.user_id,
                note: reason,
                auto: true,
            };
            let warnings = WarningRepo::resolve_all(&mut tx, machine_id, resolution).await?;
            (
                ReportEffect::WarningsCleared { warnings },
                reason.unwrap_or("Reported as OK").to_string(),
            )
        }
    };

    let shift = watch.settle(&mut tx, actor.user_id, &history_reason).await?;
    let machine = MachineRepo::find_by_id(&mut *tx, machine_id)
        .await?
        .ok_or_else(|| not_found(machine_id))?;
    tx.commit().await?;

    tracing::info!(
        machine_id,
        target = %target,
        user_id = actor.user_id,
        "Manual status report applied"
    );
    match &effect {
        ReportEffect::WarningRaised { warning, created: true } => {
            announce_raised(state, warning).await
        }
        ReportEffect::WarningRaised { created: false, .. } => {}
        ReportEffect::CaseOpened { case } => cases::announce_created(state, case).await,
        ReportEffect::WarningsCleared { warnings } => {
            announce_resolved(state, machine_id, warnings).await
        }
    }
    announce_shift(state, shift).await;
    Ok(StatusReport { machine, effect })
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    /// Most severe status across all machines.
    pub aggregate: MachineStatus,
    pub counts: Vec<MachineStatusCount>,
}

pub async fn status_summary(state: &AppState) -> AppResult<StatusSummary> {
    let counts = MachineRepo::status_counts(&state.pool).await?;
    let aggregate = aggregate_status(counts.iter().filter(|c| c.count > 0).map(|c| c.status));
    Ok(StatusSummary { aggregate, counts })
}

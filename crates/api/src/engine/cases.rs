//! Case lifecycle: opening, combined updates, comments, the CSV report and the
//! read-side queue and statistics.

use chrono::Utc;
use millwright_core::case_workflow::{self as workflow, CasePriority, CaseStatus};
use millwright_core::error::CoreError;
use millwright_core::notification::{EntityRef, NotificationSeverity, NotificationType};
use millwright_core::types::DbId;
use millwright_db::models::case::{
    Case, CaseComment, CaseFilter, CasePriorityCount, CaseReportRow, CaseStatusCount, CreateCase,
    MachineCaseCount, StatsWindow,
};
use millwright_db::repositories::{CaseRepo, MachineRepo, UserRepo};
use millwright_notify::Notice;
use serde::Serialize;
use sqlx::PgConnection;

use crate::engine::status_watch::{announce_shift, StatusWatch};
use crate::engine::{announce, recipients, Actor};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Number of machines listed in [`CaseStatistics::top_machines`].
const TOP_MACHINES: i64 = 10;

fn not_found(id: DbId) -> CoreError {
    CoreError::NotFound { entity: "Case", id }
}

async fn ensure_user_exists(state: &AppState, user_id: DbId) -> AppResult<()> {
    if UserRepo::find_by_id(&state.pool, user_id).await?.is_none() {
        return Err(CoreError::Validation(format!("User {user_id} does not exist")).into());
    }
    Ok(())
}

/// Insert a new `OPEN` case. Caller holds the machine lock.
pub(crate) async fn open_in_tx(
    conn: &mut PgConnection,
    input: &CreateCase,
    created_by: DbId,
) -> AppResult<Case> {
    let id = CaseRepo::next_id(conn).await?;
    let number = workflow::case_number(Utc::now(), input.machine_id, id);
    Ok(CaseRepo::insert(conn, id, &number, input, created_by).await?)
}

/// Open a case against a machine, which puts the machine into `Fault`.
pub async fn create_case(state: &AppState, actor: Actor, mut input: CreateCase) -> AppResult<Case> {
    workflow::authorize_create(actor.role)?;
    input.title = workflow::normalize_title(&input.title)?;
    if let Some(assignee) = input.assigned_to {
        ensure_user_exists(state, assignee).await?;
    }

    let mut tx = state.pool.begin().await?;
    let watch = StatusWatch::lock(&mut tx, input.machine_id).await?;
    let case = open_in_tx(&mut tx, &input, actor.user_id).await?;
    let shift = watch
        .settle(&mut tx, actor.user_id, &format!("Case {} opened", case.case_number))
        .await?;
    tx.commit().await?;

    tracing::info!(
        case_id = case.id,
        case_number = %case.case_number,
        machine_id = case.machine_id,
        user_id = actor.user_id,
        "Case created"
    );
    announce_created(state, &case).await;
    announce_shift(state, shift).await;
    Ok(case)
}

/// Field changes requested for one case in a single operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaseChanges {
    pub priority: Option<CasePriority>,
    /// `Some(None)` unassigns the case.
    pub assignee: Option<Option<DbId>>,
    pub status: Option<CaseStatus>,
}

impl CaseChanges {
    pub fn is_empty(&self) -> bool {
        self.priority.is_none() && self.assignee.is_none() && self.status.is_none()
    }
}

/// Apply priority, assignee and status changes to a case in one transaction.
///
/// Every requested field is authorized before anything is written, the
/// transition against the locked row included, so a rejected field leaves the
/// case untouched. A priority or assignee equal to the current one is a no-op
/// and records no history.
pub async fn update(
    state: &AppState,
    actor: Actor,
    case_id: DbId,
    changes: CaseChanges,
) -> AppResult<Case> {
    if changes.priority.is_some() {
        workflow::authorize_reprioritize(actor.role)?;
    }
    if let Some(assignee) = changes.assignee {
        workflow::authorize_reassign(actor.role)?;
        if let Some(user_id) = assignee {
            ensure_user_exists(state, user_id).await?;
        }
    }
    let machine_id = CaseRepo::find_by_id(&state.pool, case_id)
        .await?
        .ok_or_else(|| not_found(case_id))?
        .machine_id;

    let mut tx = state.pool.begin().await?;
    let watch = StatusWatch::lock(&mut tx, machine_id).await?;
    let current = CaseRepo::lock_for_update(&mut tx, case_id)
        .await?
        .ok_or_else(|| not_found(case_id))?;
    if let Some(to) = changes.status {
        workflow::authorize_transition(current.status, to, actor.role)?;
    }

    let mut case = current.clone();
    let reprioritized = changes.priority.filter(|p| *p != current.priority);
    if let Some(priority) = reprioritized {
        case = CaseRepo::update_priority(&mut tx, case_id, priority).await?;
    }
    let reassigned = changes.assignee.filter(|a| *a != current.assigned_to);
    if let Some(assignee) = reassigned {
        case = CaseRepo::update_assignee(&mut tx, case_id, assignee).await?;
        CaseRepo::record_assignment(&mut tx, case_id, current.assigned_to, assignee, actor.user_id)
            .await?;
    }
    if let Some(to) = changes.status {
        let stamps = workflow::stamps_for(to, current.resolved_at, current.closed_at);
        case = CaseRepo::update_status(&mut tx, case_id, to, stamps.resolved, stamps.closed).await?;
        CaseRepo::record_status_change(&mut tx, case_id, current.status, to, actor.user_id)
            .await?;
    }
    let reason = match changes.status {
        Some(to) => format!("Case {} moved from {} to {to}", case.case_number, current.status),
        None => format!("Case {} updated", case.case_number),
    };
    let shift = watch.settle(&mut tx, actor.user_id, &reason).await?;
    tx.commit().await?;

    tracing::info!(
        case_id,
        priority = ?reprioritized,
        assignee = ?reassigned,
        status = ?changes.status,
        user_id = actor.user_id,
        "Case updated"
    );

    if let Some(priority) = reprioritized {
        let notice = Notice::new(
            NotificationType::CaseUpdated,
            priority.into(),
            format!("Case Priority Changed: {}", case.case_number),
            format!("Case priority changed from {} to {priority}", current.priority),
        )
        .about(EntityRef::case(case.id));
        announce(state, recipients::case_followers(&state.pool, &case).await, notice).await;
    }
    if let Some(Some(user_id)) = reassigned {
        let notice = Notice::new(
            NotificationType::AssignmentChanged,
            case.priority.into(),
            format!("Case Assigned: {}", case.case_number),
            format!("You have been assigned to case {}", case.case_number),
        )
        .about(EntityRef::case(case.id));
        announce(state, Ok(vec![user_id]), notice).await;
    }
    if let Some(to) = changes.status {
        let notification_type = if to == CaseStatus::Resolved {
            NotificationType::CaseResolved
        } else {
            NotificationType::CaseUpdated
        };
        let notice = Notice::new(
            notification_type,
            case.priority.into(),
            format!("Case Status Changed: {}", case.case_number),
            format!("Case status changed from {} to {to}", current.status),
        )
        .about(EntityRef::case(case.id));
        announce(state, recipients::case_followers(&state.pool, &case).await, notice).await;
    }
    announce_shift(state, shift).await;
    Ok(case)
}

/// Attach a comment to a case.
pub async fn add_comment(
    state: &AppState,
    actor: Actor,
    case_id: DbId,
    text: &str,
) -> AppResult<CaseComment> {
    workflow::authorize_comment(actor.role)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(CoreError::Validation("Comment must not be empty".to_string()).into());
    }
    let case = CaseRepo::find_by_id(&state.pool, case_id)
        .await?
        .ok_or_else(|| not_found(case_id))?;

    let comment = CaseRepo::add_comment(&state.pool, case_id, actor.user_id, text).await?;

    let notice = Notice::new(
        NotificationType::CommentAdded,
        NotificationSeverity::Low,
        format!("New Comment: {}", case.case_number),
        text.to_string(),
    )
    .about(EntityRef::case(case.id));
    announce(state, Ok(recipients::comment_audience(&case, actor.user_id)), notice).await;
    Ok(comment)
}

pub(crate) async fn announce_created(state: &AppState, case: &Case) {
    let name = match MachineRepo::find_by_id(&state.pool, case.machine_id).await {
        Ok(Some(machine)) => machine.name,
        _ => format!("#{}", case.machine_id),
    };
    let notice = Notice::new(
        NotificationType::CaseCreated,
        case.priority.into(),
        format!("New Case Created: {}", case.case_number),
        format!("A new case has been created for {name}: {}", case.title),
    )
    .about(EntityRef::case(case.id));
    announce(state, recipients::case_created(&state.pool, case).await, notice).await;
}

// ---------------------------------------------------------------------------
// Read side
// ---------------------------------------------------------------------------

/// An open case with its computed urgency.
#[derive(Debug, Clone, Serialize)]
pub struct PrioritizedCase {
    #[serde(flatten)]
    pub case: Case,
    pub machine_importance: i32,
    pub priority_score: i64,
}

/// Open and in-progress cases, most urgent first.
pub async fn prioritized(state: &AppState, limit: usize) -> AppResult<Vec<PrioritizedCase>> {
    let now = Utc::now();
    let mut queue: Vec<PrioritizedCase> = CaseRepo::list_open_candidates(&state.pool)
        .await?
        .into_iter()
        .map(|candidate| PrioritizedCase {
            priority_score: workflow::priority_score(
                candidate.case.priority,
                candidate.case.created_at,
                candidate.machine_importance,
                now,
            ),
            machine_importance: candidate.machine_importance,
            case: candidate.case,
        })
        .collect();
    queue.sort_by(|a, b| {
        b.priority_score
            .cmp(&a.priority_score)
            .then(a.case.created_at.cmp(&b.case.created_at))
            .then(a.case.id.cmp(&b.case.id))
    });
    queue.truncate(limit);
    Ok(queue)
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseStatistics {
    pub total: i64,
    pub by_status: Vec<CaseStatusCount>,
    pub by_priority: Vec<CasePriorityCount>,
    /// Mean of `resolved_at - created_at` in seconds, over cases now Resolved
    /// or Closed. `None` when no case in the window qualifies.
    pub average_resolution_secs: Option<f64>,
    pub top_machines: Vec<MachineCaseCount>,
}

pub async fn statistics(state: &AppState, window: StatsWindow) -> AppResult<CaseStatistics> {
    if let (Some(from), Some(to)) = (window.from, window.to) {
        if from > to {
            return Err(CoreError::Validation("'from' must not be after 'to'".to_string()).into());
        }
    }
    let by_status = CaseRepo::count_by_status(&state.pool, &window).await?;
    let by_priority = CaseRepo::count_by_priority(&state.pool, &window).await?;
    let average_resolution_secs = CaseRepo::average_resolution_secs(&state.pool, &window).await?;
    let top_machines = CaseRepo::top_machines(&state.pool, &window, TOP_MACHINES).await?;
    Ok(CaseStatistics {
        total: by_status.iter().map(|c| c.count).sum(),
        by_status,
        by_priority,
        average_resolution_secs,
        top_machines,
    })
}

// ---------------------------------------------------------------------------
// Report export
// ---------------------------------------------------------------------------

const REPORT_HEADER: [&str; 11] = [
    "Case Number",
    "Title",
    "Machine",
    "Status",
    "Priority",
    "Created By",
    "Assigned To",
    "Created At",
    "Updated At",
    "Resolved At",
    "Description",
];

const REPORT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Render report rows as CSV, one line per case after the header.
pub fn render_csv(rows: &[CaseReportRow]) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(REPORT_HEADER).map_err(report_error)?;
    for row in rows {
        let case = &row.case;
        let created_at = case.created_at.format(REPORT_TIME_FORMAT).to_string();
        let updated_at = case.updated_at.format(REPORT_TIME_FORMAT).to_string();
        let resolved_at = case
            .resolved_at
            .map(|at| at.format(REPORT_TIME_FORMAT).to_string())
            .unwrap_or_else(|| "N/A".to_string());
        writer
            .write_record([
                case.case_number.as_str(),
                case.title.as_str(),
                row.machine_name.as_str(),
                case.status.as_str(),
                case.priority.as_str(),
                row.created_by_name.as_deref().unwrap_or("N/A"),
                row.assigned_to_name.as_deref().unwrap_or("Unassigned"),
                created_at.as_str(),
                updated_at.as_str(),
                resolved_at.as_str(),
                case.description.as_str(),
            ])
            .map_err(report_error)?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::InternalError(format!("Failed to flush case report: {e}")))
}

fn report_error(e: csv::Error) -> AppError {
    AppError::InternalError(format!("Failed to write case report: {e}"))
}

/// Export the cases matching `filter` as a CSV report.
pub async fn export_csv(state: &AppState, filter: &CaseFilter) -> AppResult<Vec<u8>> {
    let rows = CaseRepo::list_for_report(&state.pool, filter).await?;
    tracing::info!(rows = rows.len(), "Exporting case report");
    render_csv(&rows)
}

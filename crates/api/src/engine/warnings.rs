//! Warning ledger: idempotent creation and resolution.

use millwright_core::error::CoreError;
use millwright_core::notification::{EntityRef, NotificationSeverity, NotificationType};
use millwright_core::types::DbId;
use millwright_core::warning::{self as rules, WarningSeverity};
use millwright_db::models::warning::{Resolution, Warning};
use millwright_db::repositories::{MachineRepo, WarningRepo};
use millwright_notify::Notice;
use sqlx::PgConnection;

use crate::engine::status_watch::{announce_shift, StatusWatch};
use crate::engine::{announce, recipients, Actor};
use crate::error::AppResult;
use crate::state::AppState;

/// Result of [`create_warning`].
#[derive(Debug, Clone)]
pub struct RaisedWarning {
    pub warning: Warning,
    /// `false` when an active warning with the same text already existed and
    /// was returned instead.
    pub created: bool,
}

/// Insert a warning unless an identical one is active. Caller holds the
/// machine lock and has normalized `text`.
pub(crate) async fn raise_in_tx(
    conn: &mut PgConnection,
    machine_id: DbId,
    text: &str,
    severity: WarningSeverity,
    created_by: DbId,
) -> AppResult<RaisedWarning> {
    if let Some(warning) =
        WarningRepo::insert_if_absent(conn, machine_id, text, severity, created_by).await?
    {
        return Ok(RaisedWarning { warning, created: true });
    }
    let existing = WarningRepo::find_active_by_text(&mut *conn, machine_id, text)
        .await?
        .ok_or_else(|| {
            CoreError::Internal(format!(
                "Warning insert on machine {machine_id} conflicted but no active row was found"
            ))
        })?;
    Ok(RaisedWarning { warning: existing, created: false })
}

/// Record a warning against a machine.
///
/// Idempotent: an active warning with the same (trimmed) text is returned
/// with `created = false`. With `strict` set that case is an error instead.
pub async fn create_warning(
    state: &AppState,
    actor: Actor,
    machine_id: DbId,
    text: &str,
    severity: WarningSeverity,
    strict: bool,
) -> AppResult<RaisedWarning> {
    rules::authorize_raise(actor.role)?;
    let text = rules::normalize_warning_text(text)?;

    let mut tx = state.pool.begin().await?;
    let watch = StatusWatch::lock(&mut tx, machine_id).await?;
    let raised = raise_in_tx(&mut tx, machine_id, &text, severity, actor.user_id).await?;

    if !raised.created {
        tx.rollback().await?;
        if strict {
            return Err(CoreError::DuplicateActive(raised.warning.id).into());
        }
        tracing::debug!(
            warning_id = raised.warning.id,
            machine_id,
            "Active warning already exists, returning it"
        );
        return Ok(raised);
    }

    let shift = watch
        .settle(&mut tx, actor.user_id, &format!("Warning raised: {text}"))
        .await?;
    tx.commit().await?;

    tracing::info!(
        warning_id = raised.warning.id,
        machine_id,
        user_id = actor.user_id,
        "Warning created"
    );
    announce_raised(state, &raised.warning).await;
    announce_shift(state, shift).await;
    Ok(raised)
}

/// Resolve a single active warning.
pub async fn resolve_warning(
    state: &AppState,
    actor: Actor,
    warning_id: DbId,
    note: Option<&str>,
) -> AppResult<Warning> {
    rules::authorize_resolve(actor.role)?;
    let machine_id = WarningRepo::find_by_id(&state.pool, warning_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Warning",
            id: warning_id,
        })?
        .machine_id;

    let mut tx = state.pool.begin().await?;
    let watch = StatusWatch::lock(&mut tx, machine_id).await?;
    let current = WarningRepo::lock_for_update(&mut tx, warning_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Warning",
            id: warning_id,
        })?;
    if !current.active {
        return Err(CoreError::AlreadyResolved(warning_id).into());
    }
    let resolution = Resolution {
        resolved_by: actor.user_id,
        note,
        auto: false,
    };
    let warning = WarningRepo::resolve(&mut tx, warning_id, resolution)
        .await?
        .ok_or(CoreError::AlreadyResolved(warning_id))?;
    let shift = watch
        .settle(&mut tx, actor.user_id, &format!("Warning resolved: {}", warning.text))
        .await?;
    tx.commit().await?;

    tracing::info!(warning_id, machine_id, user_id = actor.user_id, "Warning resolved");
    announce_resolved(state, machine_id, std::slice::from_ref(&warning)).await;
    announce_shift(state, shift).await;
    Ok(warning)
}

/// Which active warnings a bulk resolution targets.
#[derive(Debug, Clone, Copy)]
pub enum Selection<'a> {
    All,
    Text(&'a str),
}

/// Resolve every active warning on a machine, or those with a given text.
/// Returns the resolved rows; resolving nothing is not an error.
pub async fn resolve_many(
    state: &AppState,
    actor: Actor,
    machine_id: DbId,
    selection: Selection<'_>,
    note: Option<&str>,
) -> AppResult<Vec<Warning>> {
    rules::authorize_resolve(actor.role)?;
    let resolution = Resolution {
        resolved_by: actor.user_id,
        note,
        auto: false,
    };

    let mut tx = state.pool.begin().await?;
    let watch = StatusWatch::lock(&mut tx, machine_id).await?;
    let resolved = match selection {
        Selection::All => WarningRepo::resolve_all(&mut tx, machine_id, resolution).await?,
        Selection::Text(text) => {
            let text = rules::normalize_warning_text(text)?;
            WarningRepo::resolve_by_text(&mut tx, machine_id, &text, resolution).await?
        }
    };
    let shift = watch
        .settle(
            &mut tx,
            actor.user_id,
            &format!("{} warning(s) resolved", resolved.len()),
        )
        .await?;
    tx.commit().await?;

    tracing::info!(
        machine_id,
        resolved = resolved.len(),
        user_id = actor.user_id,
        "Warnings resolved in bulk"
    );
    announce_resolved(state, machine_id, &resolved).await;
    announce_shift(state, shift).await;
    Ok(resolved)
}

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

async fn machine_name(state: &AppState, machine_id: DbId) -> String {
    match MachineRepo::find_by_id(&state.pool, machine_id).await {
        Ok(Some(machine)) => machine.name,
        _ => format!("#{machine_id}"),
    }
}

pub(crate) async fn announce_raised(state: &AppState, warning: &Warning) {
    let name = machine_name(state, warning.machine_id).await;
    let notice = Notice::new(
        NotificationType::WarningCreated,
        warning.severity.into(),
        format!("New Warning: {name}"),
        format!("Warning: {}", warning.text),
    )
    .about(EntityRef::warning(warning.id));
    announce(
        state,
        recipients::warning_watchers(&state.pool, warning.machine_id).await,
        notice,
    )
    .await;
}

pub(crate) async fn announce_resolved(state: &AppState, machine_id: DbId, resolved: &[Warning]) {
    let notice = match resolved {
        [] => return,
        [warning] => {
            let name = machine_name(state, machine_id).await;
            Notice::new(
                NotificationType::WarningResolved,
                NotificationSeverity::Low,
                format!("Warning Resolved: {name}"),
                format!("Warning resolved: {}", warning.text),
            )
            .about(EntityRef::warning(warning.id))
        }
        many => {
            let name = machine_name(state, machine_id).await;
            Notice::new(
                NotificationType::WarningResolved,
                NotificationSeverity::Low,
                format!("Warnings Resolved: {name}"),
                format!("{} warnings resolved on {name}", many.len()),
            )
            .about(EntityRef::machine(machine_id))
        }
    };
    announce(
        state,
        recipients::warning_watchers(&state.pool, machine_id).await,
        notice,
    )
    .await;
}

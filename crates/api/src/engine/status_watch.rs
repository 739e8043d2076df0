//! Before/after comparison of a machine's derived status inside a transaction.

use millwright_core::error::CoreError;
use millwright_core::machine_status::MachineStatus;
use millwright_core::notification::{EntityRef, NotificationType};
use millwright_core::types::DbId;
use millwright_db::repositories::{MachineRepo, MachineStatusChangeRepo};
use millwright_notify::Notice;
use sqlx::PgConnection;

use crate::engine::{announce, recipients};
use crate::error::AppResult;
use crate::state::AppState;

/// A status change written to `machine_status_changes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusShift {
    pub machine_id: DbId,
    pub from: MachineStatus,
    pub to: MachineStatus,
}

/// Holds the machine row lock's "before" status until the mutation is done.
#[derive(Debug)]
pub struct StatusWatch {
    machine_id: DbId,
    before: MachineStatus,
}

impl StatusWatch {
    /// Lock the machine row (`FOR UPDATE`) and capture its current status.
    pub async fn lock(conn: &mut PgConnection, machine_id: DbId) -> AppResult<Self> {
        if !MachineRepo::lock_for_update(conn, machine_id).await? {
            return Err(CoreError::NotFound {
                entity: "Machine",
                id: machine_id,
            }
            .into());
        }
        let before = MachineRepo::current_status(&mut *conn, machine_id).await?;
        Ok(Self { machine_id, before })
    }

    pub fn before(&self) -> MachineStatus {
        self.before
    }

    /// Recompute the status and record a history row if it moved.
    pub async fn settle(
        self,
        conn: &mut PgConnection,
        changed_by: DbId,
        reason: &str,
    ) -> AppResult<Option<StatusShift>> {
        let after = MachineRepo::current_status(&mut *conn, self.machine_id).await?;
        if after == self.before {
            return Ok(None);
        }
        MachineStatusChangeRepo::record(
            conn,
            self.machine_id,
            self.before,
            after,
            Some(changed_by),
            reason,
        )
        .await?;
        tracing::info!(
            machine_id = self.machine_id,
            from = %self.before,
            to = %after,
            reason,
            "Machine status changed"
        );
        Ok(Some(StatusShift {
            machine_id: self.machine_id,
            from: self.before,
            to: after,
        }))
    }
}

/// Tell machine assignees and managers about a committed status change.
pub async fn announce_shift(state: &AppState, shift: Option<StatusShift>) {
    let Some(shift) = shift else {
        return;
    };
    let name = match MachineRepo::find_by_id(&state.pool, shift.machine_id).await {
        Ok(Some(machine)) => machine.name,
        Ok(None) => format!("#{}", shift.machine_id),
        Err(e) => {
            tracing::error!(error = %e, machine_id = shift.machine_id, "Failed to load machine");
            format!("#{}", shift.machine_id)
        }
    };
    let notice = Notice::new(
        NotificationType::MachineStatusChanged,
        shift.to.into(),
        format!("Machine Status Changed: {name}"),
        format!("{name} changed from {} to {}", shift.from, shift.to),
    )
    .about(EntityRef::machine(shift.machine_id));
    announce(
        state,
        recipients::machine_watchers(&state.pool, shift.machine_id).await,
        notice,
    )
    .await;
}

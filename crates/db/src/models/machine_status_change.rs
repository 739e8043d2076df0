//! Machine status history model.

use millwright_core::machine_status::MachineStatus;
use millwright_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `machine_status_changes` table. Append-only.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MachineStatusChange {
    pub id: DbId,
    pub machine_id: DbId,
    #[sqlx(try_from = "String")]
    pub previous_status: MachineStatus,
    #[sqlx(try_from = "String")]
    pub new_status: MachineStatus,
    pub changed_by: Option<DbId>,
    pub reason: String,
    pub changed_at: Timestamp,
}

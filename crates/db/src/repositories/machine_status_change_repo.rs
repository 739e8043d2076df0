//! Repository for the append-only `machine_status_changes` table.

use millwright_core::machine_status::MachineStatus;
use millwright_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::machine_status_change::MachineStatusChange;

const COLUMNS: &str = "id, machine_id, previous_status, new_status, changed_by, reason, changed_at";

pub struct MachineStatusChangeRepo;

impl MachineStatusChangeRepo {
    pub async fn record(
        conn: &mut PgConnection,
        machine_id: DbId,
        previous: MachineStatus,
        new: MachineStatus,
        changed_by: Option<DbId>,
        reason: &str,
    ) -> Result<MachineStatusChange, sqlx::Error> {
        let query = format!(
            "INSERT INTO machine_status_changes \
                (machine_id, previous_status, new_status, changed_by, reason) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MachineStatusChange>(&query)
            .bind(machine_id)
            .bind(previous.as_str())
            .bind(new.as_str())
            .bind(changed_by)
            .bind(reason)
            .fetch_one(conn)
            .await
    }

    /// History for a machine, newest first.
    pub async fn list_for_machine(
        pool: &PgPool,
        machine_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MachineStatusChange>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM machine_status_changes \
             WHERE machine_id = $1 \
             ORDER BY changed_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, MachineStatusChange>(&query)
            .bind(machine_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}

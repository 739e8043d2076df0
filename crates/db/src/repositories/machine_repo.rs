//! Repository for the `machines` and `machine_assignments` tables.
//!
//! A machine's status is derived in SQL by [`COLUMNS`]; the rule is the same
//! one [`MachineStatus::derive`] applies to counts.

use millwright_core::machine_status::MachineStatus;
use millwright_core::types::DbId;
use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::models::machine::{
    CreateMachine, Machine, MachineAssignment, MachineFilter, MachineStatusCount,
};

/// Column list for `machines m` queries, including the derived `status`.
const COLUMNS: &str = "\
    m.id, m.name, m.model_number, m.serial_number, m.description, m.importance, \
    m.installed_on, m.created_by, m.created_at, m.updated_at, \
    CASE \
        WHEN EXISTS (SELECT 1 FROM cases c \
                     WHERE c.machine_id = m.id AND c.status IN ('OPEN', 'IN_PROGRESS')) \
            THEN 'Fault' \
        WHEN EXISTS (SELECT 1 FROM warnings w WHERE w.machine_id = m.id AND w.active) \
            THEN 'Warning' \
        ELSE 'OK' \
    END AS status";

/// Column list for `machine_assignments` queries.
const ASSIGNMENT_COLUMNS: &str = "id, machine_id, user_id, assigned_by, assigned_at";

/// Machines ordered the way listings show them.
const ORDER: &str = "ORDER BY importance DESC, name, id";

pub struct MachineRepo;

impl MachineRepo {
    /// Insert a machine, returning its id. Runs on the caller's transaction so
    /// the initial status history row commits with it.
    pub async fn insert(
        conn: &mut PgConnection,
        input: &CreateMachine,
        created_by: DbId,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO machines \
                (name, model_number, serial_number, description, importance, installed_on, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id",
        )
        .bind(input.name.trim())
        .bind(&input.model_number)
        .bind(input.serial_number.trim())
        .bind(&input.description)
        .bind(input.importance)
        .bind(input.installed_on)
        .bind(created_by)
        .fetch_one(conn)
        .await
    }

    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<Machine>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM machines m WHERE m.id = $1");
        sqlx::query_as::<_, Machine>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Lock the machine row for the rest of the transaction.
    ///
    /// Every mutation that can change a machine's derived status takes this
    /// lock first. Returns `false` if the machine does not exist.
    pub async fn lock_for_update(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let row: Option<DbId> =
            sqlx::query_scalar("SELECT id FROM machines WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(conn)
                .await?;
        Ok(row.is_some())
    }

    /// Current derived status of one machine, from live counts.
    pub async fn current_status(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<MachineStatus, sqlx::Error> {
        let (open_cases, active_warnings): (i64, i64) = sqlx::query_as(
            "SELECT \
                (SELECT COUNT(*) FROM cases \
                 WHERE machine_id = $1 AND status IN ('OPEN', 'IN_PROGRESS')), \
                (SELECT COUNT(*) FROM warnings WHERE machine_id = $1 AND active)",
        )
        .bind(id)
        .fetch_one(executor)
        .await?;
        Ok(MachineStatus::derive(open_cases, active_warnings))
    }

    /// List machines matching every filter that is set.
    pub async fn list(pool: &PgPool, filter: &MachineFilter) -> Result<Vec<Machine>, sqlx::Error> {
        let mut conditions: Vec<String> = Vec::new();
        let mut param_idx: usize = 1;

        if filter.status.is_some() {
            conditions.push(format!("status = ${param_idx}"));
            param_idx += 1;
        }
        if filter.collection_id.is_some() {
            conditions.push(format!(
                "id IN (SELECT machine_id FROM machine_collection_members \
                        WHERE collection_id = ${param_idx})"
            ));
            param_idx += 1;
        }
        if filter.assigned_to.is_some() {
            conditions.push(format!(
                "id IN (SELECT machine_id FROM machine_assignments WHERE user_id = ${param_idx})"
            ));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // The derived status is only addressable from an outer query.
        let query = format!(
            "SELECT * FROM (SELECT {COLUMNS} FROM machines m) machines \
             {where_clause} {ORDER}"
        );

        let mut q = sqlx::query_as::<_, Machine>(&query);
        if let Some(status) = filter.status {
            q = q.bind(status.as_str());
        }
        if let Some(collection_id) = filter.collection_id {
            q = q.bind(collection_id);
        }
        if let Some(user_id) = filter.assigned_to {
            q = q.bind(user_id);
        }
        q.fetch_all(pool).await
    }

    /// Number of machines per derived status. Statuses with no machines are
    /// absent from the result.
    pub async fn status_counts(pool: &PgPool) -> Result<Vec<MachineStatusCount>, sqlx::Error> {
        let query = format!(
            "SELECT status, COUNT(*) AS count \
             FROM (SELECT {COLUMNS} FROM machines m) machines \
             GROUP BY status"
        );
        sqlx::query_as::<_, MachineStatusCount>(&query)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Assignments
    // -----------------------------------------------------------------------

    /// Assign a user to a machine. Returns `None` if already assigned.
    pub async fn assign_user(
        pool: &PgPool,
        machine_id: DbId,
        user_id: DbId,
        assigned_by: DbId,
    ) -> Result<Option<MachineAssignment>, sqlx::Error> {
        let query = format!(
            "INSERT INTO machine_assignments (machine_id, user_id, assigned_by) \
             VALUES ($1, $2, $3) \
             ON CONFLICT ON CONSTRAINT uq_machine_assignments_machine_user DO NOTHING \
             RETURNING {ASSIGNMENT_COLUMNS}"
        );
        sqlx::query_as::<_, MachineAssignment>(&query)
            .bind(machine_id)
            .bind(user_id)
            .bind(assigned_by)
            .fetch_optional(pool)
            .await
    }

    /// Remove an assignment. Returns `true` if one existed.
    pub async fn unassign_user(
        pool: &PgPool,
        machine_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM machine_assignments WHERE machine_id = $1 AND user_id = $2")
                .bind(machine_id)
                .bind(user_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_assignments(
        pool: &PgPool,
        machine_id: DbId,
    ) -> Result<Vec<MachineAssignment>, sqlx::Error> {
        let query = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM machine_assignments \
             WHERE machine_id = $1 ORDER BY assigned_at, id"
        );
        sqlx::query_as::<_, MachineAssignment>(&query)
            .bind(machine_id)
            .fetch_all(pool)
            .await
    }

    /// Ids of the users assigned to a machine.
    pub async fn assignee_ids(
        executor: impl PgExecutor<'_>,
        machine_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT user_id FROM machine_assignments WHERE machine_id = $1")
            .bind(machine_id)
            .fetch_all(executor)
            .await
    }
}

//! Repository for the `warnings` table.
//!
//! At most one warning per `(machine_id, text)` may be active; the partial
//! unique index `uq_warnings_active_machine_text` enforces it and
//! [`WarningRepo::insert_if_absent`] relies on it.

use millwright_core::types::DbId;
use millwright_core::warning::WarningSeverity;
use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::models::warning::{Resolution, Warning, WarningFilter};

/// Column list for `warnings` queries.
const COLUMNS: &str = "\
    id, machine_id, text, severity, active, created_by, created_at, \
    resolved_by, resolved_at, resolution_note, auto_resolution";

pub struct WarningRepo;

impl WarningRepo {
    /// Insert an active warning unless one with the same text is already
    /// active on the machine. Returns `None` on conflict.
    pub async fn insert_if_absent(
        conn: &mut PgConnection,
        machine_id: DbId,
        text: &str,
        severity: WarningSeverity,
        created_by: DbId,
    ) -> Result<Option<Warning>, sqlx::Error> {
        let query = format!(
            "INSERT INTO warnings (machine_id, text, severity, created_by) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (machine_id, text) WHERE active DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Warning>(&query)
            .bind(machine_id)
            .bind(text)
            .bind(severity.as_str())
            .bind(created_by)
            .fetch_optional(conn)
            .await
    }

    pub async fn find_active_by_text(
        executor: impl PgExecutor<'_>,
        machine_id: DbId,
        text: &str,
    ) -> Result<Option<Warning>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM warnings \
             WHERE machine_id = $1 AND text = $2 AND active"
        );
        sqlx::query_as::<_, Warning>(&query)
            .bind(machine_id)
            .bind(text)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<Warning>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM warnings WHERE id = $1");
        sqlx::query_as::<_, Warning>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn lock_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Warning>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM warnings WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Warning>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Warnings on a machine, newest first.
    pub async fn list_for_machine(
        pool: &PgPool,
        machine_id: DbId,
        filter: &WarningFilter,
    ) -> Result<Vec<Warning>, sqlx::Error> {
        let active = if filter.active_only { "AND active" } else { "" };
        let query = format!(
            "SELECT {COLUMNS} FROM warnings \
             WHERE machine_id = $1 {active} \
               AND ($2::text IS NULL OR severity = $2) \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Warning>(&query)
            .bind(machine_id)
            .bind(filter.severity.map(WarningSeverity::as_str))
            .fetch_all(pool)
            .await
    }

    /// Resolve one warning. Returns `None` if it is not active.
    pub async fn resolve(
        conn: &mut PgConnection,
        id: DbId,
        resolution: Resolution<'_>,
    ) -> Result<Option<Warning>, sqlx::Error> {
        let query = format!(
            "UPDATE warnings SET \
                active = false, resolved_by = $2, resolved_at = NOW(), \
                resolution_note = $3, auto_resolution = $4 \
             WHERE id = $1 AND active \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Warning>(&query)
            .bind(id)
            .bind(resolution.resolved_by)
            .bind(resolution.note)
            .bind(resolution.auto)
            .fetch_optional(conn)
            .await
    }

    /// Resolve every active warning on a machine, returning the resolved rows.
    pub async fn resolve_all(
        conn: &mut PgConnection,
        machine_id: DbId,
        resolution: Resolution<'_>,
    ) -> Result<Vec<Warning>, sqlx::Error> {
        let query = format!(
            "UPDATE warnings SET \
                active = false, resolved_by = $2, resolved_at = NOW(), \
                resolution_note = $3, auto_resolution = $4 \
             WHERE machine_id = $1 AND active \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Warning>(&query)
            .bind(machine_id)
            .bind(resolution.resolved_by)
            .bind(resolution.note)
            .bind(resolution.auto)
            .fetch_all(conn)
            .await
    }

    /// Resolve the active warning with the given text, if any.
    pub async fn resolve_by_text(
        conn: &mut PgConnection,
        machine_id: DbId,
        text: &str,
        resolution: Resolution<'_>,
    ) -> Result<Vec<Warning>, sqlx::Error> {
        let query = format!(
            "UPDATE warnings SET \
                active = false, resolved_by = $3, resolved_at = NOW(), \
                resolution_note = $4, auto_resolution = $5 \
             WHERE machine_id = $1 AND text = $2 AND active \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Warning>(&query)
            .bind(machine_id)
            .bind(text)
            .bind(resolution.resolved_by)
            .bind(resolution.note)
            .bind(resolution.auto)
            .fetch_all(conn)
            .await
    }
}

//! Repository for `cases` and its audit and comment tables.

use millwright_core::case_workflow::{CasePriority, CaseStatus};
use millwright_core::types::DbId;
use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::models::case::{
    Case, CaseAssignmentChange, CaseComment, CaseFilter, CasePriorityCount, CaseReportRow,
    CaseStatusChange, CaseStatusCount, CreateCase, MachineCaseCount, OpenCaseCandidate,
    StatsWindow,
};

/// Column list for `cases` queries.
const COLUMNS: &str = "\
    id, case_number, machine_id, title, description, status, priority, \
    created_by, assigned_to, created_at, updated_at, resolved_at, closed_at";

/// [`COLUMNS`] qualified with the `c` alias, for joins.
const QUALIFIED_COLUMNS: &str = "\
    c.id, c.case_number, c.machine_id, c.title, c.description, c.status, c.priority, \
    c.created_by, c.assigned_to, c.created_at, c.updated_at, c.resolved_at, c.closed_at";

const STATUS_CHANGE_COLUMNS: &str =
    "id, case_id, previous_status, new_status, changed_by, changed_at";

const ASSIGNMENT_COLUMNS: &str =
    "id, case_id, previous_assignee, new_assignee, changed_by, changed_at";

const COMMENT_COLUMNS: &str = "id, case_id, author_id, text, created_at";

/// Predicate shared by the statistics queries; binds `$1` (from), `$2` (to)
/// and `$3` (machine id), each optional. Both bounds are inclusive.
const STATS_WHERE: &str = "\
    ($1::timestamptz IS NULL OR created_at >= $1) \
    AND ($2::timestamptz IS NULL OR created_at <= $2) \
    AND ($3::bigint IS NULL OR machine_id = $3)";

pub struct CaseRepo;

impl CaseRepo {
    /// Reserve the id of the next case so the case number can embed it.
    pub async fn next_id(conn: &mut PgConnection) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar("SELECT nextval(pg_get_serial_sequence('cases', 'id'))")
            .fetch_one(conn)
            .await
    }

    /// Insert a case under a reserved id. The case starts `OPEN`.
    pub async fn insert(
        conn: &mut PgConnection,
        id: DbId,
        case_number: &str,
        input: &CreateCase,
        created_by: DbId,
    ) -> Result<Case, sqlx::Error> {
        let query = format!(
            "INSERT INTO cases \
                (id, case_number, machine_id, title, description, status, priority, \
                 created_by, assigned_to) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Case>(&query)
            .bind(id)
            .bind(case_number)
            .bind(input.machine_id)
            .bind(input.title.trim())
            .bind(&input.description)
            .bind(CaseStatus::Open.as_str())
            .bind(input.priority.as_str())
            .bind(created_by)
            .bind(input.assigned_to)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<Case>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM cases WHERE id = $1");
        sqlx::query_as::<_, Case>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Load and lock a case for the rest of the transaction.
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Case>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM cases WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Case>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// List cases, newest first.
    pub async fn list(
        pool: &PgPool,
        filter: &CaseFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Case>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM cases \
             WHERE ($1::text IS NULL OR status = $1) \
               AND ($2::bigint IS NULL OR machine_id = $2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Case>(&query)
            .bind(filter.status.map(CaseStatus::as_str))
            .bind(filter.machine_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Every case matching `filter` with machine and user names, newest first.
    pub async fn list_for_report(
        pool: &PgPool,
        filter: &CaseFilter,
    ) -> Result<Vec<CaseReportRow>, sqlx::Error> {
        let query = format!(
            "SELECT {QUALIFIED_COLUMNS}, m.name AS machine_name, \
                    creator.username AS created_by_name, \
                    assignee.username AS assigned_to_name \
             FROM cases c \
             JOIN machines m ON m.id = c.machine_id \
             LEFT JOIN users creator ON creator.id = c.created_by \
             LEFT JOIN users assignee ON assignee.id = c.assigned_to \
             WHERE ($1::text IS NULL OR c.status = $1) \
               AND ($2::bigint IS NULL OR c.machine_id = $2) \
             ORDER BY c.created_at DESC, c.id DESC"
        );
        sqlx::query_as::<_, CaseReportRow>(&query)
            .bind(filter.status.map(CaseStatus::as_str))
            .bind(filter.machine_id)
            .fetch_all(pool)
            .await
    }

    /// Open and in-progress cases with their machine's importance.
    pub async fn list_open_candidates(pool: &PgPool) -> Result<Vec<OpenCaseCandidate>, sqlx::Error> {
        let query = format!(
            "SELECT {QUALIFIED_COLUMNS}, m.importance AS machine_importance \
             FROM cases c JOIN machines m ON m.id = c.machine_id \
             WHERE c.status IN ('OPEN', 'IN_PROGRESS')"
        );
        sqlx::query_as::<_, OpenCaseCandidate>(&query)
            .fetch_all(pool)
            .await
    }

    /// Set a case's status, stamping `resolved_at` / `closed_at` when asked.
    pub async fn update_status(
        conn: &mut PgConnection,
        id: DbId,
        status: CaseStatus,
        stamp_resolved: bool,
        stamp_closed: bool,
    ) -> Result<Case, sqlx::Error> {
        let query = format!(
            "UPDATE cases SET \
                status = $2, \
                updated_at = NOW(), \
                resolved_at = CASE WHEN $3 THEN NOW() ELSE resolved_at END, \
                closed_at = CASE WHEN $4 THEN NOW() ELSE closed_at END \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Case>(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(stamp_resolved)
            .bind(stamp_closed)
            .fetch_one(conn)
            .await
    }

    pub async fn update_assignee(
        conn: &mut PgConnection,
        id: DbId,
        assigned_to: Option<DbId>,
    ) -> Result<Case, sqlx::Error> {
        let query = format!(
            "UPDATE cases SET assigned_to = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Case>(&query)
            .bind(id)
            .bind(assigned_to)
            .fetch_one(conn)
            .await
    }

    pub async fn update_priority(
        conn: &mut PgConnection,
        id: DbId,
        priority: CasePriority,
    ) -> Result<Case, sqlx::Error> {
        let query = format!(
            "UPDATE cases SET priority = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Case>(&query)
            .bind(id)
            .bind(priority.as_str())
            .fetch_one(conn)
            .await
    }

    // -----------------------------------------------------------------------
    // Audit trail
    // -----------------------------------------------------------------------

    pub async fn record_status_change(
        conn: &mut PgConnection,
        case_id: DbId,
        previous: CaseStatus,
        new: CaseStatus,
        changed_by: DbId,
    ) -> Result<CaseStatusChange, sqlx::Error> {
        let query = format!(
            "INSERT INTO case_status_changes (case_id, previous_status, new_status, changed_by) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {STATUS_CHANGE_COLUMNS}"
        );
        sqlx::query_as::<_, CaseStatusChange>(&query)
            .bind(case_id)
            .bind(previous.as_str())
            .bind(new.as_str())
            .bind(changed_by)
            .fetch_one(conn)
            .await
    }

    pub async fn record_assignment(
        conn: &mut PgConnection,
        case_id: DbId,
        previous: Option<DbId>,
        new: Option<DbId>,
        changed_by: DbId,
    ) -> Result<CaseAssignmentChange, sqlx::Error> {
        let query = format!(
            "INSERT INTO case_assignment_history \
                (case_id, previous_assignee, new_assignee, changed_by) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {ASSIGNMENT_COLUMNS}"
        );
        sqlx::query_as::<_, CaseAssignmentChange>(&query)
            .bind(case_id)
            .bind(previous)
            .bind(new)
            .bind(changed_by)
            .fetch_one(conn)
            .await
    }

    /// Status history, oldest first.
    pub async fn status_history(
        pool: &PgPool,
        case_id: DbId,
    ) -> Result<Vec<CaseStatusChange>, sqlx::Error> {
        let query = format!(
            "SELECT {STATUS_CHANGE_COLUMNS} FROM case_status_changes \
             WHERE case_id = $1 ORDER BY changed_at, id"
        );
        sqlx::query_as::<_, CaseStatusChange>(&query)
            .bind(case_id)
            .fetch_all(pool)
            .await
    }

    /// Assignment history, oldest first.
    pub async fn assignment_history(
        pool: &PgPool,
        case_id: DbId,
    ) -> Result<Vec<CaseAssignmentChange>, sqlx::Error> {
        let query = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM case_assignment_history \
             WHERE case_id = $1 ORDER BY changed_at, id"
        );
        sqlx::query_as::<_, CaseAssignmentChange>(&query)
            .bind(case_id)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Comments
    // -----------------------------------------------------------------------

    pub async fn add_comment(
        pool: &PgPool,
        case_id: DbId,
        author_id: DbId,
        text: &str,
    ) -> Result<CaseComment, sqlx::Error> {
        let query = format!(
            "INSERT INTO case_comments (case_id, author_id, text) \
             VALUES ($1, $2, $3) \
             RETURNING {COMMENT_COLUMNS}"
        );
        sqlx::query_as::<_, CaseComment>(&query)
            .bind(case_id)
            .bind(author_id)
            .bind(text)
            .fetch_one(pool)
            .await
    }

    /// Comments on a case, oldest first.
    pub async fn list_comments(
        pool: &PgPool,
        case_id: DbId,
    ) -> Result<Vec<CaseComment>, sqlx::Error> {
        let query = format!(
            "SELECT {COMMENT_COLUMNS} FROM case_comments \
             WHERE case_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, CaseComment>(&query)
            .bind(case_id)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Statistics
    // -----------------------------------------------------------------------

    pub async fn count_by_status(
        pool: &PgPool,
        window: &StatsWindow,
    ) -> Result<Vec<CaseStatusCount>, sqlx::Error> {
        let query = format!(
            "SELECT status, COUNT(*) AS count FROM cases \
             WHERE {STATS_WHERE} GROUP BY status"
        );
        sqlx::query_as::<_, CaseStatusCount>(&query)
            .bind(window.from)
            .bind(window.to)
            .bind(window.machine_id)
            .fetch_all(pool)
            .await
    }

    pub async fn count_by_priority(
        pool: &PgPool,
        window: &StatsWindow,
    ) -> Result<Vec<CasePriorityCount>, sqlx::Error> {
        let query = format!(
            "SELECT priority, COUNT(*) AS count FROM cases \
             WHERE {STATS_WHERE} GROUP BY priority"
        );
        sqlx::query_as::<_, CasePriorityCount>(&query)
            .bind(window.from)
            .bind(window.to)
            .bind(window.machine_id)
            .fetch_all(pool)
            .await
    }

    /// Mean seconds from creation to first resolution, over cases currently
    /// Resolved or Closed. A case reopened after resolution is left out until
    /// it settles again. `None` when no case qualifies.
    pub async fn average_resolution_secs(
        pool: &PgPool,
        window: &StatsWindow,
    ) -> Result<Option<f64>, sqlx::Error> {
        let query = format!(
            "SELECT AVG(EXTRACT(EPOCH FROM (resolved_at - created_at)))::float8 \
             FROM cases \
             WHERE status IN ('RESOLVED', 'CLOSED') \
               AND resolved_at IS NOT NULL AND {STATS_WHERE}"
        );
        sqlx::query_scalar(&query)
            .bind(window.from)
            .bind(window.to)
            .bind(window.machine_id)
            .fetch_one(pool)
            .await
    }

    /// Machines with the most cases in the window, most first.
    pub async fn top_machines(
        pool: &PgPool,
        window: &StatsWindow,
        limit: i64,
    ) -> Result<Vec<MachineCaseCount>, sqlx::Error> {
        let query = format!(
            "SELECT m.id AS machine_id, m.name AS machine_name, COUNT(*) AS case_count \
             FROM (SELECT machine_id FROM cases WHERE {STATS_WHERE}) c \
             JOIN machines m ON m.id = c.machine_id \
             GROUP BY m.id, m.name \
             ORDER BY case_count DESC, m.id \
             LIMIT $4"
        );
        sqlx::query_as::<_, MachineCaseCount>(&query)
            .bind(window.from)
            .bind(window.to)
            .bind(window.machine_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}

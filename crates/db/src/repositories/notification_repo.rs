//! Repository for the `notifications` table.

use millwright_core::notification::NotificationType;
use millwright_core::types::{DbId, Timestamp};
use sqlx::{PgExecutor, PgPool};

use crate::models::notification::{NewNotification, Notification, NotificationFilter};

/// Column list for `notifications` queries.
const COLUMNS: &str = "\
    id, recipient_id, title, message, notification_type, severity, \
    entity_type, entity_id, is_read, read_at, email_sent, created_at";

/// Provides CRUD operations for notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    pub async fn create(
        executor: impl PgExecutor<'_>,
        input: &NewNotification<'_>,
    ) -> Result<Notification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications \
                (recipient_id, title, message, notification_type, severity, entity_type, entity_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(input.recipient_id)
            .bind(input.title)
            .bind(input.message)
            .bind(input.notification_type.as_str())
            .bind(input.severity.as_str())
            .bind(input.entity_type)
            .bind(input.entity_id)
            .fetch_one(executor)
            .await
    }

    /// List notifications for a user, newest first, narrowed by `filter`.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        filter: &NotificationFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let unread = if filter.unread_only {
            "AND is_read = false"
        } else {
            ""
        };
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE recipient_id = $1 {unread} \
               AND ($2::text IS NULL OR notification_type = $2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(filter.notification_type.map(NotificationType::as_str))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Mark one of the user's notifications read.
    ///
    /// Marking an already-read notification is a no-op that keeps the first
    /// `read_at`. Returns `None` if the notification does not belong to the user.
    pub async fn mark_read(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<Option<Notification>, sqlx::Error> {
        let query = format!(
            "UPDATE notifications \
             SET is_read = true, read_at = COALESCE(read_at, NOW()) \
             WHERE id = $1 AND recipient_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(notification_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Mark all unread notifications as read for a user.
    ///
    /// Returns the number of notifications that were marked read.
    pub async fn mark_all_read(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = true, read_at = NOW() \
             WHERE recipient_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn unread_count(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Record that the email for a notification went out.
    pub async fn mark_email_sent(pool: &PgPool, notification_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE notifications SET email_sent = true WHERE id = $1")
            .bind(notification_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Delete read notifications created before `cutoff`. Unread ones are
    /// never purged. Returns the number deleted.
    pub async fn purge_read_before(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM notifications WHERE is_read AND created_at < $1")
                .bind(cutoff)
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }
}

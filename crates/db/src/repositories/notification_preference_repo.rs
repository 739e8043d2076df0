//! Repository for the `notification_preferences` table.

use millwright_core::notification::NotificationType;
use millwright_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::notification::NotificationPreference;

const COLUMNS: &str = "id, user_id, notification_type, email, updated_at";

pub struct NotificationPreferenceRepo;

impl NotificationPreferenceRepo {
    /// Stored preferences for a user. Types without a row are absent.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<NotificationPreference>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_preferences \
             WHERE user_id = $1 ORDER BY notification_type"
        );
        sqlx::query_as::<_, NotificationPreference>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Insert or update the email preference for one type.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        notification_type: NotificationType,
        email: bool,
    ) -> Result<NotificationPreference, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_preferences (user_id, notification_type, email) \
             VALUES ($1, $2, $3) \
             ON CONFLICT ON CONSTRAINT uq_notification_preferences_user_type \
             DO UPDATE SET email = EXCLUDED.email, updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationPreference>(&query)
            .bind(user_id)
            .bind(notification_type.as_str())
            .bind(email)
            .fetch_one(pool)
            .await
    }

    /// Which of `user_ids` have opted into email for `notification_type`.
    pub async fn email_opt_ins(
        executor: impl PgExecutor<'_>,
        user_ids: &[DbId],
        notification_type: NotificationType,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT user_id FROM notification_preferences \
             WHERE user_id = ANY($1) AND notification_type = $2 AND email",
        )
        .bind(user_ids)
        .bind(notification_type.as_str())
        .fetch_all(executor)
        .await
    }
}

//! Notification entity models and DTOs.

use millwright_core::notification::{NotificationSeverity, NotificationType};
use millwright_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub recipient_id: DbId,
    pub title: String,
    pub message: String,
    #[sqlx(try_from = "String")]
    pub notification_type: NotificationType,
    #[sqlx(try_from = "String")]
    pub severity: NotificationSeverity,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub email_sent: bool,
    pub created_at: Timestamp,
}

/// Filters for listing a user's notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationFilter {
    pub unread_only: bool,
    pub notification_type: Option<NotificationType>,
}

/// Insert payload for a single recipient's notification.
#[derive(Debug, Clone)]
pub struct NewNotification<'a> {
    pub recipient_id: DbId,
    pub title: &'a str,
    pub message: &'a str,
    pub notification_type: NotificationType,
    pub severity: NotificationSeverity,
    pub entity_type: Option<&'a str>,
    pub entity_id: Option<DbId>,
}

/// A row from the `notification_preferences` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationPreference {
    pub id: DbId,
    pub user_id: DbId,
    #[sqlx(try_from = "String")]
    pub notification_type: NotificationType,
    pub email: bool,
    pub updated_at: Timestamp,
}

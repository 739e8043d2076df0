//! Notification fan-out.
//!
//! [`NotificationDispatcher::notify`] is called explicitly by the engine after
//! a mutation commits. It resolves recipient ids to active users, writes one
//! notification per user and queues email for those who opted in.

use std::collections::BTreeSet;

use millwright_core::notification::{EntityRef, NotificationSeverity, NotificationType};
use millwright_core::types::DbId;
use millwright_db::models::notification::NewNotification;
use millwright_db::repositories::{NotificationPreferenceRepo, NotificationRepo, UserRepo};
use millwright_db::DbPool;

use crate::email::OutgoingEmail;
use crate::queue::{EmailJob, EmailQueue};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// What to tell the recipients.
#[derive(Debug, Clone)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub severity: NotificationSeverity,
    pub entity: Option<EntityRef>,
}

impl Notice {
    pub fn new(
        notification_type: NotificationType,
        severity: NotificationSeverity,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            notification_type,
            severity,
            entity: None,
        }
    }

    /// Link the notification to the entity it is about.
    pub fn about(mut self, entity: EntityRef) -> Self {
        self.entity = Some(entity);
        self
    }
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Ids of the notifications written, one per recipient.
    pub notification_ids: Vec<DbId>,
    /// Emails accepted by the queue.
    pub emails_queued: usize,
}

/// Persists notifications and hands email to the [`EmailQueue`].
#[derive(Clone)]
pub struct NotificationDispatcher {
    pool: DbPool,
    email: Option<EmailQueue>,
}

impl NotificationDispatcher {
    /// `email` is `None` when SMTP is not configured; notifications are then
    /// only stored.
    pub fn new(pool: DbPool, email: Option<EmailQueue>) -> Self {
        Self { pool, email }
    }

    pub fn email_enabled(&self) -> bool {
        self.email.is_some()
    }

    /// Deliver `notice` to every distinct active user in `recipients`.
    pub async fn notify(
        &self,
        recipients: impl IntoIterator<Item = DbId>,
        notice: &Notice,
    ) -> Result<DispatchReport, DispatchError> {
        let ids: Vec<DbId> = recipients.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        if ids.is_empty() {
            return Ok(DispatchReport::default());
        }

        let users = UserRepo::list_active_by_ids(&self.pool, &ids).await?;
        let opted_in: BTreeSet<DbId> = if self.email.is_some() {
            NotificationPreferenceRepo::email_opt_ins(&self.pool, &ids, notice.notification_type)
                .await?
                .into_iter()
                .collect()
        } else {
            BTreeSet::new()
        };

        let mut report = DispatchReport::default();
        for user in &users {
            let notification = NotificationRepo::create(
                &self.pool,
                &NewNotification {
                    recipient_id: user.id,
                    title: &notice.title,
                    message: &notice.message,
                    notification_type: notice.notification_type,
                    severity: notice.severity,
                    entity_type: notice.entity.map(|e| e.entity_type),
                    entity_id: notice.entity.map(|e| e.entity_id),
                },
            )
            .await?;
            report.notification_ids.push(notification.id);

            let (Some(queue), Some(address)) = (&self.email, user.email.as_deref()) else {
                continue;
            };
            if !opted_in.contains(&user.id) || address.is_empty() {
                continue;
            }
            let queued = queue.enqueue(EmailJob {
                notification_id: notification.id,
                email: OutgoingEmail::for_notification(address, &notice.title, &notice.message),
            });
            if queued {
                report.emails_queued += 1;
            }
        }

        tracing::debug!(
            notification_type = %notice.notification_type,
            recipients = report.notification_ids.len(),
            emails = report.emails_queued,
            "Notifications dispatched"
        );
        Ok(report)
    }

    /// [`notify`](Self::notify), logging instead of returning failures.
    ///
    /// Used after a mutation has committed, where a notification failure must
    /// not turn a successful request into an error.
    pub async fn notify_logged(&self, recipients: impl IntoIterator<Item = DbId>, notice: &Notice) {
        if let Err(e) = self.notify(recipients, notice).await {
            tracing::error!(
                error = %e,
                notification_type = %notice.notification_type,
                "Failed to dispatch notifications"
            );
        }
    }
}

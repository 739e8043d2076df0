//! Bounded email queue and the background worker that drains it.
//!
//! The dispatcher never waits on SMTP: it pushes an [`EmailJob`] with
//! `try_send` and moves on. A full or closed queue drops the job with a
//! warning. Failed sends are logged and not retried.

use millwright_core::types::DbId;
use millwright_db::repositories::NotificationRepo;
use millwright_db::DbPool;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::email::{EmailDelivery, OutgoingEmail};

/// Default number of emails that may wait for the worker.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// One email to send, tied to the notification it reports.
#[derive(Debug, Clone)]
pub struct EmailJob {
    pub notification_id: DbId,
    pub email: OutgoingEmail,
}

/// Sending half of the email queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EmailQueue {
    sender: mpsc::Sender<EmailJob>,
}

impl EmailQueue {
    /// Create a queue and the receiver an [`EmailWorker`] will drain.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<EmailJob>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Enqueue without waiting. Returns `false` if the job was dropped.
    pub fn enqueue(&self, job: EmailJob) -> bool {
        match self.sender.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                tracing::warn!(
                    notification_id = job.notification_id,
                    "Email queue full, dropping email"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                tracing::warn!(
                    notification_id = job.notification_id,
                    "Email worker stopped, dropping email"
                );
                false
            }
        }
    }
}

/// Background task that sends queued email.
pub struct EmailWorker {
    pool: DbPool,
    delivery: EmailDelivery,
}

impl EmailWorker {
    pub fn new(pool: DbPool, delivery: EmailDelivery) -> Self {
        Self { pool, delivery }
    }

    /// Run until `cancel` fires or every [`EmailQueue`] handle is dropped.
    pub async fn run(self, mut receiver: mpsc::Receiver<EmailJob>, cancel: CancellationToken) {
        tracing::info!("Email worker started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Email worker stopping");
                    break;
                }
                job = receiver.recv() => {
                    match job {
                        Some(job) => self.handle(job).await,
                        None => {
                            tracing::info!("Email queue closed, worker shutting down");
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn handle(&self, job: EmailJob) {
        if let Err(e) = self.delivery.deliver(&job.email).await {
            tracing::error!(
                error = %e,
                notification_id = job.notification_id,
                "Failed to send notification email"
            );
            return;
        }
        if let Err(e) = NotificationRepo::mark_email_sent(&self.pool, job.notification_id).await {
            tracing::error!(
                error = %e,
                notification_id = job.notification_id,
                "Failed to record sent email"
            );
        }
    }
}

//! Periodic purge of read notifications.
//!
//! Deletes notifications that have been read and were created more than
//! `retention_days` ago. Unread notifications are never purged.

use std::time::Duration;

use chrono::Utc;
use millwright_core::notification::retention_cutoff;
use millwright_db::repositories::NotificationRepo;
use millwright_db::DbPool;
use tokio_util::sync::CancellationToken;

/// How often the purge runs.
const PURGE_INTERVAL: Duration = Duration::from_secs(3600); // 1 hour

/// Run one purge pass. Returns the number of notifications deleted.
pub async fn purge_once(pool: &DbPool, retention_days: i64) -> Result<u64, sqlx::Error> {
    let cutoff = retention_cutoff(Utc::now(), retention_days);
    NotificationRepo::purge_read_before(pool, cutoff).await
}

/// Run the notification retention loop until `cancel` is triggered.
pub async fn run(pool: DbPool, retention_days: i64, cancel: CancellationToken) {
    tracing::info!(
        retention_days,
        interval_secs = PURGE_INTERVAL.as_secs(),
        "Notification retention job started"
    );

    let mut interval = tokio::time::interval(PURGE_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Notification retention job stopping");
                break;
            }
            _ = interval.tick() => {
                match purge_once(&pool, retention_days).await {
                    Ok(deleted) => {
                        if deleted > 0 {
                            tracing::info!(deleted, "Notification retention: purged read notifications");
                        } else {
                            tracing::debug!("Notification retention: nothing to purge");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Notification retention: purge failed");
                    }
                }
            }
        }
    }
}

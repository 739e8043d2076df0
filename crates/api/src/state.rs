use std::sync::Arc;

use millwright_notify::NotificationDispatcher;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: millwright_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Notification fan-out, called by the engine after each commit.
    pub dispatcher: NotificationDispatcher,
}

//! Maintenance workflow engine.
//!
//! Every operation that can move a machine's derived status runs in one
//! transaction that locks the machine row first (then the case or warning row
//! it changes), compares the status before and after through
//! [`status_watch::StatusWatch`], commits, and only then hands notices to the
//! dispatcher. Handlers stay thin: they parse input and call in here.

pub mod cases;
pub mod machines;
pub mod recipients;
pub mod status_watch;
pub mod warnings;

use millwright_core::roles::Role;
use millwright_core::types::DbId;
use millwright_notify::Notice;

use crate::state::AppState;

/// The user performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: DbId,
    pub role: Role,
}

/// Dispatch `notice` to a resolved recipient list.
///
/// Runs after commit, so failures are logged and never surface to the caller.
pub(crate) async fn announce(
    state: &AppState,
    recipients: Result<Vec<DbId>, sqlx::Error>,
    notice: Notice,
) {
    match recipients {
        Ok(recipients) => state.dispatcher.notify_logged(recipients, &notice).await,
        Err(e) => tracing::error!(
            error = %e,
            notification_type = %notice.notification_type,
            "Failed to resolve notification recipients"
        ),
    }
}

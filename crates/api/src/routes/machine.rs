//! Route definitions for the `/machines` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{machine, warning};
use crate::state::AppState;

/// Routes mounted at `/machines`.
///
/// ```text
/// GET    /                               -> list_machines
/// POST   /                               -> create_machine
/// GET    /status-summary                 -> status_summary
/// GET    /{id}                           -> get_machine
/// PATCH  /{id}                           -> report_status
/// GET    /{id}/status-history            -> status_history
/// GET    /{id}/warnings                  -> list_warnings
/// POST   /{id}/warnings                  -> create_warning
/// POST   /{id}/warnings/resolve          -> resolve_machine_warnings
/// POST   /{id}/assignments               -> assign_user
/// DELETE /{id}/assignments/{user_id}     -> unassign_user
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(machine::list_machines).post(machine::create_machine))
        .route("/status-summary", get(machine::status_summary))
        .route("/{id}", get(machine::get_machine).patch(machine::report_status))
        .route("/{id}/status-history", get(machine::status_history))
        .route(
            "/{id}/warnings",
            get(warning::list_warnings).post(warning::create_warning),
        )
        .route(
            "/{id}/warnings/resolve",
            post(warning::resolve_machine_warnings),
        )
        .route("/{id}/assignments", post(machine::assign_user))
        .route(
            "/{id}/assignments/{user_id}",
            delete(machine::unassign_user),
        )
}

//! Route definitions for the `/warnings` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::warning;
use crate::state::AppState;

/// Routes mounted at `/warnings`.
///
/// ```text
/// POST   /{id}/resolve                   -> resolve_warning
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/resolve", post(warning::resolve_warning))
}

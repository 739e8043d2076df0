//! Route definitions for the `/cases` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::case;
use crate::state::AppState;

/// Routes mounted at `/cases`.
///
/// ```text
/// GET    /                               -> list_cases
/// POST   /                               -> create_case
/// GET    /export                         -> export_cases
/// GET    /prioritized                    -> prioritized
/// GET    /statistics                     -> statistics
/// GET    /{id}                           -> get_case
/// PATCH  /{id}                           -> update_case
/// GET    /{id}/updates                   -> list_updates
/// POST   /{id}/updates                   -> add_update
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(case::list_cases).post(case::create_case))
        .route("/export", get(case::export_cases))
        .route("/prioritized", get(case::prioritized))
        .route("/statistics", get(case::statistics))
        .route("/{id}", get(case::get_case).patch(case::update_case))
        .route(
            "/{id}/updates",
            get(case::list_updates).post(case::add_update),
        )
}

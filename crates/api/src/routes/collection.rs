//! Route definitions for the `/collections` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::collection;
use crate::state::AppState;

/// Routes mounted at `/collections`.
///
/// ```text
/// GET    /                               -> list_collections
/// POST   /                               -> create_collection
/// GET    /{id}/status                    -> collection_status
/// POST   /{id}/machines                  -> add_machine
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(collection::list_collections).post(collection::create_collection),
        )
        .route("/{id}/status", get(collection::collection_status))
        .route("/{id}/machines", post(collection::add_machine))
}

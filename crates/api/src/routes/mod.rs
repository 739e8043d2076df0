pub mod case;
pub mod collection;
pub mod health;
pub mod machine;
pub mod notification;
pub mod warning;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /machines                                        list, create (manager)
/// /machines/status-summary                         aggregate + per-status counts
/// /machines/{id}                                   get, manual status report (PATCH)
/// /machines/{id}/status-history                    status change history
/// /machines/{id}/warnings                          list, create
/// /machines/{id}/warnings/resolve                  bulk resolve (all or by text)
/// /machines/{id}/assignments                       assign user (manager)
/// /machines/{id}/assignments/{user_id}             unassign user (manager)
///
/// /warnings/{id}/resolve                           resolve one warning
///
/// /cases                                           list, create
/// /cases/prioritized                               open cases by urgency
/// /cases/statistics                                counts, resolution time, top machines
/// /cases/{id}                                      detail, update (PATCH)
/// /cases/{id}/updates                              list, add comment
///
/// /collections                                     list, create (manager)
/// /collections/{id}/status                         aggregate status
/// /collections/{id}/machines                       add machine (manager)
///
/// /notifications                                   list
/// /notifications/unread-count                      unread count
/// /notifications/read-all                          mark all read
/// /notifications/{id}/read                         mark one read
/// /notifications/preferences                       list email preferences
/// /notifications/preferences/{type}                set email preference (PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/machines", machine::router())
        .nest("/warnings", warning::router())
        .nest("/cases", case::router())
        .nest("/collections", collection::router())
        .nest("/notifications", notification::router())
}

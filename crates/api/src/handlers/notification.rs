//! Handlers for the `/notifications` resource.
//!
//! All endpoints act on the authenticated user's own notifications.

use axum::extract::{Path, Query, State};
use axum::Json;
use millwright_core::error::CoreError;
use millwright_core::notification::NotificationType;
use millwright_core::types::DbId;
use millwright_db::models::notification::{Notification, NotificationFilter};
use millwright_db::repositories::{NotificationPreferenceRepo, NotificationRepo};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query / response types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /notifications`.
#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    /// If `true`, return only unread notifications. Defaults to `false`.
    pub unread_only: Option<bool>,
    /// Only notifications of this type.
    pub notification_type: Option<NotificationType>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// Effective email preference for one notification type.
#[derive(Debug, Serialize)]
pub struct PreferenceView {
    pub notification_type: NotificationType,
    pub email: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePreferenceRequest {
    pub email: bool,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<NotificationQuery>,
) -> AppResult<Json<DataResponse<Vec<Notification>>>> {
    let page = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    };
    let filter = NotificationFilter {
        unread_only: params.unread_only.unwrap_or(false),
        notification_type: params.notification_type,
    };

    let notifications = NotificationRepo::list_for_user(
        &state.pool,
        auth.user_id,
        &filter,
        page.limit(),
        page.offset(),
    )
    .await?;

    Ok(Json(DataResponse { data: notifications }))
}

/// POST /api/v1/notifications/{id}/read
///
/// Marking an already-read notification again succeeds and keeps the first
/// `read_at`. 404 if the notification does not belong to the caller.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Notification>>> {
    let notification = NotificationRepo::mark_read(&state.pool, notification_id, auth.user_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Notification",
            id: notification_id,
        })?;

    Ok(Json(DataResponse { data: notification }))
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_read(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let count = NotificationRepo::mark_all_read(&state.pool, auth.user_id).await?;

    Ok(Json(serde_json::json!({
        "data": { "marked_read": count }
    })))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let count = NotificationRepo::unread_count(&state.pool, auth.user_id).await?;

    Ok(Json(serde_json::json!({
        "data": { "count": count }
    })))
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications/preferences
///
/// One entry per notification type. Types without a stored row report
/// `email: false`.
pub async fn get_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<PreferenceView>>>> {
    let stored = NotificationPreferenceRepo::list_for_user(&state.pool, auth.user_id).await?;
    let prefs = NotificationType::ALL
        .iter()
        .map(|t| PreferenceView {
            notification_type: *t,
            email: stored
                .iter()
                .any(|p| p.notification_type == *t && p.email),
        })
        .collect();
    Ok(Json(DataResponse { data: prefs }))
}

/// PUT /api/v1/notifications/preferences/{type}
pub async fn update_preference(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notification_type): Path<String>,
    Json(input): Json<UpdatePreferenceRequest>,
) -> AppResult<Json<DataResponse<PreferenceView>>> {
    let notification_type: NotificationType = notification_type.parse()?;
    let pref =
        NotificationPreferenceRepo::upsert(&state.pool, auth.user_id, notification_type, input.email)
            .await?;
    Ok(Json(DataResponse {
        data: PreferenceView {
            notification_type: pref.notification_type,
            email: pref.email,
        },
    }))
}

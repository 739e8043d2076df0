//! Handlers for warnings, both machine-scoped and by warning id.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use millwright_core::types::DbId;
use millwright_core::warning::WarningSeverity;
use millwright_db::models::warning::{Warning, WarningFilter};
use millwright_db::repositories::WarningRepo;
use serde::{Deserialize, Serialize};

use crate::engine::machines;
use crate::engine::warnings::{self, Selection};
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WarningListQuery {
    #[serde(default)]
    pub active_only: bool,
    pub severity: Option<WarningSeverity>,
}

/// Body of `POST /machines/{id}/warnings`.
#[derive(Debug, Deserialize)]
pub struct CreateWarningRequest {
    pub text: String,
    #[serde(default)]
    pub severity: WarningSeverity,
    /// Fail with 409 instead of returning an identical active warning.
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Deserialize)]
pub struct ResolveWarningRequest {
    pub note: Option<String>,
}

/// Body of `POST /machines/{id}/warnings/resolve`.
#[derive(Debug, Deserialize)]
pub struct BulkResolveRequest {
    /// Resolve only the active warning with this text; all when absent.
    pub text: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkResolveResponse {
    pub resolved: usize,
    pub warnings: Vec<Warning>,
}

/// GET /api/v1/machines/{id}/warnings
pub async fn list_warnings(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(machine_id): Path<DbId>,
    Query(params): Query<WarningListQuery>,
) -> AppResult<Json<DataResponse<Vec<Warning>>>> {
    machines::find(&state, machine_id).await?;
    let filter = WarningFilter {
        active_only: params.active_only,
        severity: params.severity,
    };
    let list = WarningRepo::list_for_machine(&state.pool, machine_id, &filter).await?;
    Ok(Json(DataResponse { data: list }))
}

/// POST /api/v1/machines/{id}/warnings
///
/// Returns 201 when a warning was created, 200 with the existing warning when
/// an identical one was already active.
pub async fn create_warning(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(machine_id): Path<DbId>,
    Json(input): Json<CreateWarningRequest>,
) -> AppResult<impl IntoResponse> {
    let raised = warnings::create_warning(
        &state,
        auth.actor(),
        machine_id,
        &input.text,
        input.severity,
        input.strict,
    )
    .await?;
    let status = if raised.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(DataResponse { data: raised.warning })))
}

/// POST /api/v1/machines/{id}/warnings/resolve
pub async fn resolve_machine_warnings(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(machine_id): Path<DbId>,
    Json(input): Json<BulkResolveRequest>,
) -> AppResult<Json<DataResponse<BulkResolveResponse>>> {
    let selection = match input.text.as_deref() {
        Some(text) => Selection::Text(text),
        None => Selection::All,
    };
    let resolved = warnings::resolve_many(
        &state,
        auth.actor(),
        machine_id,
        selection,
        input.note.as_deref(),
    )
    .await?;
    Ok(Json(DataResponse {
        data: BulkResolveResponse {
            resolved: resolved.len(),
            warnings: resolved,
        },
    }))
}

/// POST /api/v1/warnings/{id}/resolve
pub async fn resolve_warning(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(warning_id): Path<DbId>,
    Json(input): Json<ResolveWarningRequest>,
) -> AppResult<Json<DataResponse<Warning>>> {
    let warning =
        warnings::resolve_warning(&state, auth.actor(), warning_id, input.note.as_deref()).await?;
    Ok(Json(DataResponse { data: warning }))
}

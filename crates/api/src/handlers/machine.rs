//! Handlers for the `/machines` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use millwright_core::machine_status::MachineStatus;
use millwright_core::types::DbId;
use millwright_db::models::machine::{CreateMachine, Machine, MachineAssignment, MachineFilter};
use millwright_db::models::machine_status_change::MachineStatusChange;
use millwright_db::repositories::{MachineRepo, MachineStatusChangeRepo};
use serde::{Deserialize, Serialize};

use crate::engine::machines::{self, StatusReport, StatusSummary};
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireManager;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /machines`.
#[derive(Debug, Deserialize)]
pub struct MachineListQuery {
    pub status: Option<MachineStatus>,
    pub collection_id: Option<DbId>,
    /// Only machines the caller is assigned to.
    #[serde(default)]
    pub assigned_to_me: bool,
}

/// Body of `PATCH /machines/{id}`.
#[derive(Debug, Deserialize)]
pub struct StatusReportRequest {
    pub status: MachineStatus,
    pub reason: Option<String>,
}

/// Body of `POST /machines/{id}/assignments`.
#[derive(Debug, Deserialize)]
pub struct AssignUserRequest {
    pub user_id: DbId,
}

#[derive(Debug, Serialize)]
pub struct MachineDetail {
    #[serde(flatten)]
    pub machine: Machine,
    pub assignments: Vec<MachineAssignment>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/machines
pub async fn list_machines(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<MachineListQuery>,
) -> AppResult<Json<DataResponse<Vec<Machine>>>> {
    let filter = MachineFilter {
        status: params.status,
        collection_id: params.collection_id,
        assigned_to: params.assigned_to_me.then_some(auth.user_id),
    };
    let machines = MachineRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: machines }))
}

/// POST /api/v1/machines
///
/// Manager only. Returns 201 with the machine in status `OK`.
pub async fn create_machine(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Json(input): Json<CreateMachine>,
) -> AppResult<impl IntoResponse> {
    let machine = machines::create_machine(&state, auth.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: machine })))
}

/// GET /api/v1/machines/status-summary
pub async fn status_summary(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<StatusSummary>>> {
    let summary = machines::status_summary(&state).await?;
    Ok(Json(DataResponse { data: summary }))
}

/// GET /api/v1/machines/{id}
pub async fn get_machine(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(machine_id): Path<DbId>,
) -> AppResult<Json<DataResponse<MachineDetail>>> {
    let machine = machines::find(&state, machine_id).await?;
    let assignments = MachineRepo::list_assignments(&state.pool, machine_id).await?;
    Ok(Json(DataResponse {
        data: MachineDetail { machine, assignments },
    }))
}

/// PATCH /api/v1/machines/{id}
///
/// Manual status report. The reported status is applied through warnings and
/// cases; the machine's status stays derived.
pub async fn report_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(machine_id): Path<DbId>,
    Json(input): Json<StatusReportRequest>,
) -> AppResult<Json<DataResponse<StatusReport>>> {
    let report = machines::report_status(
        &state,
        auth.actor(),
        machine_id,
        input.status,
        input.reason.as_deref(),
    )
    .await?;
    Ok(Json(DataResponse { data: report }))
}

/// GET /api/v1/machines/{id}/status-history
pub async fn status_history(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(machine_id): Path<DbId>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<MachineStatusChange>>>> {
    machines::find(&state, machine_id).await?;
    let history = MachineStatusChangeRepo::list_for_machine(
        &state.pool,
        machine_id,
        page.limit(),
        page.offset(),
    )
    .await?;
    Ok(Json(DataResponse { data: history }))
}

/// POST /api/v1/machines/{id}/assignments
pub async fn assign_user(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Path(machine_id): Path<DbId>,
    Json(input): Json<AssignUserRequest>,
) -> AppResult<impl IntoResponse> {
    let assignment = machines::assign_user(&state, auth.actor(), machine_id, input.user_id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: assignment })))
}

/// DELETE /api/v1/machines/{id}/assignments/{user_id}
pub async fn unassign_user(
    _manager: RequireManager,
    State(state): State<AppState>,
    Path((machine_id, user_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    machines::unassign_user(&state, machine_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

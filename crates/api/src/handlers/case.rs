//! Handlers for the `/cases` resource.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use millwright_core::case_workflow::{CasePriority, CaseStatus};
use millwright_core::error::CoreError;
use millwright_core::types::{DbId, Timestamp};
use millwright_db::models::case::{
    Case, CaseAssignmentChange, CaseComment, CaseFilter, CaseStatusChange, CreateCase, StatsWindow,
};
use millwright_db::repositories::CaseRepo;
use serde::{Deserialize, Deserializer, Serialize};

use crate::engine::cases::{self, CaseChanges, CaseStatistics, PrioritizedCase};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CaseListQuery {
    pub status: Option<CaseStatus>,
    pub machine_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub machine_id: Option<DbId>,
}

/// Body of `PATCH /cases/{id}`. Present fields are applied together or not
/// at all.
#[derive(Debug, Deserialize)]
pub struct UpdateCaseRequest {
    pub status: Option<CaseStatus>,
    pub priority: Option<CasePriority>,
    /// Absent: leave as is. `null`: unassign. A user id: reassign.
    #[serde(default, deserialize_with = "present")]
    pub assigned_to: Option<Option<DbId>>,
}

/// Distinguish an explicit `null` from a missing field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CaseDetail {
    #[serde(flatten)]
    pub case: Case,
    pub status_history: Vec<CaseStatusChange>,
    pub assignment_history: Vec<CaseAssignmentChange>,
    pub comments: Vec<CaseComment>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/cases
pub async fn list_cases(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<CaseListQuery>,
) -> AppResult<Json<DataResponse<Vec<Case>>>> {
    let page = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    };
    let filter = CaseFilter {
        status: params.status,
        machine_id: params.machine_id,
    };
    let list = CaseRepo::list(&state.pool, &filter, page.limit(), page.offset()).await?;
    Ok(Json(DataResponse { data: list }))
}

/// POST /api/v1/cases
pub async fn create_case(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateCase>,
) -> AppResult<impl IntoResponse> {
    let case = cases::create_case(&state, auth.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: case })))
}

/// GET /api/v1/cases/export
///
/// CSV report of every case matching the `status` / `machine_id` filters.
pub async fn export_cases(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<CaseListQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = CaseFilter {
        status: params.status,
        machine_id: params.machine_id,
    };
    let report = cases::export_csv(&state, &filter).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"cases.csv\""),
        ],
        report,
    ))
}

/// GET /api/v1/cases/prioritized
pub async fn prioritized(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<PrioritizedCase>>>> {
    let queue = cases::prioritized(&state, page.limit() as usize).await?;
    Ok(Json(DataResponse { data: queue }))
}

/// GET /api/v1/cases/statistics
pub async fn statistics(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<StatisticsQuery>,
) -> AppResult<Json<DataResponse<CaseStatistics>>> {
    let window = StatsWindow {
        from: params.from,
        to: params.to,
        machine_id: params.machine_id,
    };
    let stats = cases::statistics(&state, window).await?;
    Ok(Json(DataResponse { data: stats }))
}

/// GET /api/v1/cases/{id}
pub async fn get_case(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(case_id): Path<DbId>,
) -> AppResult<Json<DataResponse<CaseDetail>>> {
    let case = CaseRepo::find_by_id(&state.pool, case_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Case",
            id: case_id,
        })?;
    let status_history = CaseRepo::status_history(&state.pool, case_id).await?;
    let assignment_history = CaseRepo::assignment_history(&state.pool, case_id).await?;
    let comments = CaseRepo::list_comments(&state.pool, case_id).await?;
    Ok(Json(DataResponse {
        data: CaseDetail {
            case,
            status_history,
            assignment_history,
            comments,
        },
    }))
}

/// PATCH /api/v1/cases/{id}
pub async fn update_case(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(case_id): Path<DbId>,
    Json(input): Json<UpdateCaseRequest>,
) -> AppResult<Json<DataResponse<Case>>> {
    let changes = CaseChanges {
        priority: input.priority,
        assignee: input.assigned_to,
        status: input.status,
    };
    if changes.is_empty() {
        return Err(AppError::BadRequest(
            "Provide at least one of: status, priority, assigned_to".into(),
        ));
    }
    let case = cases::update(&state, auth.actor(), case_id, changes).await?;
    Ok(Json(DataResponse { data: case }))
}

/// GET /api/v1/cases/{id}/updates
pub async fn list_updates(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(case_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<CaseComment>>>> {
    if CaseRepo::find_by_id(&state.pool, case_id).await?.is_none() {
        return Err(CoreError::NotFound {
            entity: "Case",
            id: case_id,
        }
        .into());
    }
    let comments = CaseRepo::list_comments(&state.pool, case_id).await?;
    Ok(Json(DataResponse { data: comments }))
}

/// POST /api/v1/cases/{id}/updates
pub async fn add_update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(case_id): Path<DbId>,
    Json(input): Json<AddCommentRequest>,
) -> AppResult<impl IntoResponse> {
    let comment = cases::add_comment(&state, auth.actor(), case_id, &input.text).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: comment })))
}

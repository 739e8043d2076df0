//! Handlers for the `/collections` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use millwright_core::error::CoreError;
use millwright_core::machine::validate_collection_name;
use millwright_core::machine_status::{aggregate_status, MachineStatus};
use millwright_core::types::DbId;
use millwright_db::models::collection::{CreateCollection, MachineCollection};
use millwright_db::models::machine::{Machine, MachineFilter};
use millwright_db::repositories::{CollectionRepo, MachineRepo};
use serde::{Deserialize, Serialize};

use crate::engine::machines;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireManager;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddMachineRequest {
    pub machine_id: DbId,
}

#[derive(Debug, Serialize)]
pub struct CollectionStatus {
    pub collection: MachineCollection,
    /// Most severe status among the member machines; `OK` when empty.
    pub status: MachineStatus,
    pub machines: Vec<Machine>,
}

async fn find_collection(state: &AppState, id: DbId) -> AppResult<MachineCollection> {
    Ok(CollectionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "MachineCollection",
            id,
        })?)
}

/// GET /api/v1/collections
pub async fn list_collections(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<MachineCollection>>>> {
    let list = CollectionRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: list }))
}

/// POST /api/v1/collections
pub async fn create_collection(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Json(mut input): Json<CreateCollection>,
) -> AppResult<impl IntoResponse> {
    input.name = input.name.trim().to_string();
    validate_collection_name(&input.name)?;
    let collection = CollectionRepo::create(&state.pool, &input, auth.user_id).await?;
    tracing::info!(collection_id = collection.id, name = %collection.name, "Collection created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: collection })))
}

/// GET /api/v1/collections/{id}/status
pub async fn collection_status(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(collection_id): Path<DbId>,
) -> AppResult<Json<DataResponse<CollectionStatus>>> {
    let collection = find_collection(&state, collection_id).await?;
    let filter = MachineFilter {
        collection_id: Some(collection_id),
        ..MachineFilter::default()
    };
    let members = MachineRepo::list(&state.pool, &filter).await?;
    let status = aggregate_status(members.iter().map(|m| m.status));
    Ok(Json(DataResponse {
        data: CollectionStatus {
            collection,
            status,
            machines: members,
        },
    }))
}

/// POST /api/v1/collections/{id}/machines
///
/// Returns 201 when the machine was added, 200 when it was already a member.
pub async fn add_machine(
    _manager: RequireManager,
    State(state): State<AppState>,
    Path(collection_id): Path<DbId>,
    Json(input): Json<AddMachineRequest>,
) -> AppResult<impl IntoResponse> {
    find_collection(&state, collection_id).await?;
    machines::find(&state, input.machine_id).await?;
    let added = CollectionRepo::add_machine(&state.pool, collection_id, input.machine_id).await?;
    let status = if added { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(DataResponse {
            data: serde_json::json!({ "added": added }),
        }),
    ))
}

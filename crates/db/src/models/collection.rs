//! Machine collection model and DTOs.

use millwright_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `machine_collections` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MachineCollection {
    pub id: DbId,
    pub name: String,
    pub description: String,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCollection {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

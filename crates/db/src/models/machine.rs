//! Machine entity model and DTOs.

use chrono::NaiveDate;
use millwright_core::machine_status::MachineStatus;
use millwright_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A machine together with its derived status.
///
/// `status` is not a column: every query selecting a `Machine` computes it
/// from open cases and active warnings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Machine {
    pub id: DbId,
    pub name: String,
    pub model_number: String,
    pub serial_number: String,
    pub description: String,
    pub importance: i32,
    pub installed_on: Option<NaiveDate>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[sqlx(try_from = "String")]
    pub status: MachineStatus,
}

/// DTO for creating a machine.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMachine {
    pub name: String,
    #[serde(default)]
    pub model_number: String,
    pub serial_number: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub importance: i32,
    pub installed_on: Option<NaiveDate>,
}

/// Filters for listing machines. All filters are optional and combine with AND.
#[derive(Debug, Clone, Default)]
pub struct MachineFilter {
    pub status: Option<MachineStatus>,
    pub collection_id: Option<DbId>,
    pub assigned_to: Option<DbId>,
}

/// A row from the `machine_assignments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MachineAssignment {
    pub id: DbId,
    pub machine_id: DbId,
    pub user_id: DbId,
    pub assigned_by: Option<DbId>,
    pub assigned_at: Timestamp,
}

/// Number of machines currently in a given status.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MachineStatusCount {
    #[sqlx(try_from = "String")]
    pub status: MachineStatus,
    pub count: i64,
}

//! Repository for `machine_collections` and their membership table.

use millwright_core::types::DbId;
use sqlx::PgPool;

use crate::models::collection::{CreateCollection, MachineCollection};

const COLUMNS: &str = "id, name, description, created_by, created_at";

pub struct CollectionRepo;

impl CollectionRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateCollection,
        created_by: DbId,
    ) -> Result<MachineCollection, sqlx::Error> {
        let query = format!(
            "INSERT INTO machine_collections (name, description, created_by) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MachineCollection>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<MachineCollection>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM machine_collections WHERE id = $1");
        sqlx::query_as::<_, MachineCollection>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<MachineCollection>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM machine_collections ORDER BY name");
        sqlx::query_as::<_, MachineCollection>(&query)
            .fetch_all(pool)
            .await
    }

    /// Add a machine to a collection. Returns `false` if it was already a member.
    pub async fn add_machine(
        pool: &PgPool,
        collection_id: DbId,
        machine_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO machine_collection_members (collection_id, machine_id) \
             VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(collection_id)
        .bind(machine_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

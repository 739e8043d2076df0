//! Repository for the `users` table.

use millwright_core::roles::Role;
use millwright_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::user::{CreateUser, User};

/// Column list for `users` queries.
const COLUMNS: &str = "id, username, email, role, is_active, created_at";

pub struct UserRepo;

impl UserRepo {
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (username, email, role) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .bind(input.role.as_str())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: DbId,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Active users holding any of `roles`.
    pub async fn list_active_by_roles(
        executor: impl PgExecutor<'_>,
        roles: &[Role],
    ) -> Result<Vec<User>, sqlx::Error> {
        let names: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
        let query = format!(
            "SELECT {COLUMNS} FROM users \
             WHERE is_active AND role = ANY($1) \
             ORDER BY id"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&names)
            .fetch_all(executor)
            .await
    }

    /// Active users among `ids`. Unknown or inactive ids are silently dropped.
    pub async fn list_active_by_ids(
        executor: impl PgExecutor<'_>,
        ids: &[DbId],
    ) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users \
             WHERE is_active AND id = ANY($1) \
             ORDER BY id"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(ids)
            .fetch_all(executor)
            .await
    }

    /// Deactivate a user. Returns `true` if a row was updated.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET is_active = false WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

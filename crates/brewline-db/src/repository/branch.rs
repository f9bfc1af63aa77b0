//! # Branch Repository

use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use brewline_core::validation::validate_name;
use brewline_core::Branch;

use super::now;
use crate::error::{DbError, DbResult};

/// Repository for store locations.
#[derive(Debug, Clone)]
pub struct BranchRepository {
    pool: SqlitePool,
}

impl BranchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BranchRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Branch>> {
        let branch = sqlx::query_as::<_, Branch>(
            "SELECT id, name, is_active, created_at FROM branches WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(branch)
    }

    /// Like [`get`](Self::get), but a missing branch is an error.
    pub async fn require(&self, id: &str) -> DbResult<Branch> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Branch", id))
    }

    pub async fn list(&self) -> DbResult<Vec<Branch>> {
        let branches = sqlx::query_as::<_, Branch>(
            "SELECT id, name, is_active, created_at FROM branches ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(branches)
    }

    /// Creates a branch. `id` defaults to a fresh UUID.
    pub async fn create(&self, id: Option<&str>, name: &str) -> DbResult<Branch> {
        let branch = Branch {
            id: id.map(str::to_string).unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: validate_name(name)?,
            is_active: true,
            created_at: now(),
        };

        debug!(id = %branch.id, name = %branch.name, "Creating branch");

        sqlx::query("INSERT INTO branches (id, name, is_active, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&branch.id)
            .bind(&branch.name)
            .bind(branch.is_active)
            .bind(branch.created_at)
            .execute(&self.pool)
            .await?;

        Ok(branch)
    }
}

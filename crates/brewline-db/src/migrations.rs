//! # Schema Migrations
//!
//! The SQL in `migrations/sqlite/` is compiled into the binary and applied
//! by [`Database::new`](crate::Database::new).
//!
//! ```text
//! 0001_initial_schema.sql   branches, users, catalog, recipes, shifts,
//!                           orders, order sequences, stock, ledger
//! ```
//!
//! Files are append-only: a change to the schema is a new `NNNN_*.sql`,
//! never an edit to one that has shipped (sqlx checks the checksums).

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies whatever has not run yet. Safe to call on every start.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(embedded = MIGRATOR.migrations.len(), "Applying migrations");
    MIGRATOR.run(pool).await?;
    info!("Schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?;

    Ok((MIGRATOR.migrations.len(), applied as usize))
}

//! # Persistence Errors
//!
//! ```text
//! sqlx::Error ──────┐
//! CoreError ────────┼──► DbError ──► CheckoutError ──► ApiError (status + body)
//! ValidationError ──┘              └───────────────► ApiError
//! ```
//!
//! Constraint failures are classified here once, so callers match on
//! `UniqueViolation` / `ForeignKeyViolation` / `Busy` instead of parsing
//! SQLite messages.

use brewline_core::{CoreError, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// `field` is the constraint's column list as SQLite reports it.
    ///
    /// - Duplicate (branch, order_number) or (branch, idempotency_key)
    /// - Duplicate (menu item, ingredient) recipe line
    /// - Second open shift for a cashier
    #[error("Duplicate {field}: {value}")]
    UniqueViolation { field: String, value: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The write conflicts with existing data (e.g. deleting a sold menu item).
    #[error("{0}")]
    Conflict(String),

    /// A business rule rejected the write.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// SQLite could not take the write lock within the busy timeout.
    #[error("Database is busy")]
    Busy,

    #[error("Cannot open database: {0}")]
    ConnectionFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// No connection became free within the acquire timeout.
    #[error("No database connection available")]
    PoolExhausted,

    #[error("Unexpected database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether this is a unique violation on a constraint naming `column`.
    pub fn is_unique_on(&self, column: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field, .. } if field.contains(column))
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

/// ```text
/// RowNotFound                     → NotFound
/// Database, unique constraint     → UniqueViolation { field: "table.col, ..." }
/// Database, foreign key           → ForeignKeyViolation
/// Database, SQLITE_BUSY (5/261/517) → Busy
/// PoolTimedOut                    → PoolExhausted
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        let db_err = match err {
            sqlx::Error::Database(db_err) => db_err,
            sqlx::Error::RowNotFound => return DbError::not_found("Record", "unknown"),
            sqlx::Error::PoolTimedOut => return DbError::PoolExhausted,
            sqlx::Error::PoolClosed => {
                return DbError::ConnectionFailed("pool is closed".to_string())
            }
            other => return DbError::Internal(other.to_string()),
        };

        let message = db_err.message().to_string();
        match db_err.kind() {
            ErrorKind::UniqueViolation => {
                // "UNIQUE constraint failed: orders.branch_id, orders.order_number"
                let field = message
                    .rsplit_once(": ")
                    .map(|(_, columns)| columns.to_string())
                    .unwrap_or_else(|| message.clone());
                DbError::duplicate(field, "already exists")
            }
            ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
            _ if matches!(db_err.code().as_deref(), Some("5" | "261" | "517")) => DbError::Busy,
            _ => DbError::QueryFailed(message),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

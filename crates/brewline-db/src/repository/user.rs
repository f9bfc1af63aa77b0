//! # User Repository
//!
//! Staff accounts. The password hash is only ever read through
//! [`UserRepository::get_credentials`].

use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use brewline_core::validation::{validate_id, validate_required_text};
use brewline_core::{Role, User};

use super::now;
use crate::error::DbResult;
use crate::password::hash_password;

const USER_COLUMNS: &str = "id, username, name, role, branch_id, is_active, created_at";

/// A user row together with its stored password hash.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredentials {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

/// Input for [`UserRepository::create`].
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Fixed id for seeded accounts; a UUID otherwise.
    pub id: Option<String>,
    pub username: String,
    pub name: String,
    pub password: String,
    pub role: Role,
    pub branch_id: Option<String>,
}

/// Repository for staff accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ?1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Looks up an account with its hash for the password check.
    pub async fn get_credentials(&self, username: &str) -> DbResult<Option<UserCredentials>> {
        let row = sqlx::query_as::<_, UserCredentials>(&format!(
            "SELECT {}, password_hash FROM users WHERE username = ?1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Lists accounts, optionally narrowed to a branch and/or role.
    pub async fn list(&self, branch_id: Option<&str>, role: Option<Role>) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users
             WHERE (?1 IS NULL OR branch_id = ?1)
               AND (?2 IS NULL OR role = ?2)
             ORDER BY username",
            USER_COLUMNS
        ))
        .bind(branch_id)
        .bind(role)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Creates an account, hashing the password.
    pub async fn create(&self, new_user: &NewUser) -> DbResult<User> {
        let user = User {
            id: match &new_user.id {
                Some(id) => validate_id("id", id)?,
                None => Uuid::new_v4().to_string(),
            },
            username: validate_required_text("username", &new_user.username, 64)?,
            name: validate_required_text("name", &new_user.name, 200)?,
            role: new_user.role,
            branch_id: new_user.branch_id.clone(),
            is_active: true,
            created_at: now(),
        };
        let password = validate_required_text("password", &new_user.password, 256)?;
        let password_hash = hash_password(&password)?;

        debug!(id = %user.id, username = %user.username, role = %user.role, "Creating user");

        sqlx::query(
            "INSERT INTO users (id, username, name, password_hash, role, branch_id, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.name)
        .bind(&password_hash)
        .bind(user.role)
        .bind(&user.branch_id)
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    /// Activates or deactivates an account. Returns false when no such user.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<bool> {
        let result = sqlx::query("UPDATE users SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::verify_password;
    use crate::{Database, DbConfig};

    fn cashier(username: &str) -> NewUser {
        NewUser {
            id: None,
            username: username.to_string(),
            name: "Test Cashier".to_string(),
            password: "demo123".to_string(),
            role: Role::Cashier,
            branch_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch_credentials() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let created = db.users().create(&cashier("cashier9")).await.unwrap();

        let creds = db.users().get_credentials("cashier9").await.unwrap().unwrap();
        assert_eq!(creds.user.id, created.id);
        assert_eq!(creds.user.role, Role::Cashier);
        assert!(verify_password("demo123", &creds.password_hash));

        assert!(db.users().get_credentials("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_role_and_deactivate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = db.users().create(&cashier("a")).await.unwrap();
        db.users()
            .create(&NewUser {
                role: Role::Admin,
                ..cashier("b")
            })
            .await
            .unwrap();

        let cashiers = db.users().list(None, Some(Role::Cashier)).await.unwrap();
        assert_eq!(cashiers.len(), 1);
        assert_eq!(cashiers[0].username, "a");

        assert!(db.users().set_active(&a.id, false).await.unwrap());
        assert!(!db.users().get_by_id(&a.id).await.unwrap().unwrap().is_active);
        assert!(!db.users().set_active("missing", false).await.unwrap());
    }
}

//! Password check.
//!
//! ```text
//! POST /api/auth/login { username, password }
//!   missing field              → 400
//!   unknown user / bad password → 401 (same message for both)
//!   inactive account           → 403
//!   ok                         → 200 { success, user }
//! ```
//! Session handling is left to the client.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use brewline_core::ValidationError;
use brewline_db::password::verify_password;

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/auth/login", post(login))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let username = body
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ValidationError::required("username"))?;
    let password = body
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ValidationError::required("password"))?;

    let Some(credentials) = state.db.users().get_credentials(username).await? else {
        warn!(username = %username, "Login failed: unknown user");
        return Err(ApiError::new(StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS", INVALID_CREDENTIALS));
    };

    if !verify_password(password, &credentials.password_hash) {
        warn!(username = %username, "Login failed: wrong password");
        return Err(ApiError::new(StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS", INVALID_CREDENTIALS));
    }

    if !credentials.user.is_active {
        warn!(username = %username, "Login refused: account inactive");
        return Err(ApiError::new(
            StatusCode::FORBIDDEN,
            "ACCOUNT_INACTIVE",
            "Account is inactive",
        ));
    }

    info!(user_id = %credentials.user.id, role = %credentials.user.role, "User logged in");
    Ok(Json(json!({ "success": true, "user": credentials.user })))
}

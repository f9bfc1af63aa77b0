//! # Brewline Server
//!
//! HTTP API for branch tills and the back office.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Till ──► axum Router ──► handler ──► brewline-db ──► SQLite            │
//! │             │               │             │                             │
//! │        TraceLayer       ApiJson<T>   CheckoutService                    │
//! │        CorsLayer        ApiError     Repositories                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every response body carries `success`. Failures add `error`, `code` and,
//! for server faults, `details`.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Builds the full application with middleware applied.
pub fn app(state: AppState) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

//! HTTP route modules. Each exposes `routes()` and the app merges them.

pub mod auth;
pub mod health;
pub mod ingredients;
pub mod inventory;
pub mod menu_items;
pub mod orders;
pub mod recipes;
pub mod shifts;

use axum::Router;

use crate::state::AppState;

/// Every API route, still waiting for state.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(orders::routes())
        .merge(shifts::routes())
        .merge(menu_items::routes())
        .merge(recipes::routes())
        .merge(ingredients::routes())
        .merge(inventory::routes())
}

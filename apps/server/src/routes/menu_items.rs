//! Menu administration.
//!
//! Prices are integer cents, tax rates basis points.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use brewline_core::ValidationError;
use brewline_db::repository::catalog::{MenuItemFilter, MenuItemPatch, NewMenuItem};

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/menu-items", get(list_menu_items).post(create_menu_item))
        .route(
            "/api/menu-items/{id}",
            get(get_menu_item)
                .patch(update_menu_item)
                .delete(delete_menu_item),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemQuery {
    category: Option<String>,
    is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMenuItemBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    category: String,
    price_cents: Option<i64>,
    tax_rate_bps: Option<u32>,
    is_active: Option<bool>,
    sort_order: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMenuItemBody {
    name: Option<String>,
    category: Option<String>,
    price_cents: Option<i64>,
    tax_rate_bps: Option<u32>,
    is_active: Option<bool>,
    sort_order: Option<i64>,
}

/// GET /api/menu-items - items with their recipes
async fn list_menu_items(
    State(state): State<AppState>,
    Query(query): Query<MenuItemQuery>,
) -> ApiResult<Json<Value>> {
    let items = state
        .db
        .catalog()
        .list_menu_items(&MenuItemFilter {
            category: query.category,
            is_active: query.is_active,
        })
        .await?;

    Ok(Json(json!({ "success": true, "menuItems": items })))
}

/// GET /api/menu-items/{id}
async fn get_menu_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let item = state
        .db
        .catalog()
        .resolve_menu_item(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Menu item not found"))?;

    Ok(Json(json!({ "success": true, "menuItem": item })))
}

/// POST /api/menu-items
async fn create_menu_item(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateMenuItemBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let new_item = NewMenuItem {
        id: None,
        name: body.name,
        category: body.category,
        price_cents: body
            .price_cents
            .ok_or_else(|| ValidationError::required("priceCents"))?,
        tax_rate_bps: body.tax_rate_bps,
        is_active: body.is_active,
        sort_order: body.sort_order,
    };

    let item = state.db.catalog().create_menu_item(&new_item).await?;
    info!(id = %item.id, name = %item.name, "Menu item created");

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "menuItem": item }))))
}

/// PATCH /api/menu-items/{id}
async fn update_menu_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateMenuItemBody>,
) -> ApiResult<Json<Value>> {
    let patch = MenuItemPatch {
        name: body.name,
        category: body.category,
        price_cents: body.price_cents,
        tax_rate_bps: body.tax_rate_bps,
        is_active: body.is_active,
        sort_order: body.sort_order,
    };

    let item = state.db.catalog().update_menu_item(&id, &patch).await?;

    Ok(Json(json!({ "success": true, "menuItem": item })))
}

/// DELETE /api/menu-items/{id} - refused once the item has been sold
async fn delete_menu_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.db.catalog().delete_menu_item(&id).await?;

    Ok(Json(json!({ "success": true, "message": "Menu item deleted" })))
}

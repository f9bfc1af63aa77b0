//! # Catalog Repository
//!
//! Menu items, ingredients, and the recipes linking them.
//!
//! ## Catalog Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  menu_items ─────┐                                                      │
//! │  (price, tax,    │ 1..n                                                 │
//! │   recipe_version)▼                                                      │
//! │               recipes ──────────► ingredients                           │
//! │               (quantity_required,  (unit, reorder_threshold)            │
//! │                unit copy)                                               │
//! │                                                                         │
//! │  resolve_menu_items(ids) ──► HashMap<id, ResolvedMenuItem>              │
//! │                              (item + its recipe, ready for pricing)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Adding or removing a recipe line bumps the item's `recipe_version` in the
//! same transaction; order items record the version they were sold under.

use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use brewline_core::validation::{
    validate_category, validate_id, validate_name, validate_non_negative_quantity,
    validate_price_cents, validate_recipe_quantity, validate_tax_rate_bps, validate_unit,
};
use brewline_core::{
    Ingredient, InventoryTransactionType, MenuItem, Quantity, RecipeLine, ResolvedMenuItem,
    StockPolicy, ValidationError, DEFAULT_TAX_RATE_BPS,
};

use super::inventory::{InventoryRepository, StockMovement};
use super::now;
use crate::error::{DbError, DbResult};

const MENU_ITEM_COLUMNS: &str = "id, name, category, price_cents, tax_rate_bps, is_active, \
     sort_order, recipe_version, created_at, updated_at";

const INGREDIENT_COLUMNS: &str =
    "id, name, unit, cost_per_unit_cents, reorder_threshold, created_at";

const RECIPE_SELECT: &str = "SELECT r.id, r.menu_item_id, r.ingredient_id, \
     i.name AS ingredient_name, r.quantity_required, r.unit, r.created_at \
     FROM recipes r JOIN ingredients i ON i.id = r.ingredient_id";

// =============================================================================
// Inputs
// =============================================================================

/// Input for [`CatalogRepository::create_menu_item`].
#[derive(Debug, Clone, Default)]
pub struct NewMenuItem {
    pub id: Option<String>,
    pub name: String,
    pub category: String,
    pub price_cents: i64,
    /// Defaults to 14%.
    pub tax_rate_bps: Option<u32>,
    /// Defaults to active.
    pub is_active: Option<bool>,
    pub sort_order: Option<i64>,
}

/// Partial update of a menu item; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct MenuItemPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price_cents: Option<i64>,
    pub tax_rate_bps: Option<u32>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i64>,
}

/// Menu listing filter.
#[derive(Debug, Clone, Default)]
pub struct MenuItemFilter {
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

/// Stock to record for a new ingredient at one branch.
#[derive(Debug, Clone)]
pub struct InitialStock {
    pub branch_id: String,
    pub quantity: Quantity,
    pub created_by: String,
}

/// Input for [`CatalogRepository::create_ingredient`].
#[derive(Debug, Clone)]
pub struct NewIngredient {
    pub id: Option<String>,
    pub name: String,
    pub unit: String,
    pub cost_per_unit_cents: i64,
    pub reorder_threshold: Quantity,
    pub initial_stock: Option<InitialStock>,
}

/// Partial update of an ingredient.
#[derive(Debug, Clone, Default)]
pub struct IngredientPatch {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub cost_per_unit_cents: Option<i64>,
    pub reorder_threshold: Option<Quantity>,
}

/// Input for [`CatalogRepository::add_recipe_line`].
#[derive(Debug, Clone)]
pub struct NewRecipeLine {
    pub menu_item_id: String,
    pub ingredient_id: String,
    pub quantity_required: Quantity,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the franchise-wide catalog.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Resolution (used by checkout)
    // -------------------------------------------------------------------------

    /// Loads one menu item with its recipe.
    pub async fn resolve_menu_item(&self, id: &str) -> DbResult<Option<ResolvedMenuItem>> {
        let mut resolved = self.resolve_menu_items(&[id.to_string()]).await?;
        Ok(resolved.remove(id))
    }

    /// Loads the given menu items with their recipes, keyed by id.
    ///
    /// Unknown ids are simply absent from the map; the pricer reports them.
    /// Inactive items are included so the pricer can name them. Both reads
    /// share one transaction, so an item's `recipe_version` always matches
    /// the recipe lines returned with it.
    pub async fn resolve_menu_items(
        &self,
        ids: &[String],
    ) -> DbResult<HashMap<String, ResolvedMenuItem>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut tx = self.pool.begin().await?;
        let resolved = Self::resolve_menu_items_on(&mut *tx, ids).await?;
        tx.commit().await?;
        Ok(resolved)
    }

    /// [`resolve_menu_items`](Self::resolve_menu_items) on a caller's
    /// connection or transaction.
    pub async fn resolve_menu_items_on(
        conn: &mut SqliteConnection,
        ids: &[String],
    ) -> DbResult<HashMap<String, ResolvedMenuItem>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        debug!(count = ids.len(), "Resolving menu items");

        let mut items_query = sqlx::QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM menu_items WHERE id IN (",
            MENU_ITEM_COLUMNS
        ));
        let mut separated = items_query.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");

        let items = items_query
            .build_query_as::<MenuItem>()
            .fetch_all(&mut *conn)
            .await?;

        let mut recipe_query = sqlx::QueryBuilder::<Sqlite>::new(format!(
            "{} WHERE r.menu_item_id IN (",
            RECIPE_SELECT
        ));
        let mut separated = recipe_query.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(") ORDER BY i.name");

        let recipes = recipe_query
            .build_query_as::<RecipeLine>()
            .fetch_all(&mut *conn)
            .await?;

        Ok(group_recipes(items, recipes)
            .into_iter()
            .map(|resolved| (resolved.item.id.clone(), resolved))
            .collect())
    }

    // -------------------------------------------------------------------------
    // Menu items
    // -------------------------------------------------------------------------

    /// Lists menu items with recipes, in display order.
    pub async fn list_menu_items(&self, filter: &MenuItemFilter) -> DbResult<Vec<ResolvedMenuItem>> {
        let items = sqlx::query_as::<_, MenuItem>(&format!(
            "SELECT {} FROM menu_items
             WHERE (?1 IS NULL OR category = ?1)
               AND (?2 IS NULL OR is_active = ?2)
             ORDER BY sort_order IS NULL, sort_order, name",
            MENU_ITEM_COLUMNS
        ))
        .bind(&filter.category)
        .bind(filter.is_active)
        .fetch_all(&self.pool)
        .await?;

        let recipes = self.list_recipes(None).await?;
        Ok(group_recipes(items, recipes))
    }

    pub async fn get_menu_item(&self, id: &str) -> DbResult<Option<MenuItem>> {
        let item = sqlx::query_as::<_, MenuItem>(&format!(
            "SELECT {} FROM menu_items WHERE id = ?1",
            MENU_ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Creates a menu item with recipe version 1.
    pub async fn create_menu_item(&self, new_item: &NewMenuItem) -> DbResult<MenuItem> {
        let tax_rate_bps = new_item.tax_rate_bps.unwrap_or(DEFAULT_TAX_RATE_BPS);
        validate_price_cents(new_item.price_cents)?;
        validate_tax_rate_bps(tax_rate_bps)?;

        let timestamp = now();
        let item = MenuItem {
            id: match &new_item.id {
                Some(id) => validate_id("id", id)?,
                None => Uuid::new_v4().to_string(),
            },
            name: validate_name(&new_item.name)?,
            category: validate_category(&new_item.category)?,
            price_cents: new_item.price_cents,
            tax_rate_bps,
            is_active: new_item.is_active.unwrap_or(true),
            sort_order: new_item.sort_order,
            recipe_version: 1,
            created_at: timestamp,
            updated_at: timestamp,
        };

        debug!(id = %item.id, name = %item.name, price_cents = item.price_cents, "Creating menu item");

        sqlx::query(
            "INSERT INTO menu_items
                (id, name, category, price_cents, tax_rate_bps, is_active, sort_order,
                 recipe_version, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.category)
        .bind(item.price_cents)
        .bind(item.tax_rate_bps)
        .bind(item.is_active)
        .bind(item.sort_order)
        .bind(item.recipe_version)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(item)
    }

    /// Applies a partial update. Price changes never touch past orders.
    pub async fn update_menu_item(&self, id: &str, patch: &MenuItemPatch) -> DbResult<MenuItem> {
        let mut item = self
            .get_menu_item(id)
            .await?
            .ok_or_else(|| DbError::not_found("Menu item", id))?;

        if let Some(name) = &patch.name {
            item.name = validate_name(name)?;
        }
        if let Some(category) = &patch.category {
            item.category = validate_category(category)?;
        }
        if let Some(price_cents) = patch.price_cents {
            validate_price_cents(price_cents)?;
            item.price_cents = price_cents;
        }
        if let Some(bps) = patch.tax_rate_bps {
            validate_tax_rate_bps(bps)?;
            item.tax_rate_bps = bps;
        }
        if let Some(active) = patch.is_active {
            item.is_active = active;
        }
        if patch.sort_order.is_some() {
            item.sort_order = patch.sort_order;
        }
        item.updated_at = now();

        sqlx::query(
            "UPDATE menu_items
             SET name = ?2, category = ?3, price_cents = ?4, tax_rate_bps = ?5,
                 is_active = ?6, sort_order = ?7, updated_at = ?8
             WHERE id = ?1",
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.category)
        .bind(item.price_cents)
        .bind(item.tax_rate_bps)
        .bind(item.is_active)
        .bind(item.sort_order)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        info!(id = %item.id, active = item.is_active, price_cents = item.price_cents, "Menu item updated");

        Ok(item)
    }

    /// Deletes a menu item and its recipe lines.
    ///
    /// Items that appear on any order can only be deactivated.
    pub async fn delete_menu_item(&self, id: &str) -> DbResult<()> {
        let item = self
            .get_menu_item(id)
            .await?
            .ok_or_else(|| DbError::not_found("Menu item", id))?;

        let sold: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM order_items WHERE menu_item_id = ?1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if sold {
            return Err(DbError::Conflict(format!(
                "Menu item {} appears on existing orders; deactivate it instead",
                item.name
            )));
        }

        sqlx::query("DELETE FROM menu_items WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        info!(id = %id, name = %item.name, "Menu item deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Ingredients
    // -------------------------------------------------------------------------

    pub async fn list_ingredients(&self) -> DbResult<Vec<Ingredient>> {
        let ingredients = sqlx::query_as::<_, Ingredient>(&format!(
            "SELECT {} FROM ingredients ORDER BY name",
            INGREDIENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(ingredients)
    }

    pub async fn get_ingredient(&self, id: &str) -> DbResult<Option<Ingredient>> {
        let ingredient = sqlx::query_as::<_, Ingredient>(&format!(
            "SELECT {} FROM ingredients WHERE id = ?1",
            INGREDIENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ingredient)
    }

    /// Creates an ingredient, optionally with opening stock at one branch.
    ///
    /// The opening stock is recorded as a RESTOCK ledger entry in the same
    /// transaction as the insert.
    pub async fn create_ingredient(&self, new_ingredient: &NewIngredient) -> DbResult<Ingredient> {
        validate_price_cents(new_ingredient.cost_per_unit_cents)?;
        validate_non_negative_quantity("reorderThreshold", new_ingredient.reorder_threshold)?;
        if let Some(initial) = &new_ingredient.initial_stock {
            if !initial.quantity.is_positive() {
                return Err(ValidationError::MustBePositive {
                    field: "initialStock".to_string(),
                }
                .into());
            }
        }

        let ingredient = Ingredient {
            id: match &new_ingredient.id {
                Some(id) => validate_id("id", id)?,
                None => Uuid::new_v4().to_string(),
            },
            name: validate_name(&new_ingredient.name)?,
            unit: validate_unit(&new_ingredient.unit)?,
            cost_per_unit_cents: new_ingredient.cost_per_unit_cents,
            reorder_threshold: new_ingredient.reorder_threshold,
            created_at: now(),
        };

        debug!(id = %ingredient.id, name = %ingredient.name, unit = %ingredient.unit, "Creating ingredient");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO ingredients (id, name, unit, cost_per_unit_cents, reorder_threshold, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&ingredient.id)
        .bind(&ingredient.name)
        .bind(&ingredient.unit)
        .bind(ingredient.cost_per_unit_cents)
        .bind(ingredient.reorder_threshold)
        .bind(ingredient.created_at)
        .execute(&mut *tx)
        .await?;

        if let Some(initial) = &new_ingredient.initial_stock {
            InventoryRepository::apply_movement(
                &mut *tx,
                &StockMovement {
                    branch_id: &initial.branch_id,
                    ingredient_id: &ingredient.id,
                    ingredient_name: &ingredient.name,
                    quantity_change: initial.quantity,
                    transaction_type: InventoryTransactionType::Restock,
                    order_id: None,
                    created_by: &initial.created_by,
                    notes: Some("Initial stock"),
                },
                StockPolicy::default(),
            )
            .await?;
        }

        tx.commit().await?;

        Ok(ingredient)
    }

    pub async fn update_ingredient(&self, id: &str, patch: &IngredientPatch) -> DbResult<Ingredient> {
        let mut ingredient = self
            .get_ingredient(id)
            .await?
            .ok_or_else(|| DbError::not_found("Ingredient", id))?;

        if let Some(name) = &patch.name {
            ingredient.name = validate_name(name)?;
        }
        if let Some(unit) = &patch.unit {
            ingredient.unit = validate_unit(unit)?;
        }
        if let Some(cost) = patch.cost_per_unit_cents {
            validate_price_cents(cost)?;
            ingredient.cost_per_unit_cents = cost;
        }
        if let Some(threshold) = patch.reorder_threshold {
            validate_non_negative_quantity("reorderThreshold", threshold)?;
            ingredient.reorder_threshold = threshold;
        }

        sqlx::query(
            "UPDATE ingredients
             SET name = ?2, unit = ?3, cost_per_unit_cents = ?4, reorder_threshold = ?5
             WHERE id = ?1",
        )
        .bind(&ingredient.id)
        .bind(&ingredient.name)
        .bind(&ingredient.unit)
        .bind(ingredient.cost_per_unit_cents)
        .bind(ingredient.reorder_threshold)
        .execute(&self.pool)
        .await?;

        Ok(ingredient)
    }

    // -------------------------------------------------------------------------
    // Recipes
    // -------------------------------------------------------------------------

    /// Lists recipe lines, optionally for one menu item.
    pub async fn list_recipes(&self, menu_item_id: Option<&str>) -> DbResult<Vec<RecipeLine>> {
        let recipes = sqlx::query_as::<_, RecipeLine>(&format!(
            "{} WHERE (?1 IS NULL OR r.menu_item_id = ?1) ORDER BY r.menu_item_id, i.name",
            RECIPE_SELECT
        ))
        .bind(menu_item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(recipes)
    }

    /// Adds an ingredient to a menu item's recipe and bumps its version.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Unknown menu item or ingredient
    /// * `Err(DbError::UniqueViolation)` - The item already uses this ingredient
    pub async fn add_recipe_line(&self, line: &NewRecipeLine) -> DbResult<RecipeLine> {
        validate_recipe_quantity(line.quantity_required)?;

        if self.get_menu_item(&line.menu_item_id).await?.is_none() {
            return Err(DbError::not_found("Menu item", &line.menu_item_id));
        }
        let ingredient = self
            .get_ingredient(&line.ingredient_id)
            .await?
            .ok_or_else(|| DbError::not_found("Ingredient", &line.ingredient_id))?;

        let recipe = RecipeLine {
            id: Uuid::new_v4().to_string(),
            menu_item_id: line.menu_item_id.clone(),
            ingredient_id: ingredient.id,
            ingredient_name: ingredient.name,
            quantity_required: line.quantity_required,
            unit: ingredient.unit,
            created_at: now(),
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO recipes (id, menu_item_id, ingredient_id, quantity_required, unit, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&recipe.id)
        .bind(&recipe.menu_item_id)
        .bind(&recipe.ingredient_id)
        .bind(recipe.quantity_required)
        .bind(&recipe.unit)
        .bind(recipe.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            err if err.is_unique_on("recipes.") => DbError::duplicate(
                "recipe",
                format!("{} / {}", recipe.menu_item_id, recipe.ingredient_name),
            ),
            err => err,
        })?;

        bump_recipe_version(&mut tx, &recipe.menu_item_id).await?;
        tx.commit().await?;

        info!(
            menu_item_id = %recipe.menu_item_id,
            ingredient = %recipe.ingredient_name,
            quantity = %recipe.quantity_required,
            "Recipe line added"
        );

        Ok(recipe)
    }

    /// Removes a recipe line and bumps its menu item's version.
    pub async fn remove_recipe_line(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let menu_item_id: String =
            sqlx::query_scalar("DELETE FROM recipes WHERE id = ?1 RETURNING menu_item_id")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| DbError::not_found("Recipe", id))?;

        bump_recipe_version(&mut tx, &menu_item_id).await?;
        tx.commit().await?;

        info!(id = %id, menu_item_id = %menu_item_id, "Recipe line removed");
        Ok(())
    }
}

async fn bump_recipe_version(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    menu_item_id: &str,
) -> DbResult<()> {
    sqlx::query(
        "UPDATE menu_items SET recipe_version = recipe_version + 1, updated_at = ?2 WHERE id = ?1",
    )
    .bind(menu_item_id)
    .bind(now())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Attaches recipe lines to their items, keeping the items' order.
fn group_recipes(items: Vec<MenuItem>, recipes: Vec<RecipeLine>) -> Vec<ResolvedMenuItem> {
    let mut by_item: HashMap<String, Vec<RecipeLine>> = HashMap::new();
    for recipe in recipes {
        by_item
            .entry(recipe.menu_item_id.clone())
            .or_default()
            .push(recipe);
    }

    items
        .into_iter()
        .map(|item| ResolvedMenuItem {
            recipe: by_item.remove(&item.id).unwrap_or_default(),
            item,
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

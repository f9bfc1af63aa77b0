//! # Demo Data
//!
//! Two branches, five staff accounts, the coffee-shop catalog and opening
//! stock. Used by the `seed` binary and by tests.
//!
//! ```text
//! Branches     Downtown, Airport
//! Staff        admin, manager1, manager2, cashier1, cashier2   (password: demo123)
//! Ingredients  Coffee Beans, Milk, Sugar, Flour, Chocolate, Vanilla Syrup
//! Menu         10 items across hot-drinks, cold-drinks, pastries, snacks
//! Stock        100 units of every ingredient at every branch (RESTOCK entries)
//! ```

use serde::Serialize;
use tracing::info;

use brewline_core::{InventoryTransactionType, Quantity, Role, StockPolicy, ValidationError};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::catalog::{NewIngredient, NewMenuItem, NewRecipeLine};
use crate::repository::inventory::StockAdjustment;
use crate::repository::user::NewUser;

/// Password of every seeded account.
pub const DEMO_PASSWORD: &str = "demo123";

pub const DOWNTOWN: &str = "branch-downtown";
pub const AIRPORT: &str = "branch-airport";

const BRANCHES: &[(&str, &str)] = &[(DOWNTOWN, "Downtown"), (AIRPORT, "Airport")];

/// (id, username, display name, role, branch)
const USERS: &[(&str, &str, &str, Role, Option<&str>)] = &[
    ("user-admin", "admin", "HQ Admin", Role::Admin, None),
    ("user-manager1", "manager1", "John Smith", Role::BranchManager, Some(DOWNTOWN)),
    ("user-manager2", "manager2", "Alice Johnson", Role::BranchManager, Some(AIRPORT)),
    ("user-cashier1", "cashier1", "Jane Doe", Role::Cashier, Some(DOWNTOWN)),
    ("user-cashier2", "cashier2", "Bob Wilson", Role::Cashier, Some(DOWNTOWN)),
];

/// (id, name, unit, cost per unit in cents, reorder threshold)
const INGREDIENTS: &[(&str, &str, &str, i64, &str)] = &[
    ("ing-coffee-beans", "Coffee Beans", "kg", 1500, "10"),
    ("ing-milk", "Milk", "L", 200, "20"),
    ("ing-sugar", "Sugar", "kg", 300, "5"),
    ("ing-flour", "Flour", "kg", 400, "10"),
    ("ing-chocolate", "Chocolate", "kg", 1200, "5"),
    ("ing-vanilla-syrup", "Vanilla Syrup", "L", 800, "5"),
];

/// (id, name, category, price in cents)
const MENU_ITEMS: &[(&str, &str, &str, i64)] = &[
    ("menu-espresso", "Espresso", "hot-drinks", 350),
    ("menu-americano", "Americano", "hot-drinks", 400),
    ("menu-latte", "Latte", "hot-drinks", 550),
    ("menu-cappuccino", "Cappuccino", "hot-drinks", 500),
    ("menu-iced-latte", "Iced Latte", "cold-drinks", 550),
    ("menu-iced-americano", "Iced Americano", "cold-drinks", 450),
    ("menu-croissant", "Croissant", "pastries", 300),
    ("menu-muffin", "Muffin", "pastries", 350),
    ("menu-cookie", "Cookie", "snacks", 250),
    ("menu-brownie", "Brownie", "snacks", 300),
];

/// (menu item, ingredient, quantity per unit sold)
const RECIPES: &[(&str, &str, &str)] = &[
    ("menu-espresso", "ing-coffee-beans", "0.018"),
    ("menu-americano", "ing-coffee-beans", "0.018"),
    ("menu-latte", "ing-coffee-beans", "0.018"),
    ("menu-latte", "ing-milk", "0.2"),
    ("menu-cappuccino", "ing-coffee-beans", "0.018"),
    ("menu-cappuccino", "ing-milk", "0.15"),
    ("menu-iced-latte", "ing-coffee-beans", "0.018"),
    ("menu-iced-latte", "ing-milk", "0.2"),
    ("menu-iced-americano", "ing-coffee-beans", "0.018"),
];

const OPENING_STOCK: &str = "100";

/// What [`seed_demo_data`] wrote.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedSummary {
    /// True when the database already had branches and nothing was written.
    pub skipped: bool,
    pub branches: usize,
    pub users: usize,
    pub ingredients: usize,
    pub menu_items: usize,
    pub recipes: usize,
    pub stock_entries: usize,
}

fn quantity(value: &str) -> DbResult<Quantity> {
    value.parse::<Quantity>().map_err(|_| {
        DbError::from(ValidationError::InvalidFormat {
            field: "quantity".to_string(),
            reason: format!("bad seed quantity {}", value),
        })
    })
}

/// Writes the demo data set unless the database already has branches.
pub async fn seed_demo_data(db: &Database) -> DbResult<SeedSummary> {
    if !db.branches().list().await?.is_empty() {
        info!("Database already has branches, skipping seed");
        return Ok(SeedSummary {
            skipped: true,
            ..Default::default()
        });
    }

    let mut summary = SeedSummary::default();

    for (id, name) in BRANCHES {
        db.branches().create(Some(*id), name).await?;
        summary.branches += 1;
    }

    for (id, username, name, role, branch_id) in USERS {
        db.users()
            .create(&NewUser {
                id: Some(id.to_string()),
                username: username.to_string(),
                name: name.to_string(),
                password: DEMO_PASSWORD.to_string(),
                role: *role,
                branch_id: branch_id.map(str::to_string),
            })
            .await?;
        summary.users += 1;
    }

    let catalog = db.catalog();

    for (id, name, unit, cost, threshold) in INGREDIENTS {
        catalog
            .create_ingredient(&NewIngredient {
                id: Some(id.to_string()),
                name: name.to_string(),
                unit: unit.to_string(),
                cost_per_unit_cents: *cost,
                reorder_threshold: quantity(threshold)?,
                initial_stock: None,
            })
            .await?;
        summary.ingredients += 1;
    }

    for (position, (id, name, category, price)) in MENU_ITEMS.iter().enumerate() {
        catalog
            .create_menu_item(&NewMenuItem {
                id: Some(id.to_string()),
                name: name.to_string(),
                category: category.to_string(),
                price_cents: *price,
                tax_rate_bps: None,
                is_active: Some(true),
                sort_order: Some(position as i64 + 1),
            })
            .await?;
        summary.menu_items += 1;
    }

    for (menu_item_id, ingredient_id, amount) in RECIPES {
        catalog
            .add_recipe_line(&NewRecipeLine {
                menu_item_id: menu_item_id.to_string(),
                ingredient_id: ingredient_id.to_string(),
                quantity_required: quantity(amount)?,
            })
            .await?;
        summary.recipes += 1;
    }

    let opening = quantity(OPENING_STOCK)?;
    let inventory = db.inventory();
    for (branch_id, _) in BRANCHES {
        for (ingredient_id, ..) in INGREDIENTS {
            inventory
                .adjust(
                    &StockAdjustment {
                        branch_id: branch_id.to_string(),
                        ingredient_id: ingredient_id.to_string(),
                        quantity_change: opening,
                        transaction_type: InventoryTransactionType::Restock,
                        created_by: "user-admin".to_string(),
                        notes: Some("Opening stock".to_string()),
                    },
                    StockPolicy::default(),
                )
                .await?;
            summary.stock_entries += 1;
        }
    }

    info!(
        branches = summary.branches,
        users = summary.users,
        menu_items = summary.menu_items,
        recipes = summary.recipes,
        "Demo data seeded"
    );

    Ok(summary)
}

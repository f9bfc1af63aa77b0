//! # Repositories
//!
//! One struct per table group, each holding a clone of the pool.
//!
//! ```text
//! &self methods             standalone reads and writes on the pool
//! fn(&mut SqliteConnection) steps the checkout runs inside its transaction
//! ```
//!
//! | repository | tables |
//! |---|---|
//! | [`branch::BranchRepository`] | `branches` |
//! | [`user::UserRepository`] | `users` |
//! | [`catalog::CatalogRepository`] | `menu_items`, `ingredients`, `recipes` |
//! | [`shift::ShiftRepository`] | `shifts` |
//! | [`order::OrderRepository`] | `orders`, `order_items`, `branch_order_sequences` |
//! | [`inventory::InventoryRepository`] | `branch_inventory`, `inventory_transactions` |

use chrono::{DateTime, SubsecRound, Utc};

pub mod branch;
pub mod catalog;
pub mod inventory;
pub mod order;
pub mod shift;
pub mod user;

/// Current time at the precision persisted and hashed (milliseconds).
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

//! # brewline-db
//!
//! SQLite storage and the checkout transaction.
//!
//! ```text
//!   CheckoutService::process       (see checkout.rs for the full flow)
//!     │ reads      users, shifts, catalog
//!     │ BEGIN
//!     ├─► branch_order_sequences
//!     ├─► orders, order_items
//!     ├─► branch_inventory, inventory_transactions
//!     │ COMMIT
//!     ▼
//!   CheckoutReceipt
//! ```
//!
//! Each table group has a repository reached through [`Database`]
//! (`db.catalog()`, `db.shifts()` ...). Schema lives in `migrations/sqlite`
//! and is applied when the pool opens.
//!
//! ```rust,ignore
//! use brewline_db::{CheckoutService, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("brewline.db")).await?;
//! let checkout = CheckoutService::new(db.clone(), fingerprint, StockPolicy::default());
//! let receipt = checkout.process(&request).await?;
//! ```

pub mod checkout;
pub mod error;
pub mod migrations;
pub mod password;
pub mod pool;
pub mod repository;
pub mod seed;

pub use checkout::{CheckoutError, CheckoutReceipt, CheckoutRequest, CheckoutService};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::branch::BranchRepository;
pub use repository::catalog::CatalogRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::order::OrderRepository;
pub use repository::shift::ShiftRepository;
pub use repository::user::UserRepository;

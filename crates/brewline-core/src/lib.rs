//! # brewline-core
//!
//! The decisions an order makes before it is written: price, ingredient
//! usage, stock admissibility and the tamper-detection hash.
//!
//! ## Where It Sits in a Checkout
//! ```text
//! cart lines ──► pricing::price_cart ──► PricedCart (subtotal, total)
//!                        │
//!                        ▼
//!             deduction::plan_deductions ──► Vec<Deduction> per ingredient
//!                        │
//!                        ▼
//!         fingerprint::OrderFingerprint ──► 64-char hex order hash
//! ```
//!
//! `brewline-db` feeds these functions rows it has already read and writes
//! their results inside its own transaction. Nothing in this crate does I/O.
//!
//! - [`types`]: rows and enums (menu items, orders, shifts, ledger entries)
//! - [`money`], [`quantity`]: integer cents, micro-unit quantities
//! - [`validation`]: field checks run before any read
//! - [`error`]: [`CoreError`], [`ValidationError`]
//!
//! ## Example
//!
//! ```rust
//! use brewline_core::quantity::Quantity;
//!
//! // 2 espressos at 0.018 kg of beans each
//! let per_cup: Quantity = "0.018".parse().unwrap();
//! let used = per_cup.checked_mul(2).unwrap();
//! assert_eq!(used.to_string(), "0.036");
//! ```

pub mod deduction;
pub mod error;
pub mod fingerprint;
pub mod money;
pub mod pricing;
pub mod quantity;
pub mod types;
pub mod validation;


pub use deduction::{plan_deductions, Deduction, StockPolicy};
pub use error::{CoreError, CoreResult, ValidationError};
pub use fingerprint::{FingerprintInput, OrderFingerprint};
pub use money::Money;
pub use pricing::{price_cart, CartLine, PricedCart, PricedLine, ResolvedMenuItem};
pub use quantity::Quantity;
pub use types::*;

// Limits

/// Lines per order.
pub const MAX_CART_ITEMS: usize = 100;

/// Largest quantity on one line; catches a fat-fingered `1000`.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Tax rate applied to new menu items when none is given (14%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 1400;

/// Page size for order listings when the caller gives none.
pub const DEFAULT_ORDER_PAGE_SIZE: i64 = 100;

/// Upper bound for order listing page size.
pub const MAX_ORDER_PAGE_SIZE: i64 = 500;

/// Largest manual stock movement or recipe quantity, in whole units.
pub const MAX_STOCK_CHANGE_UNITS: i64 = 1_000_000;

/// Stock rows stay within this many whole units either side of zero.
pub const MAX_STOCK_LEVEL_UNITS: i64 = 1_000_000_000;

/// Longest idempotency key a client may send.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

//! Checkout transaction tests against a seeded database.
//!
//! Seed data: Espresso 3.50 (0.018 kg beans), Latte 5.50 (0.018 kg beans,
//! 0.2 L milk), Muffin 3.50 (no recipe); 100 of everything at every branch.

use std::collections::HashSet;

use brewline_core::{
    CartLine, FingerprintInput, InventoryTransactionType, Money, Order, OrderFingerprint,
    PaymentMethod, Quantity, StockPolicy,
};
use brewline_db::repository::catalog::MenuItemPatch;
use brewline_db::repository::inventory::StockAdjustment;
use brewline_db::repository::order::{OrderQuery, OrderRepository};
use brewline_db::repository::shift::{CloseShift, OpenShift};
use brewline_db::seed::{seed_demo_data, AIRPORT, DOWNTOWN};
use brewline_db::{CheckoutError, CheckoutRequest, CheckoutService, Database, DbConfig};

const BEANS: &str = "ing-coffee-beans";
const MILK: &str = "ing-milk";

fn qty(value: &str) -> Quantity {
    value.parse().unwrap()
}

async fn seeded() -> Database {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    seed_demo_data(&db).await.unwrap();
    db
}

fn service(db: &Database, policy: StockPolicy) -> CheckoutService {
    let fingerprint = OrderFingerprint::new("checkout-test-secret").unwrap();
    CheckoutService::new(db.clone(), fingerprint, policy)
}

async fn open_shift(db: &Database, cashier_id: &str, branch_id: &str) -> String {
    db.shifts()
        .open(&OpenShift {
            branch_id: branch_id.to_string(),
            cashier_id: cashier_id.to_string(),
            opening_cash_cents: 20_000,
            notes: None,
        })
        .await
        .unwrap()
        .id
}

fn cart(cashier_id: &str, items: Vec<CartLine>) -> CheckoutRequest {
    CheckoutRequest {
        branch_id: DOWNTOWN.to_string(),
        cashier_id: cashier_id.to_string(),
        items,
        payment_method: PaymentMethod::Cash,
        order_number: None,
        idempotency_key: None,
    }
}

async fn order_count(db: &Database) -> i64 {
    db.orders().list(&OrderQuery::default()).await.unwrap().total
}

// =============================================================================
// Totals and ledger
// =============================================================================

#[tokio::test]
async fn test_total_is_catalog_price_times_quantity() {
    let db = seeded().await;
    open_shift(&db, "user-cashier1", DOWNTOWN).await;
    let checkout = service(&db, StockPolicy::default());

    let receipt = checkout
        .process(&cart(
            "user-cashier1",
            vec![
                CartLine::new("menu-espresso", 2),
                CartLine::new("menu-latte", 1),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(receipt.total, Money::from_cents(2 * 350 + 550));
    assert!(!receipt.replayed);

    let stored = db.orders().get(&receipt.order_id).await.unwrap().unwrap();
    assert_eq!(stored.order.subtotal_cents, 1250);
    assert_eq!(stored.order.total_cents, 1250);
    assert!(!stored.order.synced);
    assert_eq!(stored.cashier.username, "cashier1");
    assert_eq!(stored.items.len(), 2);

    let espresso = stored
        .items
        .iter()
        .find(|item| item.menu_item_id == "menu-espresso")
        .unwrap();
    assert_eq!(espresso.name, "Espresso");
    assert_eq!(espresso.unit_price_cents, 350);
    assert_eq!(espresso.subtotal_cents, 700);
    assert_eq!(espresso.recipe_version, 2);
}

#[tokio::test]
async fn test_two_espressos_deduct_beans() {
    let db = seeded().await;
    open_shift(&db, "user-cashier1", DOWNTOWN).await;
    let checkout = service(&db, StockPolicy::default());

    let receipt = checkout
        .process(&cart("user-cashier1", vec![CartLine::new("menu-espresso", 2)]))
        .await
        .unwrap();

    let entries = db.inventory().for_order(&receipt.order_id).await.unwrap();
    assert_eq!(entries.len(), 1);

    let entry = &entries[0];
    assert_eq!(entry.ingredient_id, BEANS);
    assert_eq!(entry.transaction_type, InventoryTransactionType::Sale);
    assert_eq!(entry.quantity_change, qty("-0.036"));
    assert_eq!(entry.stock_before, qty("100"));
    assert_eq!(entry.stock_after, qty("99.964"));
    assert_eq!(entry.created_by, "user-cashier1");

    let stock = db.inventory().current_stock(DOWNTOWN, BEANS).await.unwrap();
    assert_eq!(stock, qty("99.964"));

    // Other branches are untouched
    let airport = db.inventory().current_stock(AIRPORT, BEANS).await.unwrap();
    assert_eq!(airport, qty("100"));
}

#[tokio::test]
async fn test_shared_ingredient_is_one_net_deduction() {
    let db = seeded().await;
    open_shift(&db, "user-cashier1", DOWNTOWN).await;
    let checkout = service(&db, StockPolicy::default());

    let receipt = checkout
        .process(&cart(
            "user-cashier1",
            vec![
                CartLine::new("menu-espresso", 1),
                CartLine::new("menu-latte", 2),
                CartLine::new("menu-muffin", 1),
            ],
        ))
        .await
        .unwrap();

    let entries = db.inventory().for_order(&receipt.order_id).await.unwrap();
    assert_eq!(entries.len(), 2);

    let beans = entries.iter().find(|e| e.ingredient_id == BEANS).unwrap();
    assert_eq!(beans.quantity_change, qty("-0.054"));
    let milk = entries.iter().find(|e| e.ingredient_id == MILK).unwrap();
    assert_eq!(milk.quantity_change, qty("-0.4"));
    assert_eq!(milk.stock_after, qty("99.6"));
}

#[tokio::test]
async fn test_ledger_replays_to_current_stock() {
    let db = seeded().await;
    open_shift(&db, "user-cashier1", DOWNTOWN).await;
    let checkout = service(&db, StockPolicy::default());

    for quantity in [1, 3, 2] {
        checkout
            .process(&cart("user-cashier1", vec![CartLine::new("menu-latte", quantity)]))
            .await
            .unwrap();
    }

    for ingredient in [BEANS, MILK] {
        let check = db.inventory().verify_ledger(DOWNTOWN, ingredient).await.unwrap();
        assert_eq!(check.entries, 4);
        assert!(check.balanced);
        assert!(check.chained);
        assert!(check.consistent);
    }

    let milk = db.inventory().current_stock(DOWNTOWN, MILK).await.unwrap();
    assert_eq!(milk, qty("98.8"));
}

// =============================================================================
// Atomicity
// =============================================================================

#[tokio::test]
async fn test_inactive_item_rolls_back_everything() {
    let db = seeded().await;
    open_shift(&db, "user-cashier1", DOWNTOWN).await;
    db.catalog()
        .update_menu_item(
            "menu-latte",
            &MenuItemPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let checkout = service(&db, StockPolicy::default());

    let result = checkout
        .process(&cart(
            "user-cashier1",
            vec![
                CartLine::new("menu-espresso", 1),
                CartLine::new("menu-latte", 1),
            ],
        ))
        .await;

    match result {
        Err(CheckoutError::MenuItemInactive { name }) => assert_eq!(name, "Latte"),
        other => panic!("expected MenuItemInactive, got {:?}", other),
    }

    assert_eq!(order_count(&db).await, 0);
    assert_eq!(
        db.inventory().current_stock(DOWNTOWN, BEANS).await.unwrap(),
        qty("100")
    );
    assert_eq!(db.inventory().ledger(DOWNTOWN, Some(BEANS)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_strict_policy_rejects_overdraw() {
    let db = seeded().await;
    open_shift(&db, "user-cashier1", DOWNTOWN).await;
    db.inventory()
        .adjust(
            &StockAdjustment {
                branch_id: DOWNTOWN.to_string(),
                ingredient_id: BEANS.to_string(),
                quantity_change: qty("-99.99"),
                transaction_type: InventoryTransactionType::Waste,
                created_by: "user-manager1".to_string(),
                notes: Some("Spilled".to_string()),
            },
            StockPolicy::default(),
        )
        .await
        .unwrap();

    let strict = service(&db, StockPolicy::strict());
    let result = strict
        .process(&cart(
            "user-cashier1",
            vec![
                CartLine::new("menu-latte", 1),
                CartLine::new("menu-espresso", 1),
            ],
        ))
        .await;

    match result {
        Err(CheckoutError::InsufficientStock {
            ingredient,
            available,
            requested,
        }) => {
            assert_eq!(ingredient, "Coffee Beans");
            assert_eq!(available, qty("0.01"));
            assert_eq!(requested, qty("0.036"));
        }
        other => panic!("expected InsufficientStock, got {:?}", other),
    }

    // Nothing from the failed attempt is visible, including the milk row
    assert_eq!(order_count(&db).await, 0);
    assert_eq!(
        db.inventory().current_stock(DOWNTOWN, BEANS).await.unwrap(),
        qty("0.01")
    );
    assert_eq!(
        db.inventory().current_stock(DOWNTOWN, MILK).await.unwrap(),
        qty("100")
    );

    // The default policy records the overdraw instead
    let lenient = service(&db, StockPolicy::default());
    lenient
        .process(&cart("user-cashier1", vec![CartLine::new("menu-espresso", 1)]))
        .await
        .unwrap();
    assert_eq!(
        db.inventory().current_stock(DOWNTOWN, BEANS).await.unwrap(),
        qty("-0.008")
    );
    assert!(db.inventory().verify_ledger(DOWNTOWN, BEANS).await.unwrap().consistent);
}

// =============================================================================
// Order numbers
// =============================================================================

#[tokio::test]
async fn test_sequential_order_numbers() {
    let db = seeded().await;
    open_shift(&db, "user-cashier1", DOWNTOWN).await;
    let checkout = service(&db, StockPolicy::default());

    let first = checkout
        .process(&cart("user-cashier1", vec![CartLine::new("menu-cookie", 1)]))
        .await
        .unwrap();
    let second = checkout
        .process(&cart("user-cashier1", vec![CartLine::new("menu-cookie", 1)]))
        .await
        .unwrap();
    assert_eq!(first.order_number, 1);
    assert_eq!(second.order_number, 2);

    // Numbering is per branch; managers need no shift
    let airport = checkout
        .process(&CheckoutRequest {
            branch_id: AIRPORT.to_string(),
            ..cart("user-manager2", vec![CartLine::new("menu-cookie", 1)])
        })
        .await
        .unwrap();
    assert_eq!(airport.order_number, 1);
}

#[tokio::test]
async fn test_explicit_order_number_is_never_reused() {
    let db = seeded().await;
    open_shift(&db, "user-cashier1", DOWNTOWN).await;
    let checkout = service(&db, StockPolicy::default());

    let explicit = CheckoutRequest {
        order_number: Some(50),
        ..cart("user-cashier1", vec![CartLine::new("menu-brownie", 1)])
    };
    let receipt = checkout.process(&explicit).await.unwrap();
    assert_eq!(receipt.order_number, 50);

    match checkout.process(&explicit).await {
        Err(CheckoutError::DuplicateOrderNumber {
            branch_id,
            order_number,
        }) => {
            assert_eq!(branch_id, DOWNTOWN);
            assert_eq!(order_number, 50);
        }
        other => panic!("expected DuplicateOrderNumber, got {:?}", other),
    }
    assert_eq!(order_count(&db).await, 1);

    // The counter continues above the explicit number
    let next = checkout
        .process(&cart("user-cashier1", vec![CartLine::new("menu-brownie", 1)]))
        .await
        .unwrap();
    assert_eq!(next.order_number, 51);
}

#[tokio::test]
async fn test_order_written_past_counter_is_skipped() {
    let db = seeded().await;
    open_shift(&db, "user-cashier1", DOWNTOWN).await;
    let checkout = service(&db, StockPolicy::default());

    let first = checkout
        .process(&cart("user-cashier1", vec![CartLine::new("menu-cookie", 1)]))
        .await
        .unwrap();
    assert_eq!(first.order_number, 1);

    // Written straight to the table, the counter row still says 1
    let stored = db.orders().get(&first.order_id).await.unwrap().unwrap().order;
    let mut conn = db.pool().acquire().await.unwrap();
    OrderRepository::insert_order(
        &mut *conn,
        &Order {
            id: "order-imported".to_string(),
            order_number: 2,
            idempotency_key: None,
            ..stored
        },
    )
    .await
    .unwrap();
    drop(conn);

    let next = checkout
        .process(&cart("user-cashier1", vec![CartLine::new("menu-cookie", 1)]))
        .await
        .unwrap();
    assert_eq!(next.order_number, 3);
    assert_eq!(order_count(&db).await, 3);
}

#[tokio::test]
async fn test_number_collisions_stop_after_bounded_retries() {
    let db = seeded().await;
    open_shift(&db, "user-cashier1", DOWNTOWN).await;
    let checkout = service(&db, StockPolicy::default());

    // Every insert finds its number already taken by a row the trigger
    // writes first; each attempt rolls back whole.
    sqlx::query(
        "CREATE TRIGGER take_number_first BEFORE INSERT ON orders
         WHEN NEW.id NOT LIKE 'taken-%'
         BEGIN
             INSERT INTO orders (id, branch_id, order_number, timestamp, cashier_id,
                                 subtotal_cents, total_cents, payment_method,
                                 transaction_hash, synced, shift_id, idempotency_key)
             VALUES ('taken-' || NEW.id, NEW.branch_id, NEW.order_number, NEW.timestamp,
                     NEW.cashier_id, 0, 0, NEW.payment_method, NEW.transaction_hash, 0,
                     NEW.shift_id, NULL);
         END",
    )
    .execute(db.pool())
    .await
    .unwrap();

    let err = checkout
        .process(&cart("user-cashier1", vec![CartLine::new("menu-espresso", 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Persistence(_)), "{err:?}");
    assert_eq!(order_count(&db).await, 0);
    assert_eq!(
        db.inventory().current_stock(DOWNTOWN, BEANS).await.unwrap(),
        qty("100")
    );

    sqlx::query("DROP TRIGGER take_number_first")
        .execute(db.pool())
        .await
        .unwrap();
    let receipt = checkout
        .process(&cart("user-cashier1", vec![CartLine::new("menu-espresso", 1)]))
        .await
        .unwrap();
    assert_eq!(receipt.order_number, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checkouts_get_distinct_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(DbConfig::new(dir.path().join("brewline.db")).max_connections(4))
        .await
        .unwrap();
    seed_demo_data(&db).await.unwrap();
    open_shift(&db, "user-cashier1", DOWNTOWN).await;
    open_shift(&db, "user-cashier2", DOWNTOWN).await;
    let checkout = service(&db, StockPolicy::default());

    let mut handles = Vec::new();
    for i in 0..8 {
        let checkout = checkout.clone();
        let cashier = if i % 2 == 0 { "user-cashier1" } else { "user-cashier2" };
        let request = cart(cashier, vec![CartLine::new("menu-espresso", 1)]);
        handles.push(tokio::spawn(async move { checkout.process(&request).await }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        let receipt = handle.await.unwrap().unwrap();
        numbers.insert(receipt.order_number);
    }
    assert_eq!(numbers, (1..=8).collect::<HashSet<i64>>());

    // No lost updates: 8 × 0.018
    assert_eq!(
        db.inventory().current_stock(DOWNTOWN, BEANS).await.unwrap(),
        qty("99.856")
    );
    let check = db.inventory().verify_ledger(DOWNTOWN, BEANS).await.unwrap();
    assert_eq!(check.entries, 9);
    assert!(check.consistent);

    db.close().await;
}

// =============================================================================
// Shift binding
// =============================================================================

#[tokio::test]
async fn test_cashier_without_shift_is_rejected() {
    let db = seeded().await;
    let checkout = service(&db, StockPolicy::default());

    let result = checkout
        .process(&cart("user-cashier1", vec![CartLine::new("menu-espresso", 1)]))
        .await;
    assert!(matches!(result, Err(CheckoutError::NoOpenShift)));
    assert_eq!(order_count(&db).await, 0);
}

#[tokio::test]
async fn test_shift_at_other_branch_is_rejected() {
    let db = seeded().await;
    open_shift(&db, "user-cashier2", AIRPORT).await;
    let checkout = service(&db, StockPolicy::default());

    let result = checkout
        .process(&cart("user-cashier2", vec![CartLine::new("menu-espresso", 1)]))
        .await;
    assert!(matches!(result, Err(CheckoutError::ShiftBranchMismatch)));
}

#[tokio::test]
async fn test_admin_orders_without_shift() {
    let db = seeded().await;
    let checkout = service(&db, StockPolicy::default());

    let receipt = checkout
        .process(&cart("user-admin", vec![CartLine::new("menu-americano", 1)]))
        .await
        .unwrap();
    assert_eq!(receipt.shift_id, None);
    assert_eq!(receipt.total, Money::from_cents(400));
}

#[tokio::test]
async fn test_shift_close_aggregates_its_orders() {
    let db = seeded().await;
    let shift_id = open_shift(&db, "user-cashier1", DOWNTOWN).await;
    let checkout = service(&db, StockPolicy::default());

    checkout
        .process(&cart("user-cashier1", vec![CartLine::new("menu-espresso", 2)]))
        .await
        .unwrap();
    checkout
        .process(&cart("user-cashier1", vec![CartLine::new("menu-cappuccino", 1)]))
        .await
        .unwrap();
    // Same branch, not this shift
    checkout
        .process(&cart("user-admin", vec![CartLine::new("menu-latte", 1)]))
        .await
        .unwrap();

    let totals = db.orders().shift_totals(&shift_id).await.unwrap();
    assert_eq!(totals.orders, 2);
    assert_eq!(totals.revenue_cents, 1200);

    let closed = db
        .shifts()
        .close(
            &shift_id,
            &CloseShift {
                closing_cash_cents: 21_200,
                notes: None,
            },
        )
        .await
        .unwrap();
    assert!(closed.is_closed);
    assert_eq!(closed.closing_orders, Some(2));
    assert_eq!(closed.closing_revenue_cents, Some(1200));

    // Closed shift no longer accepts orders
    let after = checkout
        .process(&cart("user-cashier1", vec![CartLine::new("menu-espresso", 1)]))
        .await;
    assert!(matches!(after, Err(CheckoutError::NoOpenShift)));
}

// =============================================================================
// Lookups, idempotency, fingerprint
// =============================================================================

#[tokio::test]
async fn test_unknown_references() {
    let db = seeded().await;
    open_shift(&db, "user-cashier1", DOWNTOWN).await;
    let checkout = service(&db, StockPolicy::default());

    let result = checkout
        .process(&cart("user-nobody", vec![CartLine::new("menu-espresso", 1)]))
        .await;
    assert!(matches!(result, Err(CheckoutError::CashierNotFound(_))));

    let result = checkout
        .process(&CheckoutRequest {
            branch_id: "branch-nowhere".to_string(),
            ..cart("user-cashier1", vec![CartLine::new("menu-espresso", 1)])
        })
        .await;
    assert!(matches!(result, Err(CheckoutError::BranchNotFound(_))));

    let result = checkout
        .process(&cart(
            "user-cashier1",
            vec![
                CartLine::new("menu-espresso", 1),
                CartLine::new("menu-unicorn-frappe", 1),
            ],
        ))
        .await;
    match result {
        Err(CheckoutError::MenuItemNotFound(id)) => assert_eq!(id, "menu-unicorn-frappe"),
        other => panic!("expected MenuItemNotFound, got {:?}", other),
    }

    let result = checkout
        .process(&cart("user-cashier1", vec![CartLine::new("menu-espresso", 0)]))
        .await;
    assert!(matches!(result, Err(CheckoutError::Validation(_))));

    assert_eq!(order_count(&db).await, 0);
}

#[tokio::test]
async fn test_idempotency_key_replays_order() {
    let db = seeded().await;
    open_shift(&db, "user-cashier1", DOWNTOWN).await;
    let checkout = service(&db, StockPolicy::default());

    let request = CheckoutRequest {
        idempotency_key: Some("till-2-000123".to_string()),
        ..cart("user-cashier1", vec![CartLine::new("menu-espresso", 1)])
    };

    let first = checkout.process(&request).await.unwrap();
    let second = checkout.process(&request).await.unwrap();

    assert!(!first.replayed);
    assert!(second.replayed);
    assert_eq!(first.order_id, second.order_id);
    assert_eq!(first.order_number, second.order_number);
    assert_eq!(first.transaction_hash, second.transaction_hash);

    assert_eq!(order_count(&db).await, 1);
    assert_eq!(
        db.inventory().current_stock(DOWNTOWN, BEANS).await.unwrap(),
        qty("99.982")
    );
}

#[tokio::test]
async fn test_transaction_hash_verifies() {
    let db = seeded().await;
    open_shift(&db, "user-cashier1", DOWNTOWN).await;
    let checkout = service(&db, StockPolicy::default());

    let receipt = checkout
        .process(&cart("user-cashier1", vec![CartLine::new("menu-muffin", 3)]))
        .await
        .unwrap();
    let order = db.orders().get(&receipt.order_id).await.unwrap().unwrap().order;

    assert_eq!(order.transaction_hash.len(), 64);

    let input = FingerprintInput {
        branch_id: &order.branch_id,
        order_number: order.order_number,
        total: order.total(),
        cashier_id: &order.cashier_id,
        timestamp: order.timestamp,
    };
    assert!(checkout.fingerprint().verify(&input, &order.transaction_hash));

    let tampered = FingerprintInput {
        total: Money::from_cents(1),
        ..input
    };
    assert!(!checkout.fingerprint().verify(&tampered, &order.transaction_hash));
}

//! End-to-end sale flow tests: recording, failure classification, events,
//! reversal, and concurrent contention over the same stock.

use chrono::Utc;
use uuid::Uuid;

use amantena_core::{CoreError, Product, Role, User};
use amantena_db::{Database, DbConfig};
use amantena_service::{
    EventBus, RecordSaleRequest, SaleService, TOPIC_LOW_STOCK_ALERT, TOPIC_SALE_CREATED,
};

async fn setup() -> (Database, SaleService, EventBus, User) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let events = EventBus::default();
    let service = SaleService::new(db.clone(), events.clone());

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        name: "Mira".to_string(),
        email: "mira@amantena.farm".to_string(),
        password_hash: "x".to_string(),
        role: Role::Staff,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.users().insert(&user).await.unwrap();

    (db, service, events, user)
}

async fn seed_product(db: &Database, quantity: i64, threshold: i64, price_cents: i64) -> Product {
    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4().to_string(),
        name: "Raw Honey 500g".to_string(),
        category: "preserves".to_string(),
        price_cents,
        quantity,
        threshold,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.products().insert(&product).await.unwrap();
    product
}

#[tokio::test]
async fn sale_decrements_stock_and_fires_low_stock_alert() {
    let (db, service, events, user) = setup().await;
    // Already below threshold; any sale keeps it in alert territory
    let product = seed_product(&db, 8, 10, 1200).await;

    let mut rx = events.subscribe();

    let receipt = service
        .record_sale(
            &user.id,
            RecordSaleRequest {
                product_id: product.id.clone(),
                quantity: 2,
                notes: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(receipt.sale.total_cents, 2400);
    assert_eq!(receipt.product.quantity, 6);
    assert_eq!(receipt.sold_by, "Mira");

    let first = rx.recv().await.unwrap();
    assert_eq!(first.topic, TOPIC_SALE_CREATED);

    // sale-created, product-updated, then the alert
    rx.recv().await.unwrap();
    let alert = rx.recv().await.unwrap();
    assert_eq!(alert.topic, TOPIC_LOW_STOCK_ALERT);
    assert_eq!(
        alert.payload["message"],
        "Low stock alert: Raw Honey 500g has only 6 units left"
    );
}

#[tokio::test]
async fn no_alert_while_stock_stays_above_threshold() {
    let (db, service, events, user) = setup().await;
    let product = seed_product(&db, 50, 5, 1000).await;

    let mut rx = events.subscribe();

    service
        .record_sale(
            &user.id,
            RecordSaleRequest {
                product_id: product.id,
                quantity: 3,
                notes: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(rx.recv().await.unwrap().topic, TOPIC_SALE_CREATED);
    assert_eq!(rx.recv().await.unwrap().topic, "product-updated");
    // Nothing further buffered
    assert!(matches!(
        rx.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn oversell_reports_actual_availability_and_changes_nothing() {
    let (db, service, _events, user) = setup().await;
    let product = seed_product(&db, 5, 0, 1000).await;

    let err = service
        .record_sale(
            &user.id,
            RecordSaleRequest {
                product_id: product.id.clone(),
                quantity: 6,
                notes: None,
            },
        )
        .await
        .unwrap_err();

    match &err {
        CoreError::InsufficientStock {
            available,
            requested,
            ..
        } => {
            assert_eq!(*available, 5);
            assert_eq!(*requested, 6);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert!(err.to_string().contains("only 5 units available"));

    let fetched = db.products().get_by_id(&product.id).await.unwrap().unwrap();
    assert_eq!(fetched.quantity, 5);
    assert!(service.list_recent(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn non_positive_quantities_are_rejected_before_storage() {
    let (db, service, _events, user) = setup().await;
    let product = seed_product(&db, 5, 0, 1000).await;

    for quantity in [0, -3] {
        let err = service
            .record_sale(
                &user.id,
                RecordSaleRequest {
                    product_id: product.id.clone(),
                    quantity,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}

#[tokio::test]
async fn reverse_restores_stock_and_deletes_the_sale() {
    let (db, service, _events, user) = setup().await;
    let product = seed_product(&db, 8, 0, 1200).await;

    let receipt = service
        .record_sale(
            &user.id,
            RecordSaleRequest {
                product_id: product.id.clone(),
                quantity: 3,
                notes: Some("market day".to_string()),
            },
        )
        .await
        .unwrap();

    let restored = service.reverse_sale(&receipt.sale.id).await.unwrap();
    assert_eq!(restored, 3);

    let fetched = db.products().get_by_id(&product.id).await.unwrap().unwrap();
    assert_eq!(fetched.quantity, 8);
    assert!(service.list_recent(10).await.unwrap().is_empty());

    // A second reversal has nothing to undo
    let err = service.reverse_sale(&receipt.sale.id).await.unwrap_err();
    assert!(matches!(err, CoreError::SaleNotFound(_)));
}

#[tokio::test]
async fn notes_can_be_edited_after_the_fact() {
    let (db, service, _events, user) = setup().await;
    let product = seed_product(&db, 8, 0, 1200).await;

    let receipt = service
        .record_sale(
            &user.id,
            RecordSaleRequest {
                product_id: product.id,
                quantity: 1,
                notes: None,
            },
        )
        .await
        .unwrap();

    let updated = service
        .update_notes(&receipt.sale.id, Some("paid in cash"))
        .await
        .unwrap();
    assert_eq!(updated.notes.as_deref(), Some("paid in cash"));
    // Financial fields are untouched
    assert_eq!(updated.total_cents, receipt.sale.total_cents);

    let err = service
        .update_notes("no-such-sale", Some("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::SaleNotFound(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_one_unit_sales_never_oversell() {
    let (db, service, _events, user) = setup().await;
    let product = seed_product(&db, 4, 0, 1000).await;

    let mut handles = Vec::new();
    for _ in 0..6 {
        let service = service.clone();
        let user_id = user.id.clone();
        let product_id = product.id.clone();
        handles.push(tokio::spawn(async move {
            service
                .record_sale(
                    &user_id,
                    RecordSaleRequest {
                        product_id,
                        quantity: 1,
                        notes: None,
                    },
                )
                .await
        }));
    }

    let mut successes = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(CoreError::InsufficientStock { .. }) => insufficient += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(successes, 4);
    assert_eq!(insufficient, 2);

    let fetched = db.products().get_by_id(&product.id).await.unwrap().unwrap();
    assert_eq!(fetched.quantity, 0);
    assert_eq!(service.list_recent(10).await.unwrap().len(), 4);
}

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use pharmacy_storefront::{
    cart::{
        CartBackend, CartRegistry, CartStorage, CartStore, FileCartStorage, MemoryCartStorage,
        decode_snapshot, encode_snapshot, validate_key,
    },
    checkout::{CheckoutState, DeliveryPolicy, PaymentMethod, ShippingDetails},
    error::AppError,
    models::Product,
};
use uuid::Uuid;

fn product(name: &str, price: i64, stock: i32) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: Some("test product".to_string()),
        price,
        discount_price: None,
        image: None,
        stock,
        created_at: Utc::now(),
    }
}

fn scratch_dir() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("pharmacy-carts-{}", Uuid::new_v4().simple()))
}

#[tokio::test]
async fn file_storage_survives_reopen_and_clear() -> anyhow::Result<()> {
    let dir = scratch_dir();
    let storage = FileCartStorage::new(&dir);
    let a = product("A", 120, 3);

    {
        let mut store = CartStore::open("file-visitor", storage.clone()).await?;
        store.add_to_cart(&a, 3).await?;
    }
    assert!(dir.join("file-visitor.json").exists());

    let mut store = CartStore::open("file-visitor", storage.clone()).await?;
    assert_eq!(store.cart_total(), 360);
    assert_eq!(store.cart().line(a.id).map(|l| l.stock_ceiling), Some(3));

    store.clear_cart().await?;
    assert!(!dir.join("file-visitor.json").exists());
    assert_eq!(storage.load("file-visitor").await?, None);
    // removing twice is fine
    storage.remove("file-visitor").await?;

    tokio::fs::remove_dir_all(&dir).await.ok();
    Ok(())
}

#[tokio::test]
async fn file_storage_refuses_path_like_keys() {
    let storage = FileCartStorage::new(scratch_dir());
    let err = storage
        .save("../escape", "[]")
        .await
        .expect_err("traversal key must be rejected");
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[test]
fn cart_keys_are_restricted() {
    assert!(validate_key("abc-DEF_123").is_ok());
    assert!(validate_key("").is_err());
    assert!(validate_key("has space").is_err());
    assert!(validate_key("a/b").is_err());
    assert!(validate_key(&"x".repeat(65)).is_err());
}

#[tokio::test]
async fn snapshot_decode_drops_invalid_lines() -> anyhow::Result<()> {
    let good = Uuid::new_v4();
    let raw = serde_json::json!([
        { "product_id": good, "name": "Good", "unit_price": 10, "image": null, "quantity": 2, "stock_ceiling": 5 },
        { "product_id": good, "name": "Duplicate", "unit_price": 10, "image": null, "quantity": 1, "stock_ceiling": 5 },
        { "product_id": Uuid::new_v4(), "name": "Zero", "unit_price": 10, "image": null, "quantity": 0, "stock_ceiling": 5 },
        { "product_id": Uuid::new_v4(), "name": "Over", "unit_price": 10, "image": null, "quantity": 6, "stock_ceiling": 5 }
    ])
    .to_string();

    let cart = decode_snapshot(&raw)?;
    assert_eq!(cart.len(), 1);
    assert_eq!(cart.line(good).map(|l| l.name.as_str()), Some("Good"));

    let round = decode_snapshot(&encode_snapshot(&cart)?)?;
    assert_eq!(round, cart);
    Ok(())
}

#[tokio::test]
async fn unreadable_snapshot_opens_empty() -> anyhow::Result<()> {
    let storage = MemoryCartStorage::new();
    storage.save("broken", "{not json").await?;

    let store = CartStore::open("broken", storage).await?;
    assert!(store.cart().is_empty());
    Ok(())
}

#[tokio::test]
async fn registry_reuses_sessions_until_ended() -> anyhow::Result<()> {
    let storage = MemoryCartStorage::new();
    let registry = CartRegistry::new(CartBackend::Memory(storage.clone()));
    let a = product("A", 10, 5);

    let first = registry.session("visitor-9").await?;
    first.lock().await.store.add_to_cart(&a, 2).await?;

    let again = registry.session("visitor-9").await?;
    assert!(std::sync::Arc::ptr_eq(&first, &again));
    assert_eq!(registry.active_sessions().await, 1);

    assert!(registry.end_session("visitor-9").await?);
    assert!(!registry.end_session("visitor-9").await?);
    assert_eq!(registry.active_sessions().await, 0);

    // the snapshot outlives the session
    let reopened = registry.session("visitor-9").await?;
    assert!(!std::sync::Arc::ptr_eq(&first, &reopened));
    assert_eq!(reopened.lock().await.store.cart_total(), 20);

    let err = registry
        .session("not a key")
        .await
        .err()
        .expect("invalid key must be rejected");
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn read_only_views_do_not_register_sessions() -> anyhow::Result<()> {
    let storage = MemoryCartStorage::new();
    let registry = CartRegistry::new(CartBackend::Memory(storage.clone()));
    for i in 0..500 {
        let (cart, state) = registry.peek(&format!("reader-{i}")).await?;
        assert!(cart.is_empty());
        assert_eq!(state, CheckoutState::Idle);
    }
    assert_eq!(registry.active_sessions().await, 0);

    let mut store = CartStore::open("saved", storage.clone()).await?;
    store.add_to_cart(&product("A", 10, 5), 3).await?;
    let (cart, _) = registry.peek("saved").await?;
    assert_eq!(cart.total(), 30);
    assert_eq!(registry.active_sessions().await, 0);

    // a live session is read in place
    let live = registry.session("saved").await?;
    live.lock().await.store.add_to_cart(&product("B", 5, 5), 1).await?;
    assert_eq!(registry.peek("saved").await?.0.total(), 35);
    Ok(())
}

#[tokio::test]
async fn idle_sessions_are_evicted_when_new_ones_open() -> anyhow::Result<()> {
    let registry = CartRegistry::with_idle_timeout(
        CartBackend::Memory(MemoryCartStorage::new()),
        Duration::ZERO,
    );
    for i in 0..1000 {
        registry.session(&format!("visitor-{i}")).await?;
    }
    assert_eq!(registry.active_sessions().await, 1);

    let evicted = registry.session("gone").await?;
    registry.session("next").await?;
    assert!(evicted.lock().await.is_ended());
    let fresh = registry.lock("gone").await?;
    assert!(!fresh.is_ended());

    let patient = CartRegistry::new(CartBackend::Memory(MemoryCartStorage::new()));
    for i in 0..50 {
        patient.session(&format!("visitor-{i}")).await?;
    }
    assert_eq!(patient.active_sessions().await, 50);
    Ok(())
}

#[tokio::test]
async fn eviction_skips_sessions_with_checkout_in_flight() -> anyhow::Result<()> {
    let registry = CartRegistry::with_idle_timeout(
        CartBackend::Memory(MemoryCartStorage::new()),
        Duration::ZERO,
    );
    let busy = registry.session("busy").await?;
    {
        let mut guard = busy.lock().await;
        guard.store.add_to_cart(&product("A", 10, 5), 1).await?;
        let session = &mut *guard;
        let details = ShippingDetails {
            name: "Karim".to_string(),
            phone: "01800000000".to_string(),
            address: "Road 3".to_string(),
            city: "Dhaka".to_string(),
            payment_method: PaymentMethod::CashOnDelivery,
        };
        session
            .checkout
            .begin(session.store.cart(), &details, &DeliveryPolicy::default())?;
    }

    registry.session("other-1").await?;
    registry.session("other-2").await?;
    assert_eq!(registry.active_sessions().await, 2);

    let again = registry.session("busy").await?;
    assert!(Arc::ptr_eq(&busy, &again));
    assert!(!busy.lock().await.is_ended());
    Ok(())
}

use chrono::Utc;
use pharmacy_storefront::{
    cart::{CartStorage, CartStore, MemoryCartStorage, NoticeLevel, QuantityDirection},
    error::AppError,
    models::Product,
};
use uuid::Uuid;

fn product(name: &str, price: i64, stock: i32) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
        price,
        discount_price: None,
        image: Some(format!("/images/{name}.jpg")),
        stock,
        created_at: Utc::now(),
    }
}

async fn open(storage: &MemoryCartStorage) -> CartStore<MemoryCartStorage> {
    CartStore::open("visitor-1", storage.clone())
        .await
        .expect("open cart")
}

#[tokio::test]
async fn add_reject_and_remove_scenario() -> anyhow::Result<()> {
    let storage = MemoryCartStorage::new();
    let mut store = open(&storage).await;
    let a = product("A", 10, 5);

    let update = store.add_to_cart(&a, 2).await?;
    assert!(update.changed);
    assert_eq!(update.notice.map(|n| n.level), Some(NoticeLevel::Success));
    assert_eq!(store.cart_total(), 20);
    assert_eq!(store.cart_count(), 2);

    let update = store.add_to_cart(&a, 10).await?;
    assert!(!update.changed);
    assert_eq!(update.notice.map(|n| n.level), Some(NoticeLevel::Warning));
    assert_eq!(store.cart_total(), 20);
    assert_eq!(store.cart().line(a.id).map(|l| l.quantity), Some(2));

    store.remove_from_cart(a.id).await?;
    assert!(store.cart().is_empty());
    assert_eq!(store.cart_total(), 0);
    assert_eq!(store.cart_count(), 0);
    Ok(())
}

#[tokio::test]
async fn repeated_adds_sum_until_stock_ceiling() -> anyhow::Result<()> {
    let storage = MemoryCartStorage::new();
    let mut store = open(&storage).await;
    let a = product("A", 7, 5);

    store.add_to_cart(&a, 2).await?;
    store.add_to_cart(&a, 3).await?;
    assert_eq!(store.cart().line(a.id).map(|l| l.quantity), Some(5));
    assert_eq!(store.cart().len(), 1);

    let update = store.add_to_cart(&a, 1).await?;
    assert!(!update.changed);
    assert_eq!(store.cart().line(a.id).map(|l| l.quantity), Some(5));
    assert_eq!(store.cart_total(), 35);
    Ok(())
}

#[tokio::test]
async fn first_add_above_stock_is_rejected() -> anyhow::Result<()> {
    let storage = MemoryCartStorage::new();
    let mut store = open(&storage).await;

    let update = store.add_to_cart(&product("Scarce", 10, 1), 2).await?;
    assert!(!update.changed);
    let update = store.add_to_cart(&product("Gone", 10, 0), 1).await?;
    assert!(!update.changed);
    assert!(
        update
            .notice
            .is_some_and(|n| n.message.contains("out of stock"))
    );
    assert!(store.cart().is_empty());
    assert_eq!(storage.load("visitor-1").await?, None);
    Ok(())
}

#[tokio::test]
async fn non_positive_quantity_is_a_bad_request() {
    let storage = MemoryCartStorage::new();
    let mut store = open(&storage).await;

    let err = store
        .add_to_cart(&product("A", 10, 5), 0)
        .await
        .expect_err("zero quantity must fail");
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn discount_price_is_used_only_when_valid() -> anyhow::Result<()> {
    let storage = MemoryCartStorage::new();
    let mut store = open(&storage).await;

    let mut discounted = product("Discounted", 10, 5);
    discounted.discount_price = Some(8);
    let mut zero = product("Zero", 10, 5);
    zero.discount_price = Some(0);
    let mut above = product("Above", 10, 5);
    above.discount_price = Some(12);

    store.add_to_cart(&discounted, 1).await?;
    store.add_to_cart(&zero, 1).await?;
    store.add_to_cart(&above, 1).await?;

    let price = |id| store.cart().line(id).map(|l| l.unit_price);
    assert_eq!(price(discounted.id), Some(8));
    assert_eq!(price(zero.id), Some(10));
    assert_eq!(price(above.id), Some(10));
    assert_eq!(store.cart_total(), 28);
    Ok(())
}

#[tokio::test]
async fn quantity_steps_stay_within_bounds() -> anyhow::Result<()> {
    let storage = MemoryCartStorage::new();
    let mut store = open(&storage).await;
    let a = product("A", 3, 3);
    store.add_to_cart(&a, 1).await?;

    let update = store
        .update_quantity(a.id, QuantityDirection::Decrement)
        .await?;
    assert!(!update.changed);
    assert!(update.notice.is_none());
    assert_eq!(store.cart().line(a.id).map(|l| l.quantity), Some(1));

    store
        .update_quantity(a.id, QuantityDirection::Increment)
        .await?;
    store
        .update_quantity(a.id, QuantityDirection::Increment)
        .await?;
    let update = store
        .update_quantity(a.id, QuantityDirection::Increment)
        .await?;
    assert!(!update.changed);
    assert_eq!(update.notice.map(|n| n.level), Some(NoticeLevel::Warning));
    assert_eq!(store.cart().line(a.id).map(|l| l.quantity), Some(3));

    store
        .update_quantity(a.id, QuantityDirection::Decrement)
        .await?;
    assert_eq!(store.cart().line(a.id).map(|l| l.quantity), Some(2));
    assert_eq!(store.cart_total(), 6);
    Ok(())
}

#[tokio::test]
async fn unknown_products_are_silent_no_ops() -> anyhow::Result<()> {
    let storage = MemoryCartStorage::new();
    let mut store = open(&storage).await;

    let update = store.remove_from_cart(Uuid::new_v4()).await?;
    assert!(!update.changed);
    assert!(update.notice.is_none());

    let update = store
        .update_quantity(Uuid::new_v4(), QuantityDirection::Increment)
        .await?;
    assert!(!update.changed);
    Ok(())
}

#[tokio::test]
async fn reopening_restores_the_persisted_cart() -> anyhow::Result<()> {
    let storage = MemoryCartStorage::new();
    let a = product("A", 10, 5);
    let b = product("B", 5, 9);

    let expected = {
        let mut store = open(&storage).await;
        store.add_to_cart(&a, 2).await?;
        store.add_to_cart(&b, 3).await?;
        store
            .update_quantity(b.id, QuantityDirection::Increment)
            .await?;
        store.cart().clone()
    };

    let reopened = open(&storage).await;
    assert_eq!(reopened.cart(), &expected);
    assert_eq!(reopened.cart_total(), 40);
    assert_eq!(
        reopened
            .cart()
            .lines()
            .iter()
            .map(|l| l.product_id)
            .collect::<Vec<_>>(),
        vec![a.id, b.id]
    );
    Ok(())
}

#[tokio::test]
async fn clear_removes_the_snapshot() -> anyhow::Result<()> {
    let storage = MemoryCartStorage::new();
    let mut store = open(&storage).await;
    store.add_to_cart(&product("A", 10, 5), 1).await?;
    assert!(storage.load("visitor-1").await?.is_some());

    store.clear_cart().await?;
    assert!(store.cart().is_empty());
    assert_eq!(storage.load("visitor-1").await?, None);

    let reopened = open(&storage).await;
    assert!(reopened.cart().is_empty());
    Ok(())
}

#[tokio::test]
async fn total_matches_lines_after_every_mutation() -> anyhow::Result<()> {
    let storage = MemoryCartStorage::new();
    let mut store = open(&storage).await;
    let products = [product("A", 10, 4), product("B", 25, 2), product("C", 1, 10)];

    let check = |store: &CartStore<MemoryCartStorage>| {
        let expected: i64 = store
            .cart()
            .lines()
            .iter()
            .map(|l| l.unit_price * i64::from(l.quantity))
            .sum();
        assert_eq!(store.cart_total(), expected);
    };

    for p in &products {
        store.add_to_cart(p, 2).await?;
        check(&store);
    }
    store.add_to_cart(&products[1], 1).await?;
    check(&store);
    store
        .update_quantity(products[2].id, QuantityDirection::Increment)
        .await?;
    check(&store);
    store
        .update_quantity(products[0].id, QuantityDirection::Decrement)
        .await?;
    check(&store);
    store.remove_from_cart(products[1].id).await?;
    check(&store);
    assert_eq!(store.cart_total(), 10 + 3);
    Ok(())
}

#[tokio::test]
async fn subscribers_receive_totals_and_notices() -> anyhow::Result<()> {
    let storage = MemoryCartStorage::new();
    let mut store = open(&storage).await;
    let mut events = store.subscribe();
    let a = product("A", 10, 2);

    store.add_to_cart(&a, 2).await?;
    let event = events.try_recv()?;
    assert_eq!(event.key, "visitor-1");
    assert_eq!(event.cart_total, 20);
    assert_eq!(event.cart_count, 2);

    store.add_to_cart(&a, 1).await?;
    let event = events.try_recv()?;
    assert_eq!(event.notice.map(|n| n.level), Some(NoticeLevel::Warning));
    assert_eq!(event.cart_total, 20);

    // floor reached: nothing to report
    store.update_quantity(a.id, QuantityDirection::Decrement).await?;
    store.update_quantity(a.id, QuantityDirection::Decrement).await?;
    let event = events.try_recv()?;
    assert_eq!(event.cart_count, 1);
    assert!(events.try_recv().is_err());
    Ok(())
}

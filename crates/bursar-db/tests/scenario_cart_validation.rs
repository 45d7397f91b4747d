//! Cart store behavior: lazy get-or-create, additive quantities with
//! optimistic stock/activity checks, absolute quantity updates, removal and
//! clearing, actionable errors.
//!
//! DB-backed test. Skips if BURSAR_DATABASE_URL is not set.

use bursar_db::catalog::NewProduct;
use bursar_schemas::{Actor, Cents, Role, ShopError};
use uuid::Uuid;

async fn connect() -> anyhow::Result<Option<sqlx::PgPool>> {
    let url = match std::env::var(bursar_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: {} not set", bursar_db::ENV_DB_URL);
            return Ok(None);
        }
    };
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await?;
    bursar_db::migrate(&pool).await?;
    Ok(Some(pool))
}

async fn seed(pool: &sqlx::PgPool, name: &str, stock: i32, active: bool) -> anyhow::Result<i64> {
    Ok(bursar_db::catalog::insert_product(
        pool,
        &NewProduct {
            school_id: Uuid::new_v4(),
            name: name.to_string(),
            category: None,
            price_cents: Cents::new(750),
            stock_quantity: stock,
            is_active: active,
        },
    )
    .await?)
}

#[tokio::test]
async fn get_or_create_is_lazy_and_stable() -> anyhow::Result<()> {
    let Some(pool) = connect().await? else {
        return Ok(());
    };

    let user = Uuid::new_v4();
    let first = bursar_db::cart::get_or_create(&pool, user).await?;
    assert!(first.items.is_empty());

    let second = bursar_db::cart::get_or_create(&pool, user).await?;
    assert_eq!(first.cart.cart_id, second.cart.cart_id, "one cart per user");

    Ok(())
}

#[tokio::test]
async fn add_is_additive_and_capped_by_stock() -> anyhow::Result<()> {
    let Some(pool) = connect().await? else {
        return Ok(());
    };

    let user = Uuid::new_v4();
    let product = seed(&pool, "Notebook", 5, true).await?;

    let cart = bursar_db::cart::add_item(&pool, user, product, 3).await?;
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 3);

    // 3 already in cart + 3 more exceeds stock 5.
    let err = bursar_db::cart::add_item(&pool, user, product, 3)
        .await
        .unwrap_err();
    match &err {
        ShopError::InsufficientStock {
            product,
            requested,
            available,
        } => {
            assert_eq!(product, "Notebook");
            assert_eq!(*requested, 6);
            assert_eq!(*available, 5);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // The failed add must not have changed the line.
    let cart = bursar_db::cart::get_or_create(&pool, user).await?;
    assert_eq!(cart.items[0].quantity, 3);

    // Within stock, the add accumulates.
    let cart = bursar_db::cart::add_item(&pool, user, product, 2).await?;
    assert_eq!(cart.items[0].quantity, 5);

    Ok(())
}

#[tokio::test]
async fn absent_and_inactive_products_are_rejected() -> anyhow::Result<()> {
    let Some(pool) = connect().await? else {
        return Ok(());
    };

    let user = Uuid::new_v4();

    let err = bursar_db::cart::add_item(&pool, user, 999_999_999, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::NotFound(_)));

    let inactive = seed(&pool, "Old Badge", 10, false).await?;
    let err = bursar_db::cart::add_item(&pool, user, inactive, 1)
        .await
        .unwrap_err();
    match &err {
        ShopError::InvalidState(msg) => assert!(msg.contains("Old Badge")),
        other => panic!("expected InvalidState, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn set_quantity_is_absolute() -> anyhow::Result<()> {
    let Some(pool) = connect().await? else {
        return Ok(());
    };

    let user = Uuid::new_v4();
    let product = seed(&pool, "Ruler", 10, true).await?;

    // Updating a line that is not in the cart is NotFound.
    let err = bursar_db::cart::set_item_quantity(&pool, user, product, 2)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::NotFound(_)));

    bursar_db::cart::add_item(&pool, user, product, 1).await?;
    let cart = bursar_db::cart::set_item_quantity(&pool, user, product, 7).await?;
    assert_eq!(cart.items[0].quantity, 7);

    // Absolute set is still stock-capped.
    let err = bursar_db::cart::set_item_quantity(&pool, user, product, 11)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::InsufficientStock { .. }));

    // Zero is not a quantity; removal is its own operation.
    let err = bursar_db::cart::set_item_quantity(&pool, user, product, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::InvalidState(_)));

    Ok(())
}

#[tokio::test]
async fn remove_and_clear() -> anyhow::Result<()> {
    let Some(pool) = connect().await? else {
        return Ok(());
    };

    let user = Uuid::new_v4();
    let a = seed(&pool, "Compass", 10, true).await?;
    let b = seed(&pool, "Protractor", 10, true).await?;

    let err = bursar_db::cart::remove_item(&pool, user, a).await.unwrap_err();
    assert!(matches!(err, ShopError::NotFound(_)));

    bursar_db::cart::add_item(&pool, user, a, 1).await?;
    bursar_db::cart::add_item(&pool, user, b, 2).await?;

    let cart = bursar_db::cart::remove_item(&pool, user, a).await?;
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].product_id, b);

    let cart = bursar_db::cart::clear(&pool, user).await?;
    assert!(cart.items.is_empty());

    Ok(())
}

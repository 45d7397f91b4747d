//! All-or-nothing validation: one bad cart line aborts the whole checkout
//! with zero partial effects — no order, no order items, no stock change
//! for ANY line, cart left exactly as it was.
//!
//! DB-backed test. Skips if BURSAR_DATABASE_URL is not set.

use bursar_db::catalog::NewProduct;
use bursar_db::orders::OrderFilter;
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

async fn seed(pool: &sqlx::PgPool, school: Uuid, name: &str, stock: i32) -> anyhow::Result<i64> {
    Ok(bursar_db::catalog::insert_product(
        pool,
        &NewProduct {
            school_id: school,
            name: name.to_string(),
            category: None,
            price_cents: Cents::new(1000),
            stock_quantity: stock,
            is_active: true,
        },
    )
    .await?)
}

#[tokio::test]
async fn inactive_item_aborts_whole_checkout() -> anyhow::Result<()> {
    let Some(pool) = connect().await? else {
        return Ok(());
    };

    let school = Uuid::new_v4();
    let buyer = Actor::new(Uuid::new_v4(), Role::Parent);

    let a = seed(&pool, school, "Blazer", 100).await?;
    let b = seed(&pool, school, "Scarf", 50).await?;

    bursar_db::cart::add_item(&pool, buyer.user_id, a, 2).await?;
    bursar_db::cart::add_item(&pool, buyer.user_id, b, 1).await?;

    // B goes inactive between cart-add and checkout. Cart-time validity
    // must not be trusted.
    bursar_db::catalog::set_product_active(&pool, b, false).await?;

    let err = bursar_db::checkout::checkout(&pool, buyer, Uuid::new_v4(), None)
        .await
        .unwrap_err();
    match &err {
        ShopError::InvalidState(msg) => {
            assert!(msg.contains("Scarf"), "error must name the offending product: {msg}")
        }
        other => panic!("expected InvalidState, got {other:?}"),
    }

    // Zero partial effects: A's stock untouched, no order created, cart intact.
    assert_eq!(
        bursar_db::catalog::fetch_product(&pool, a).await?.stock_quantity,
        100
    );
    let orders = bursar_db::orders::list_orders(&pool, buyer, &OrderFilter::default()).await?;
    assert!(orders.is_empty(), "no order may exist after a failed checkout");
    let cart = bursar_db::cart::get_or_create(&pool, buyer.user_id).await?;
    assert_eq!(cart.items.len(), 2, "cart must be untouched after a failed checkout");

    Ok(())
}

#[tokio::test]
async fn insufficient_stock_aborts_and_names_quantities() -> anyhow::Result<()> {
    let Some(pool) = connect().await? else {
        return Ok(());
    };

    let school = Uuid::new_v4();
    let buyer = Actor::new(Uuid::new_v4(), Role::Parent);

    let a = seed(&pool, school, "Gym Shirt", 100).await?;
    let b = seed(&pool, school, "Gym Shorts", 3).await?;

    bursar_db::cart::add_item(&pool, buyer.user_id, a, 1).await?;
    bursar_db::cart::add_item(&pool, buyer.user_id, b, 3).await?;

    // Stock drops after cart-add; the lock-fresh re-validation must catch it.
    sqlx::query("update products set stock_quantity = 2 where product_id = $1")
        .bind(b)
        .execute(&pool)
        .await?;

    let err = bursar_db::checkout::checkout(&pool, buyer, Uuid::new_v4(), None)
        .await
        .unwrap_err();
    match &err {
        ShopError::InsufficientStock {
            product,
            requested,
            available,
        } => {
            assert_eq!(product, "Gym Shorts");
            assert_eq!(*requested, 3);
            assert_eq!(*available, 2);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    assert_eq!(
        bursar_db::catalog::fetch_product(&pool, a).await?.stock_quantity,
        100,
        "no partial decrement on the passing line"
    );

    Ok(())
}

#[tokio::test]
async fn empty_cart_is_rejected() -> anyhow::Result<()> {
    let Some(pool) = connect().await? else {
        return Ok(());
    };

    let buyer = Actor::new(Uuid::new_v4(), Role::Parent);

    // Never-used cart (no row at all).
    let err = bursar_db::checkout::checkout(&pool, buyer, Uuid::new_v4(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::EmptyCart));

    // Existing but emptied cart.
    bursar_db::cart::get_or_create(&pool, buyer.user_id).await?;
    let err = bursar_db::checkout::checkout(&pool, buyer, Uuid::new_v4(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::EmptyCart));

    Ok(())
}

//! Cancellation compensates the checkout decrement: an order for 2 units
//! taken from stock 100 leaves 98; cancelling restores 100. Cancellation is
//! guarded (ownership, cancellable statuses) and never silently repeated.
//!
//! DB-backed test. Skips if BURSAR_DATABASE_URL is not set.

use bursar_db::catalog::NewProduct;
use bursar_db::payments::PaymentStatus;
use bursar_orders::OrderStatus;
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

async fn seed_order(
    pool: &sqlx::PgPool,
    buyer: Actor,
    stock: i32,
    qty: i32,
) -> anyhow::Result<(i64, bursar_db::orders::OrderRow)> {
    let product = bursar_db::catalog::insert_product(
        pool,
        &NewProduct {
            school_id: Uuid::new_v4(),
            name: "Lab Coat".to_string(),
            category: None,
            price_cents: Cents::new(2000),
            stock_quantity: stock,
            is_active: true,
        },
    )
    .await?;
    bursar_db::cart::add_item(pool, buyer.user_id, product, qty).await?;
    let order = bursar_db::checkout::checkout(pool, buyer, Uuid::new_v4(), None).await?;
    Ok((product, order))
}

#[tokio::test]
async fn cancel_restores_stock_and_records_metadata() -> anyhow::Result<()> {
    let Some(pool) = connect().await? else {
        return Ok(());
    };

    let buyer = Actor::new(Uuid::new_v4(), Role::Parent);
    let (product, order) = seed_order(&pool, buyer, 100, 2).await?;

    assert_eq!(
        bursar_db::catalog::fetch_product(&pool, product).await?.stock_quantity,
        98
    );

    let (cancelled, payment) = bursar_db::orders::cancel_order(
        &pool,
        order.order_id,
        buyer,
        Some("ordered the wrong size".to_string()),
    )
    .await?;

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.cancelled_by, Some(buyer.user_id));
    assert_eq!(
        cancelled.cancellation_reason.as_deref(),
        Some("ordered the wrong size")
    );
    assert!(cancelled.cancelled_at.is_some());
    assert!(payment.is_none(), "nothing was captured on this order");

    assert_eq!(
        bursar_db::catalog::fetch_product(&pool, product).await?.stock_quantity,
        100,
        "cancellation must restore the full decrement"
    );

    // Cancelling an already-cancelled order is rejected, never repeated.
    let err = bursar_db::orders::cancel_order(&pool, order.order_id, buyer, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::InvalidState(_)));
    assert_eq!(
        bursar_db::catalog::fetch_product(&pool, product).await?.stock_quantity,
        100,
        "a rejected double-cancel must not restore stock twice"
    );

    Ok(())
}

#[tokio::test]
async fn only_owner_or_admin_may_cancel() -> anyhow::Result<()> {
    let Some(pool) = connect().await? else {
        return Ok(());
    };

    let buyer = Actor::new(Uuid::new_v4(), Role::Parent);
    let stranger = Actor::new(Uuid::new_v4(), Role::Parent);
    let admin = Actor::new(Uuid::new_v4(), Role::Admin);

    let (product, order) = seed_order(&pool, buyer, 10, 1).await?;

    let err = bursar_db::orders::cancel_order(&pool, order.order_id, stranger, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Forbidden(_)));
    assert_eq!(
        bursar_db::catalog::fetch_product(&pool, product).await?.stock_quantity,
        9,
        "a forbidden cancel must not touch stock"
    );

    // Admin may cancel on the owner's behalf.
    let (cancelled, _) =
        bursar_db::orders::cancel_order(&pool, order.order_id, admin, None).await?;
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.cancelled_by, Some(admin.user_id));

    Ok(())
}

#[tokio::test]
async fn cancel_surfaces_captured_payment_for_refund() -> anyhow::Result<()> {
    let Some(pool) = connect().await? else {
        return Ok(());
    };

    let buyer = Actor::new(Uuid::new_v4(), Role::Parent);
    let (_, order) = seed_order(&pool, buyer, 10, 1).await?;

    let pay = bursar_db::payments::insert_payment(
        &pool,
        Uuid::new_v4(),
        order.order_id,
        "gw_order_123",
        order.total_amount_cents,
    )
    .await?;
    bursar_db::payments::set_payment_status(&pool, pay.payment_id, PaymentStatus::Captured)
        .await?;

    let (_, payment) =
        bursar_db::orders::cancel_order(&pool, order.order_id, buyer, None).await?;
    let payment = payment.expect("captured payment must surface for the refund path");
    assert_eq!(payment.payment_id, pay.payment_id);
    assert_eq!(payment.status, PaymentStatus::Captured);

    Ok(())
}

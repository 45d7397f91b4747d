//! Shared row-locking and stock-adjustment helpers.
//!
//! Both checkout (decrement) and cancellation (restore) go through these.
//! Locks are always taken with `ORDER BY product_id` so two transactions
//! touching overlapping product sets acquire them in the same global order
//! and cannot deadlock against each other.

use bursar_schemas::{Cents, ShopError};
use sqlx::{PgConnection, Row};
use uuid::Uuid;

/// A product row read under `FOR UPDATE`. The quantities and flags here are
/// lock-fresh: no other transaction can change them until ours ends.
#[derive(Debug, Clone)]
pub(crate) struct LockedProduct {
    pub product_id: i64,
    pub school_id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub stock_quantity: i32,
    pub price_cents: Cents,
}

/// Acquire exclusive locks on the given products, in ascending product-id
/// order, and return their current rows. The lock is held until the
/// enclosing transaction commits or rolls back.
pub(crate) async fn lock_products(
    conn: &mut PgConnection,
    product_ids: &[i64],
) -> Result<Vec<LockedProduct>, ShopError> {
    let rows = sqlx::query(
        r#"
        select product_id, school_id, name, is_active, stock_quantity, price_cents
        from products
        where product_id = any($1)
        order by product_id
        for update
        "#,
    )
    .bind(product_ids)
    .fetch_all(conn)
    .await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(LockedProduct {
            product_id: row.try_get("product_id")?,
            school_id: row.try_get("school_id")?,
            name: row.try_get("name")?,
            is_active: row.try_get("is_active")?,
            stock_quantity: row.try_get("stock_quantity")?,
            price_cents: Cents::new(row.try_get("price_cents")?),
        });
    }
    Ok(out)
}

/// Adjust a product's stock by `delta` (negative = checkout decrement,
/// positive = cancellation restore). Caller must already hold the row lock.
pub(crate) async fn adjust_stock(
    conn: &mut PgConnection,
    product_id: i64,
    delta: i32,
) -> Result<(), ShopError> {
    sqlx::query(
        r#"
        update products
        set stock_quantity = stock_quantity + $2,
            updated_at = now()
        where product_id = $1
        "#,
    )
    .bind(product_id)
    .bind(delta)
    .execute(conn)
    .await?;
    Ok(())
}

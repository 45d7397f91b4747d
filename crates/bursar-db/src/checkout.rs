//! Checkout orchestrator.
//!
//! Converts a user's cart into a durable, priced order inside one atomic
//! transaction:
//!
//! 1. load the cart and its lines;
//! 2. lock every referenced product row, ascending by product id;
//! 3. re-validate activity and stock against the lock-fresh rows — one bad
//!    item aborts the entire checkout, no partial orders;
//! 4. decrement stock, snapshot unit prices, insert the order and its
//!    items, clear the cart;
//! 5. commit.
//!
//! Any failure at any step rolls everything back: no stock change, no
//! order, cart untouched. Two checkouts contending for the last unit of a
//! product serialize on the row lock; the loser re-reads the decremented
//! stock and fails with `InsufficientStock` instead of overselling.

use bursar_schemas::{Actor, Cents, ShopError};
use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::orders::{order_from_row, OrderRow};
use crate::stock::{adjust_stock, lock_products};

struct CartLineRef {
    product_id: i64,
    quantity: i32,
}

/// Convert the actor's cart into an order. See the module docs for the
/// transaction shape. Returns the created order, in `pending_payment`;
/// the caller proceeds to the payment handoff.
pub async fn checkout(
    pool: &PgPool,
    actor: Actor,
    student_id: Uuid,
    delivery_notes: Option<String>,
) -> Result<OrderRow, ShopError> {
    let mut tx = pool.begin().await?;

    // 1. Cart + lines. No cart at all is the same as an empty one.
    let cart_id: Uuid = match sqlx::query("select cart_id from carts where user_id = $1")
        .bind(actor.user_id)
        .fetch_optional(&mut *tx)
        .await?
    {
        Some(row) => row.try_get("cart_id")?,
        None => return Err(ShopError::EmptyCart),
    };

    let line_rows = sqlx::query(
        r#"
        select product_id, quantity
        from cart_items
        where cart_id = $1
        order by product_id
        "#,
    )
    .bind(cart_id)
    .fetch_all(&mut *tx)
    .await?;

    if line_rows.is_empty() {
        return Err(ShopError::EmptyCart);
    }

    let mut lines = Vec::with_capacity(line_rows.len());
    for row in &line_rows {
        lines.push(CartLineRef {
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
        });
    }

    // 2. Exclusive locks, ascending by product id (fixed global order).
    let ids: Vec<i64> = lines.iter().map(|l| l.product_id).collect();
    let locked = lock_products(&mut tx, &ids).await?;

    // 3. All-or-nothing validation against the lock-fresh rows.
    let mut school_id: Option<Uuid> = None;
    let mut total = Cents::ZERO;
    let mut priced: Vec<(i64, i32, Cents)> = Vec::with_capacity(lines.len());

    for line in &lines {
        let product = locked
            .iter()
            .find(|p| p.product_id == line.product_id)
            .ok_or_else(|| ShopError::NotFound(format!("product {}", line.product_id)))?;

        if !product.is_active {
            return Err(ShopError::InvalidState(format!(
                "{} is no longer available",
                product.name
            )));
        }
        if line.quantity > product.stock_quantity {
            return Err(ShopError::InsufficientStock {
                product: product.name.clone(),
                requested: line.quantity,
                available: product.stock_quantity,
            });
        }

        // The order belongs to exactly one school; a cart that somehow
        // spans two is a client error, not something to guess about.
        match school_id {
            None => school_id = Some(product.school_id),
            Some(s) if s == product.school_id => {}
            Some(_) => {
                return Err(ShopError::InvalidState(
                    "cart contains products from more than one school".to_string(),
                ))
            }
        }

        let line_total = product
            .price_cents
            .checked_mul_qty(i64::from(line.quantity))
            .and_then(|lt| total.checked_add(lt))
            .ok_or_else(|| ShopError::InvalidState("order total overflows".to_string()))?;
        total = line_total;
        priced.push((line.product_id, line.quantity, product.price_cents));
    }
    // `lines` is non-empty, so at least one product set this.
    let school_id = school_id.ok_or(ShopError::EmptyCart)?;

    // 4. Commit stock, still inside the lock scope.
    for (product_id, quantity, _) in &priced {
        adjust_stock(&mut tx, *product_id, -quantity).await?;
    }

    // 5. Order + items with snapshotted unit prices.
    let order_id = Uuid::new_v4();
    let order_row = sqlx::query(
        r#"
        insert into orders (
          order_id, order_number, user_id, student_id, school_id,
          total_amount_cents, status, delivery_notes
        ) values ($1, $2, $3, $4, $5, $6, 'pending_payment', $7)
        returning order_id, order_number, user_id, student_id, school_id,
                  total_amount_cents, status, delivery_notes,
                  created_at, updated_at,
                  cancelled_at, cancelled_by, cancellation_reason
        "#,
    )
    .bind(order_id)
    .bind(generate_order_number())
    .bind(actor.user_id)
    .bind(student_id)
    .bind(school_id)
    .bind(total.raw())
    .bind(&delivery_notes)
    .fetch_one(&mut *tx)
    .await?;
    let order = order_from_row(&order_row)?;

    for (product_id, quantity, unit_price) in &priced {
        sqlx::query(
            r#"
            insert into order_items (order_id, product_id, quantity, unit_price_cents)
            values ($1, $2, $3, $4)
            "#,
        )
        .bind(order_id)
        .bind(*product_id)
        .bind(*quantity)
        .bind(unit_price.raw())
        .execute(&mut *tx)
        .await?;
    }

    // A successful checkout consumes the cart.
    sqlx::query("delete from cart_items where cart_id = $1")
        .bind(cart_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("update carts set updated_at = now() where cart_id = $1")
        .bind(cart_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(order)
}

/// Human-readable unique order number, e.g. `SO-20260831-1f2a3b4c`.
fn generate_order_number() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("SO-{}-{}", Utc::now().format("%Y%m%d"), &suffix[..8])
}

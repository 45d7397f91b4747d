//! Order reads and guarded lifecycle transitions.
//!
//! Orders are created only by checkout and thereafter mutated only here,
//! through [`cancel_order`] and [`update_status`]. Both take the order row
//! lock first and consult the central transition table in `bursar-orders`;
//! no endpoint compares status strings on its own. Cancellation restores
//! stock atomically with the status change; forward transitions never touch
//! stock.

use bursar_orders::{validate_transition, OrderStatus};
use bursar_schemas::{Actor, Cents, ShopError};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgConnection, PgPool, Row};
use uuid::Uuid;

use crate::payments::{payment_from_row, PaymentRow};
use crate::stock::{adjust_stock, lock_products};

#[derive(Debug, Clone)]
pub struct OrderRow {
    pub order_id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub student_id: Uuid,
    pub school_id: Uuid,
    pub total_amount_cents: Cents,
    pub status: OrderStatus,
    pub delivery_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<Uuid>,
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrderItemRow {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price_cents: Cents,
}

/// Optional filters for order listings.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub student_id: Option<Uuid>,
    pub limit: Option<i64>,
}

const ORDER_COLUMNS: &str = r#"
    order_id, order_number, user_id, student_id, school_id,
    total_amount_cents, status, delivery_notes,
    created_at, updated_at,
    cancelled_at, cancelled_by, cancellation_reason
"#;

pub(crate) fn order_from_row(row: &PgRow) -> Result<OrderRow, ShopError> {
    let status_str: String = row.try_get("status")?;
    let status = OrderStatus::parse(&status_str)
        .map_err(|e| ShopError::Db(sqlx::Error::Decode(Box::new(e))))?;

    Ok(OrderRow {
        order_id: row.try_get("order_id")?,
        order_number: row.try_get("order_number")?,
        user_id: row.try_get("user_id")?,
        student_id: row.try_get("student_id")?,
        school_id: row.try_get("school_id")?,
        total_amount_cents: Cents::new(row.try_get("total_amount_cents")?),
        status,
        delivery_notes: row.try_get("delivery_notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        cancelled_at: row.try_get("cancelled_at")?,
        cancelled_by: row.try_get("cancelled_by")?,
        cancellation_reason: row.try_get("cancellation_reason")?,
    })
}

fn authorize(order: &OrderRow, actor: Actor) -> Result<(), ShopError> {
    if actor.is_admin() || order.user_id == actor.user_id {
        Ok(())
    } else {
        Err(ShopError::Forbidden(format!(
            "order {} belongs to another user",
            order.order_number
        )))
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Fetch one order visible to the actor (owner or admin).
pub async fn fetch_order(
    pool: &PgPool,
    order_id: Uuid,
    actor: Actor,
) -> Result<OrderRow, ShopError> {
    let row = sqlx::query(&format!(
        "select {ORDER_COLUMNS} from orders where order_id = $1"
    ))
    .bind(order_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ShopError::NotFound(format!("order {order_id}")))?;

    let order = order_from_row(&row)?;
    authorize(&order, actor)?;
    Ok(order)
}

pub async fn fetch_order_items(
    pool: &PgPool,
    order_id: Uuid,
) -> Result<Vec<OrderItemRow>, ShopError> {
    let rows = sqlx::query(
        r#"
        select oi.product_id, oi.quantity, oi.unit_price_cents, p.name
        from order_items oi
        join products p on p.product_id = oi.product_id
        where oi.order_id = $1
        order by oi.product_id
        "#,
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(OrderItemRow {
            product_id: row.try_get("product_id")?,
            product_name: row.try_get("name")?,
            quantity: row.try_get("quantity")?,
            unit_price_cents: Cents::new(row.try_get("unit_price_cents")?),
        });
    }
    Ok(out)
}

/// List orders: owners see their own, admins see all.
pub async fn list_orders(
    pool: &PgPool,
    actor: Actor,
    filter: &OrderFilter,
) -> Result<Vec<OrderRow>, ShopError> {
    let rows = sqlx::query(&format!(
        r#"
        select {ORDER_COLUMNS}
        from orders
        where ($1 or user_id = $2)
          and ($3::text is null or status = $3)
          and ($4::uuid is null or student_id = $4)
        order by created_at desc
        limit $5
        "#
    ))
    .bind(actor.is_admin())
    .bind(actor.user_id)
    .bind(filter.status.map(|s| s.as_str()))
    .bind(filter.student_id)
    .bind(filter.limit.unwrap_or(100).clamp(1, 500))
    .fetch_all(pool)
    .await?;

    rows.iter().map(order_from_row).collect()
}

// ---------------------------------------------------------------------------
// Lifecycle transitions
// ---------------------------------------------------------------------------

async fn lock_order(conn: &mut PgConnection, order_id: Uuid) -> Result<OrderRow, ShopError> {
    let row = sqlx::query(&format!(
        "select {ORDER_COLUMNS} from orders where order_id = $1 for update"
    ))
    .bind(order_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| ShopError::NotFound(format!("order {order_id}")))?;

    order_from_row(&row)
}

/// Cancel an order, restoring stock atomically with the status change.
///
/// Only the owner (or an admin) may cancel, and only while the order is in
/// `pending_payment` or `processing`. Cancelling a cancelled order is
/// rejected, never silently repeated.
///
/// Returns the cancelled order plus any captured payment on it, so the
/// caller can drive a refund when one was requested. The refund is NOT part
/// of this transaction: a refund failure is reported upstream but the
/// cancellation and stock restoration stand.
pub async fn cancel_order(
    pool: &PgPool,
    order_id: Uuid,
    actor: Actor,
    reason: Option<String>,
) -> Result<(OrderRow, Option<PaymentRow>), ShopError> {
    let mut tx = pool.begin().await?;

    let order = lock_order(&mut tx, order_id).await?;
    authorize(&order, actor)?;
    validate_transition(order.status, OrderStatus::Cancelled)
        .map_err(|e| ShopError::InvalidState(e.to_string()))?;

    // Compensate the checkout decrement, under the same fixed lock order
    // checkout uses so the two cannot deadlock against each other.
    let item_rows = sqlx::query(
        "select product_id, quantity from order_items where order_id = $1 order by product_id",
    )
    .bind(order_id)
    .fetch_all(&mut *tx)
    .await?;

    let mut restores: Vec<(i64, i32)> = Vec::with_capacity(item_rows.len());
    for row in &item_rows {
        restores.push((row.try_get("product_id")?, row.try_get("quantity")?));
    }

    let ids: Vec<i64> = restores.iter().map(|(id, _)| *id).collect();
    lock_products(&mut tx, &ids).await?;
    for (product_id, quantity) in &restores {
        adjust_stock(&mut tx, *product_id, *quantity).await?;
    }

    let row = sqlx::query(&format!(
        r#"
        update orders
        set status = 'cancelled',
            cancelled_at = now(),
            cancelled_by = $2,
            cancellation_reason = $3,
            updated_at = now()
        where order_id = $1
        returning {ORDER_COLUMNS}
        "#
    ))
    .bind(order_id)
    .bind(actor.user_id)
    .bind(&reason)
    .fetch_one(&mut *tx)
    .await?;
    let cancelled = order_from_row(&row)?;

    let payment = sqlx::query(
        r#"
        select payment_id, order_id, gateway_order_id, amount_cents, status,
               created_at, updated_at
        from payments
        where order_id = $1 and status = 'captured'
        order by created_at desc
        limit 1
        "#,
    )
    .bind(order_id)
    .fetch_optional(&mut *tx)
    .await?
    .map(|r| payment_from_row(&r))
    .transpose()?;

    tx.commit().await?;
    Ok((cancelled, payment))
}

/// Apply a forward status transition. Admin-only; validated against the
/// central transition table under the order row lock. Forward transitions
/// never touch stock, so `cancelled` is refused here outright: cancellation
/// must go through [`cancel_order`], which restores stock and records the
/// cancellation metadata.
pub async fn update_status(
    pool: &PgPool,
    order_id: Uuid,
    actor: Actor,
    new_status: OrderStatus,
) -> Result<OrderRow, ShopError> {
    if !actor.is_admin() {
        return Err(ShopError::Forbidden(
            "order status updates require the admin role".to_string(),
        ));
    }
    if new_status == OrderStatus::Cancelled {
        return Err(ShopError::InvalidState(
            "orders are cancelled through the cancel operation, not a status update".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let order = lock_order(&mut tx, order_id).await?;
    validate_transition(order.status, new_status)
        .map_err(|e| ShopError::InvalidState(e.to_string()))?;

    let row = sqlx::query(&format!(
        r#"
        update orders
        set status = $2, updated_at = now()
        where order_id = $1
        returning {ORDER_COLUMNS}
        "#
    ))
    .bind(order_id)
    .bind(new_status.as_str())
    .fetch_one(&mut *tx)
    .await?;
    let updated = order_from_row(&row)?;

    tx.commit().await?;
    Ok(updated)
}

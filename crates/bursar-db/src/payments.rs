//! Payment records backing the gateway handoff.
//!
//! One row per initiation attempt. Capture confirmation arrives from the
//! gateway's webhook pipeline, which lives outside this engine; these
//! helpers only persist what the handoff and refund paths need.

use bursar_schemas::{Cents, ShopError};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Created,
    Captured,
    Refunded,
    RefundFailed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Created => "created",
            PaymentStatus::Captured => "captured",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::RefundFailed => "refund_failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ShopError> {
        match s {
            "created" => Ok(PaymentStatus::Created),
            "captured" => Ok(PaymentStatus::Captured),
            "refunded" => Ok(PaymentStatus::Refunded),
            "refund_failed" => Ok(PaymentStatus::RefundFailed),
            other => Err(ShopError::InvalidState(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentRow {
    pub payment_id: Uuid,
    pub order_id: Uuid,
    pub gateway_order_id: Option<String>,
    pub amount_cents: Cents,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn payment_from_row(row: &PgRow) -> Result<PaymentRow, ShopError> {
    let status_str: String = row.try_get("status")?;
    Ok(PaymentRow {
        payment_id: row.try_get("payment_id")?,
        order_id: row.try_get("order_id")?,
        gateway_order_id: row.try_get("gateway_order_id")?,
        amount_cents: Cents::new(row.try_get("amount_cents")?),
        status: PaymentStatus::parse(&status_str)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Record a gateway session opened for an order.
pub async fn insert_payment(
    pool: &PgPool,
    payment_id: Uuid,
    order_id: Uuid,
    gateway_order_id: &str,
    amount: Cents,
) -> Result<PaymentRow, ShopError> {
    let row = sqlx::query(
        r#"
        insert into payments (payment_id, order_id, gateway_order_id, amount_cents)
        values ($1, $2, $3, $4)
        returning payment_id, order_id, gateway_order_id, amount_cents, status,
                  created_at, updated_at
        "#,
    )
    .bind(payment_id)
    .bind(order_id)
    .bind(gateway_order_id)
    .bind(amount.raw())
    .fetch_one(pool)
    .await?;

    payment_from_row(&row)
}

pub async fn set_payment_status(
    pool: &PgPool,
    payment_id: Uuid,
    status: PaymentStatus,
) -> Result<(), ShopError> {
    let res = sqlx::query(
        "update payments set status = $2, updated_at = now() where payment_id = $1",
    )
    .bind(payment_id)
    .bind(status.as_str())
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Err(ShopError::NotFound(format!("payment {payment_id}")));
    }
    Ok(())
}

/// The most recent captured payment on an order, if any.
pub async fn fetch_captured_payment(
    pool: &PgPool,
    order_id: Uuid,
) -> Result<Option<PaymentRow>, ShopError> {
    sqlx::query(
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
    .fetch_optional(pool)
    .await?
    .map(|r| payment_from_row(&r))
    .transpose()
}

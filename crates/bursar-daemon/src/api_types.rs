//! Request/response DTOs for the bursar-daemon HTTP API.
//!
//! These are the wire shapes only; domain types live in bursar-schemas /
//! bursar-orders and are converted at the handler boundary.

use bursar_db::cart::HydratedCart;
use bursar_db::orders::{OrderItemRow, OrderRow};
use bursar_orders::OrderStatus;
use bursar_schemas::{PaymentSession, RefundOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Health / status
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub ok: bool,
    pub has_orders_table: bool,
}

/// Uniform error body; `kind` is the machine-readable tag from
/// `ShopError::kind`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct CartItemDto {
    pub product_id: i64,
    pub name: String,
    pub category: Option<String>,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub is_active: bool,
    pub stock_quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart_id: Uuid,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<CartItemDto>,
    pub subtotal_cents: i64,
}

impl From<HydratedCart> for CartResponse {
    fn from(cart: HydratedCart) -> Self {
        let subtotal_cents = cart
            .items
            .iter()
            .map(|i| i.unit_price_cents.raw() * i64::from(i.quantity))
            .sum();
        Self {
            cart_id: cart.cart.cart_id,
            updated_at: cart.cart.updated_at,
            subtotal_cents,
            items: cart
                .items
                .into_iter()
                .map(|i| CartItemDto {
                    product_id: i.product_id,
                    name: i.name,
                    category: i.category,
                    quantity: i.quantity,
                    unit_price_cents: i.unit_price_cents.raw(),
                    is_active: i.is_active,
                    stock_quantity: i.stock_quantity,
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub student_id: Uuid,
    pub delivery_notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderDto {
    pub order_id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub student_id: Uuid,
    pub school_id: Uuid,
    pub total_amount_cents: i64,
    pub status: OrderStatus,
    pub delivery_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
}

impl From<OrderRow> for OrderDto {
    fn from(o: OrderRow) -> Self {
        Self {
            order_id: o.order_id,
            order_number: o.order_number,
            user_id: o.user_id,
            student_id: o.student_id,
            school_id: o.school_id,
            total_amount_cents: o.total_amount_cents.raw(),
            status: o.status,
            delivery_notes: o.delivery_notes,
            created_at: o.created_at,
            updated_at: o.updated_at,
            cancelled_at: o.cancelled_at,
            cancellation_reason: o.cancellation_reason,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderItemDto {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

impl From<OrderItemRow> for OrderItemDto {
    fn from(i: OrderItemRow) -> Self {
        Self {
            product_id: i.product_id,
            product_name: i.product_name,
            quantity: i.quantity,
            unit_price_cents: i.unit_price_cents.raw(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderDetailResponse {
    pub order: OrderDto,
    pub items: Vec<OrderItemDto>,
}

/// Checkout result. `payment_session` is absent when payment initiation
/// failed; the order still exists in `pending_payment` and initiation can
/// be retried via `POST /v1/orders/{id}/payment`.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order: OrderDto,
    pub payment_session: Option<PaymentSession>,
    pub payment_error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
    pub student_id: Option<Uuid>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
    #[serde(default)]
    pub refund_requested: bool,
}

/// Cancellation result. The cancellation itself is the durable outcome; a
/// refund failure shows up in `refund`/`refund_error` without undoing it.
#[derive(Debug, Serialize)]
pub struct CancelOrderResponse {
    pub order: OrderDto,
    pub refund: Option<RefundOutcome>,
    pub refund_error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

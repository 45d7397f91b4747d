//! Axum router and all HTTP handlers for bursar-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.
//!
//! Identity arrives from the platform's session layer as two trusted
//! headers, `x-user-id` and `x-user-role`; this daemon only applies
//! ownership and admin checks on top of them.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, warn};
use uuid::Uuid;

use bursar_db::orders::{OrderFilter, OrderRow};
use bursar_db::payments::PaymentStatus;
use bursar_orders::OrderStatus;
use bursar_schemas::{Actor, PaymentSession, RefundOutcome, Role, ShopError};

use crate::api_types::{
    AddItemRequest, CancelOrderRequest, CancelOrderResponse, CartResponse, CheckoutRequest,
    CheckoutResponse, ErrorResponse, HealthResponse, ListOrdersQuery, OrderDetailResponse,
    OrderDto, SetQuantityRequest, StatusResponse, UpdateStatusRequest,
};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/cart", get(get_cart).delete(clear_cart))
        .route("/v1/cart/items", post(add_cart_item))
        .route(
            "/v1/cart/items/:product_id",
            put(set_cart_item_quantity).delete(remove_cart_item),
        )
        .route("/v1/checkout", post(checkout))
        .route("/v1/orders", get(list_orders))
        .route("/v1/orders/:order_id", get(get_order))
        .route("/v1/orders/:order_id/cancel", post(cancel_order))
        .route("/v1/orders/:order_id/status", post(update_order_status))
        .route("/v1/orders/:order_id/payment", post(retry_payment))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Wrapper turning `ShopError` into an HTTP response with the uniform
/// `{ error, kind }` body.
pub(crate) struct ApiError(ShopError);

impl From<ShopError> for ApiError {
    fn from(e: ShopError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ShopError::NotFound(_) => StatusCode::NOT_FOUND,
            ShopError::Forbidden(_) => StatusCode::FORBIDDEN,
            ShopError::InvalidState(_) | ShopError::InsufficientStock { .. } => {
                StatusCode::CONFLICT
            }
            ShopError::EmptyCart => StatusCode::BAD_REQUEST,
            ShopError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ShopError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Transport details stay in the logs, not in client responses.
        let error = if let ShopError::Db(e) = &self.0 {
            warn!(error = %e, "database error");
            "internal error".to_string()
        } else {
            self.0.to_string()
        };

        (
            status,
            Json(ErrorResponse {
                error,
                kind: self.0.kind().to_string(),
            }),
        )
            .into_response()
    }
}

/// Extract the acting user from the session headers.
fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or_else(|| ShopError::Forbidden("missing or invalid x-user-id header".to_string()))?;

    let role = headers
        .get("x-user-role")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ShopError::Forbidden("missing or invalid x-user-role header".to_string()))?;
    let role = Role::parse(role)?;

    Ok(Actor::new(user_id, role))
}

// ---------------------------------------------------------------------------
// Health / status
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

pub(crate) async fn status_handler(
    State(st): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let db = bursar_db::status(&st.pool)
        .await
        .map_err(|e| ShopError::Upstream(format!("db status: {e}")))?;
    Ok((
        StatusCode::OK,
        Json(StatusResponse {
            ok: db.ok,
            has_orders_table: db.has_orders_table,
        }),
    ))
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

pub(crate) async fn get_cart(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<CartResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let cart = bursar_db::cart::get_or_create(&st.pool, actor.user_id).await?;
    Ok(Json(cart.into()))
}

pub(crate) async fn add_cart_item(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let cart =
        bursar_db::cart::add_item(&st.pool, actor.user_id, req.product_id, req.quantity).await?;
    Ok(Json(cart.into()))
}

pub(crate) async fn set_cart_item_quantity(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(product_id): Path<i64>,
    Json(req): Json<SetQuantityRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let cart =
        bursar_db::cart::set_item_quantity(&st.pool, actor.user_id, product_id, req.quantity)
            .await?;
    Ok(Json(cart.into()))
}

pub(crate) async fn remove_cart_item(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(product_id): Path<i64>,
) -> Result<Json<CartResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let cart = bursar_db::cart::remove_item(&st.pool, actor.user_id, product_id).await?;
    Ok(Json(cart.into()))
}

pub(crate) async fn clear_cart(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<CartResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let cart = bursar_db::cart::clear(&st.pool, actor.user_id).await?;
    Ok(Json(cart.into()))
}

// ---------------------------------------------------------------------------
// Checkout + payment handoff
// ---------------------------------------------------------------------------

/// Open a gateway session for an order and record the payment row.
async fn open_payment_session(
    st: &AppState,
    order: &OrderRow,
) -> Result<PaymentSession, ShopError> {
    let gw = st
        .gateway
        .initiate(order.order_id, &order.order_number, order.total_amount_cents)
        .await?;

    let payment = bursar_db::payments::insert_payment(
        &st.pool,
        Uuid::new_v4(),
        order.order_id,
        &gw.gateway_order_id,
        order.total_amount_cents,
    )
    .await?;

    Ok(PaymentSession {
        gateway_order_id: gw.gateway_order_id,
        gateway_key: gw.gateway_key,
        amount_cents: order.total_amount_cents.raw(),
        payment_id: payment.payment_id,
    })
}

pub(crate) async fn checkout(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = actor_from_headers(&headers)?;

    let order =
        bursar_db::checkout::checkout(&st.pool, actor, req.student_id, req.delivery_notes).await?;
    info!(
        order_number = %order.order_number,
        total_cents = order.total_amount_cents.raw(),
        "checkout committed"
    );

    // The order is durable at this point; a gateway failure is surfaced but
    // leaves it pending_payment for a later retry.
    let (payment_session, payment_error) = match open_payment_session(&st, &order).await {
        Ok(session) => (Some(session), None),
        Err(e) => {
            warn!(order_number = %order.order_number, error = %e, "payment initiation failed");
            (None, Some(e.to_string()))
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order: OrderDto::from(order),
            payment_session,
            payment_error,
        }),
    ))
}

/// Retry payment initiation for an order still awaiting payment.
pub(crate) async fn retry_payment(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> Result<Json<PaymentSession>, ApiError> {
    let actor = actor_from_headers(&headers)?;

    let order = bursar_db::orders::fetch_order(&st.pool, order_id, actor).await?;
    if order.status != OrderStatus::PendingPayment {
        return Err(ShopError::InvalidState(format!(
            "cannot initiate payment for a {} order",
            order.status.as_str()
        ))
        .into());
    }

    let session = open_payment_session(&st, &order).await?;
    Ok(Json(session))
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

pub(crate) async fn list_orders(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderDto>>, ApiError> {
    let actor = actor_from_headers(&headers)?;

    let status = match q.status.as_deref() {
        Some(s) => Some(
            OrderStatus::parse(s).map_err(|e| ShopError::InvalidState(e.to_string()))?,
        ),
        None => None,
    };
    let filter = OrderFilter {
        status,
        student_id: q.student_id,
        limit: q.limit,
    };

    let orders = bursar_db::orders::list_orders(&st.pool, actor, &filter).await?;
    Ok(Json(orders.into_iter().map(OrderDto::from).collect()))
}

pub(crate) async fn get_order(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderDetailResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;

    let order = bursar_db::orders::fetch_order(&st.pool, order_id, actor).await?;
    let items = bursar_db::orders::fetch_order_items(&st.pool, order_id).await?;

    Ok(Json(OrderDetailResponse {
        order: OrderDto::from(order),
        items: items.into_iter().map(Into::into).collect(),
    }))
}

pub(crate) async fn cancel_order(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
    Json(req): Json<CancelOrderRequest>,
) -> Result<Json<CancelOrderResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;

    let (order, captured) =
        bursar_db::orders::cancel_order(&st.pool, order_id, actor, req.reason).await?;
    info!(order_number = %order.order_number, "order cancelled, stock restored");

    // The cancellation is committed; whatever happens to the refund below
    // is reported but never undoes it.
    let mut refund = None;
    let mut refund_error = None;
    if req.refund_requested {
        if let Some(payment) = captured {
            match &payment.gateway_order_id {
                Some(gw_id) => {
                    match st.gateway.refund(gw_id, payment.amount_cents).await {
                        Ok(outcome) => {
                            let new_status = match &outcome {
                                RefundOutcome::Refunded { .. } => PaymentStatus::Refunded,
                                RefundOutcome::Failed { reason } => {
                                    warn!(
                                        order_number = %order.order_number,
                                        reason = %reason,
                                        "refund failed; cancellation stands"
                                    );
                                    PaymentStatus::RefundFailed
                                }
                            };
                            bursar_db::payments::set_payment_status(
                                &st.pool,
                                payment.payment_id,
                                new_status,
                            )
                            .await?;
                            refund = Some(outcome);
                        }
                        Err(e) => {
                            warn!(
                                order_number = %order.order_number,
                                error = %e,
                                "refund unreachable; cancellation stands"
                            );
                            bursar_db::payments::set_payment_status(
                                &st.pool,
                                payment.payment_id,
                                PaymentStatus::RefundFailed,
                            )
                            .await?;
                            refund_error = Some(e.to_string());
                        }
                    }
                }
                None => {
                    refund_error = Some("no gateway order recorded for this payment".to_string());
                }
            }
        }
    }

    Ok(Json(CancelOrderResponse {
        order: OrderDto::from(order),
        refund,
        refund_error,
    }))
}

pub(crate) async fn update_order_status(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderDto>, ApiError> {
    let actor = actor_from_headers(&headers)?;

    let order = bursar_db::orders::update_status(&st.pool, order_id, actor, req.status).await?;
    info!(
        order_number = %order.order_number,
        status = order.status.as_str(),
        "order status updated"
    );
    Ok(Json(OrderDto::from(order)))
}

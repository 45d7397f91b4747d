//! Payment gateway handoff.
//!
//! The store engine never talks to card networks; it opens a gateway
//! session for an order and hands the descriptor to the client, which
//! completes payment directly with the gateway. Capture confirmation
//! arrives out-of-band (webhooks, outside this engine). The only other
//! call is the refund path driven by order cancellation.
//!
//! Two adapters:
//! - [`PaperGateway`] — deterministic in-process adapter for development
//!   and tests: stable derived ids, no randomness, no network.
//! - [`HttpGateway`] — JSON-over-HTTP adapter for a real gateway,
//!   configured from environment variables.

use async_trait::async_trait;
use bursar_schemas::{Cents, RefundOutcome, ShopError};
use uuid::Uuid;

pub mod http;
pub mod paper;

pub use http::HttpGateway;
pub use paper::PaperGateway;

/// A gateway-side order opened for one of ours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrder {
    /// Order id on the gateway side.
    pub gateway_order_id: String,
    /// Public key/id the client needs to open the gateway's payment UI.
    pub gateway_key: String,
}

/// The handoff contract. Implementations must not assume they are called
/// at most once per order: payment initiation is retryable while an order
/// sits in `pending_payment`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a gateway session for `amount` against the given order.
    async fn initiate(
        &self,
        order_id: Uuid,
        order_number: &str,
        amount: Cents,
    ) -> Result<GatewayOrder, ShopError>;

    /// Refund a captured payment. A `RefundOutcome::Failed` is a reported
    /// business outcome, not a transport error; transport failures use
    /// `ShopError::Upstream`.
    async fn refund(
        &self,
        gateway_order_id: &str,
        amount: Cents,
    ) -> Result<RefundOutcome, ShopError>;
}

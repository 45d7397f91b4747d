//! Deterministic in-process "paper" payment gateway.
//!
//! Design decisions (kept intentionally simple/deterministic):
//! - `gateway_order_id` is exactly `"paper:pay:{order_number}"`.
//! - refund ids derive from the gateway order id.
//! - No randomness. No network. No timestamps.
//!
//! `failing_refunds()` builds an instance whose refund path always reports
//! failure, so cancellation tests can prove that a failed refund never
//! rolls back the cancellation itself.

use async_trait::async_trait;
use bursar_schemas::{Cents, RefundOutcome, ShopError};
use uuid::Uuid;

use crate::{GatewayOrder, PaymentGateway};

#[derive(Debug, Clone, Default)]
pub struct PaperGateway {
    fail_refunds: bool,
}

impl PaperGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// An instance whose refunds always fail (for cancellation tests).
    pub fn failing_refunds() -> Self {
        Self { fail_refunds: true }
    }
}

#[async_trait]
impl PaymentGateway for PaperGateway {
    async fn initiate(
        &self,
        _order_id: Uuid,
        order_number: &str,
        _amount: Cents,
    ) -> Result<GatewayOrder, ShopError> {
        Ok(GatewayOrder {
            gateway_order_id: format!("paper:pay:{order_number}"),
            gateway_key: "paper-key".to_string(),
        })
    }

    async fn refund(
        &self,
        gateway_order_id: &str,
        _amount: Cents,
    ) -> Result<RefundOutcome, ShopError> {
        if self.fail_refunds {
            return Ok(RefundOutcome::Failed {
                reason: "paper gateway configured to fail refunds".to_string(),
            });
        }
        Ok(RefundOutcome::Refunded {
            gateway_refund_id: format!("paper:refund:{gateway_order_id}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn initiate_is_deterministic() {
        let gw = PaperGateway::new();
        let a = gw
            .initiate(Uuid::new_v4(), "SO-20260831-abcd1234", Cents::new(2500))
            .await
            .unwrap();
        let b = gw
            .initiate(Uuid::new_v4(), "SO-20260831-abcd1234", Cents::new(2500))
            .await
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.gateway_order_id, "paper:pay:SO-20260831-abcd1234");
    }

    #[tokio::test]
    async fn refund_derives_id_from_gateway_order() {
        let gw = PaperGateway::new();
        match gw.refund("paper:pay:SO-1", Cents::new(100)).await.unwrap() {
            RefundOutcome::Refunded { gateway_refund_id } => {
                assert_eq!(gateway_refund_id, "paper:refund:paper:pay:SO-1")
            }
            RefundOutcome::Failed { .. } => panic!("paper refunds succeed by default"),
        }
    }

    #[tokio::test]
    async fn failing_instance_reports_failure_without_erroring() {
        let gw = PaperGateway::failing_refunds();
        let outcome = gw.refund("paper:pay:SO-1", Cents::new(100)).await.unwrap();
        assert!(matches!(outcome, RefundOutcome::Failed { .. }));
    }
}

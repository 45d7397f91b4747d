//! JSON-over-HTTP gateway adapter.
//!
//! Speaks the common "create order, then refund by order id" shape that
//! hosted gateways expose. Endpoint and credentials come from env:
//! `BURSAR_GATEWAY_URL`, `BURSAR_GATEWAY_KEY`, `BURSAR_GATEWAY_SECRET`.
//! All transport and non-2xx failures surface as `ShopError::Upstream` —
//! the caller decides what that means for the order (nothing: it stays
//! `pending_payment` and initiation can be retried).

use anyhow::{Context, Result};
use async_trait::async_trait;
use bursar_schemas::{Cents, RefundOutcome, ShopError};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{GatewayOrder, PaymentGateway};

pub const ENV_GATEWAY_URL: &str = "BURSAR_GATEWAY_URL";
pub const ENV_GATEWAY_KEY: &str = "BURSAR_GATEWAY_KEY";
pub const ENV_GATEWAY_SECRET: &str = "BURSAR_GATEWAY_SECRET";

#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

#[derive(Debug, Deserialize)]
struct GatewayOrderResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GatewayRefundResponse {
    id: String,
    status: String,
}

impl HttpGateway {
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var(ENV_GATEWAY_URL)
            .with_context(|| format!("missing env var {ENV_GATEWAY_URL}"))?;
        let key_id = std::env::var(ENV_GATEWAY_KEY)
            .with_context(|| format!("missing env var {ENV_GATEWAY_KEY}"))?;
        let key_secret = std::env::var(ENV_GATEWAY_SECRET)
            .with_context(|| format!("missing env var {ENV_GATEWAY_SECRET}"))?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id,
            key_secret,
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn initiate(
        &self,
        order_id: Uuid,
        order_number: &str,
        amount: Cents,
    ) -> Result<GatewayOrder, ShopError> {
        let resp = self
            .client
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&json!({
                "receipt": order_number,
                "notes": { "order_id": order_id },
                "amount": amount.raw(),
                "currency": "INR",
            }))
            .send()
            .await
            .map_err(|e| ShopError::Upstream(format!("gateway order create: {e}")))?;

        if !resp.status().is_success() {
            return Err(ShopError::Upstream(format!(
                "gateway order create returned {}",
                resp.status()
            )));
        }

        let body: GatewayOrderResponse = resp
            .json()
            .await
            .map_err(|e| ShopError::Upstream(format!("gateway order decode: {e}")))?;

        Ok(GatewayOrder {
            gateway_order_id: body.id,
            gateway_key: self.key_id.clone(),
        })
    }

    async fn refund(
        &self,
        gateway_order_id: &str,
        amount: Cents,
    ) -> Result<RefundOutcome, ShopError> {
        let resp = self
            .client
            .post(format!(
                "{}/v1/orders/{gateway_order_id}/refund",
                self.base_url
            ))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&json!({ "amount": amount.raw() }))
            .send()
            .await
            .map_err(|e| ShopError::Upstream(format!("gateway refund: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            // A refused refund is a reported outcome, not a transport error.
            return Ok(RefundOutcome::Failed {
                reason: format!("gateway refund returned {status}"),
            });
        }

        let body: GatewayRefundResponse = resp
            .json()
            .await
            .map_err(|e| ShopError::Upstream(format!("gateway refund decode: {e}")))?;

        if body.status == "processed" || body.status == "pending" {
            Ok(RefundOutcome::Refunded {
                gateway_refund_id: body.id,
            })
        } else {
            Ok(RefundOutcome::Failed {
                reason: format!("gateway refund status {}", body.status),
            })
        }
    }
}

//! Shared plain types for the bursar store engine.
//!
//! Everything here is serde-serializable and free of I/O so that every other
//! crate (db layer, payment adapters, daemon) can depend on it without
//! dragging in runtime machinery.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod error;
pub mod money;

pub use error::ShopError;
pub use money::Cents;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Role of the acting user, as supplied by the (external) session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Parent,
    Teacher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Parent => "parent",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ShopError> {
        match s {
            "student" => Ok(Role::Student),
            "parent" => Ok(Role::Parent),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            other => Err(ShopError::Forbidden(format!("unknown role: {other}"))),
        }
    }
}

/// The acting user for an operation: id plus role.
///
/// Authentication and session issuance happen outside this engine; the
/// daemon extracts these two values from request headers and the db layer
/// uses them for ownership and admin checks only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// ---------------------------------------------------------------------------
// Payment handoff DTOs
// ---------------------------------------------------------------------------

/// Gateway session descriptor returned by `PaymentGateway::initiate` and
/// handed to the client, which completes payment directly with the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSession {
    /// Order id on the gateway side.
    pub gateway_order_id: String,
    /// Public key/id the client needs to open the gateway's payment UI.
    pub gateway_key: String,
    /// Amount the session was opened for, in cents.
    pub amount_cents: i64,
    /// Our internal payment record id.
    pub payment_id: Uuid,
}

/// Result of a refund attempt against the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefundOutcome {
    Refunded { gateway_refund_id: String },
    Failed { reason: String },
}

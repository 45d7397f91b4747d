//! Order lifecycle state machine.
//!
//! # Design
//!
//! One closed enumeration of order statuses and ONE central transition
//! table, [`validate_transition`]. Every status change in the system —
//! admin forward moves and cancellations alike — goes through this table;
//! no endpoint compares status strings on its own.
//!
//! 1. **Legal transitions only.** Illegal moves return
//!    [`TransitionError`], which the db layer surfaces as an
//!    invalid-state failure naming both statuses.
//! 2. **Terminal states are terminal.** Nothing leaves `Delivered` or
//!    `Cancelled`.
//!
//! # State diagram
//!
//! ```text
//!   create
//!   ──────► PendingPayment ──► Processing ──► Shipped ──► Delivered (term.)
//!                │                 │
//!                └────── cancel ───┴──────► Cancelled (term., restores stock)
//! ```
//!
//! Cancellation is reachable only from `PendingPayment` and `Processing`;
//! once goods have shipped the order can no longer be cancelled.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

/// All valid statuses an order can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order created, stock committed, payment not yet captured.
    PendingPayment,
    /// Payment captured; order is being prepared.
    Processing,
    /// Goods handed to delivery. Cancellation is no longer possible.
    Shipped,
    /// Goods received. **Terminal.**
    Delivered,
    /// Order cancelled; stock was restored. **Terminal.**
    Cancelled,
}

impl OrderStatus {
    /// Stable string form, matching the DB `status` column values.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Result<Self, UnknownStatus> {
        match s {
            "pending_payment" => Ok(OrderStatus::PendingPayment),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }

    /// Returns `true` if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns `true` if a cancellation may start from this status.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatus::PendingPayment | OrderStatus::Processing)
    }

    /// The single legal forward successor, if any. Cancellation is not a
    /// forward move and is excluded here.
    pub fn forward_successor(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::PendingPayment => Some(OrderStatus::Processing),
            OrderStatus::Processing => Some(OrderStatus::Shipped),
            OrderStatus::Shipped => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled => None,
        }
    }
}

// ---------------------------------------------------------------------------
// TransitionError
// ---------------------------------------------------------------------------

/// Returned when a status move is not in the transition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.to == OrderStatus::Cancelled {
            write!(f, "cannot cancel a {} order", self.from.as_str())
        } else {
            write!(
                f,
                "cannot move a {} order to {}",
                self.from.as_str(),
                self.to.as_str()
            )
        }
    }
}

impl std::error::Error for TransitionError {}

/// A status string that is not in the closed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl std::fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown order status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Validate a status move against the central table.
///
/// Legal moves:
/// - `pending_payment → processing → shipped → delivered`
/// - `pending_payment → cancelled`, `processing → cancelled`
///
/// Everything else — backward moves, skips, anything out of a terminal
/// status, self-transitions — is a [`TransitionError`].
pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), TransitionError> {
    let legal = match to {
        OrderStatus::Cancelled => from.is_cancellable(),
        _ => from.forward_successor() == Some(to),
    };
    if legal {
        Ok(())
    } else {
        Err(TransitionError { from, to })
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

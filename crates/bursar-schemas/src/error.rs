//! Domain error taxonomy for the store engine.
//!
//! Every validation failure a client can act on gets its own variant with an
//! actionable message ("only N left in stock", "cannot cancel a shipped
//! order"). Infrastructure plumbing (pool setup, migrations) stays on
//! `anyhow` in the crates that own it; this enum is for the commerce
//! operations themselves.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShopError {
    /// Cart item / order / product absent, or invisible to the actor.
    #[error("not found: {0}")]
    NotFound(String),

    /// Actor lacks ownership of the record or the required role.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Inactive product, illegal status transition, terminal-order mutation.
    #[error("{0}")]
    InvalidState(String),

    /// Requested quantity exceeds the current stock of a product.
    #[error("insufficient stock for {product}: requested {requested}, only {available} left in stock")]
    InsufficientStock {
        product: String,
        requested: i32,
        available: i32,
    },

    /// Checkout attempted with no items in the cart.
    #[error("cart is empty")]
    EmptyCart,

    /// Payment gateway unreachable or erroring.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// Transport-level database failure.
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl ShopError {
    /// Stable machine-readable kind tag, surfaced in API error bodies so
    /// clients can branch without parsing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ShopError::NotFound(_) => "not_found",
            ShopError::Forbidden(_) => "forbidden",
            ShopError::InvalidState(_) => "invalid_state",
            ShopError::InsufficientStock { .. } => "insufficient_stock",
            ShopError::EmptyCart => "empty_cart",
            ShopError::Upstream(_) => "upstream_failure",
            ShopError::Db(_) => "internal",
        }
    }
}

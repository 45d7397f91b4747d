//! Shared runtime state for bursar-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum; this module owns
//! nothing async itself.

use std::sync::Arc;

use bursar_payments::PaymentGateway;
use sqlx::PgPool;

/// Static build metadata included in health responses.
#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Postgres pool; every commerce operation goes through bursar-db.
    pub pool: PgPool,
    /// Payment handoff adapter (paper in dev, HTTP in production).
    pub gateway: Arc<dyn PaymentGateway>,
    pub build: BuildInfo,
}

impl AppState {
    pub fn new(pool: PgPool, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            pool,
            gateway,
            build: BuildInfo {
                service: "bursar-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }
}

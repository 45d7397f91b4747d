//! bursar-daemon entry point.
//!
//! This file is intentionally thin: it sets up tracing, connects the pool,
//! picks the payment gateway adapter, wires middleware, and starts the HTTP
//! server. All route handlers live in `routes.rs`; all shared state types
//! live in `state.rs`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::HeaderValue;
use bursar_daemon::{routes, state};
use bursar_payments::{HttpGateway, PaperGateway, PaymentGateway};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file does
    // not exist — production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let pool = bursar_db::connect_from_env().await?;
    bursar_db::migrate(&pool).await?;

    let gateway: Arc<dyn PaymentGateway> =
        if std::env::var(bursar_payments::http::ENV_GATEWAY_URL).is_ok() {
            info!("payment gateway: http");
            Arc::new(HttpGateway::from_env()?)
        } else {
            info!("payment gateway: paper (no {} set)", bursar_payments::http::ENV_GATEWAY_URL);
            Arc::new(PaperGateway::new())
        };

    let shared = Arc::new(state::AppState::new(pool, gateway));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr_from_env().unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8910)));
    info!("bursar-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("BURSAR_DAEMON_ADDR").ok()?.parse().ok()
}

/// CORS: allow only localhost origins (the school-admin web UI in dev).
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Spam Shield Service
//!
//! Multi-layer bot and spam protection for form submissions.
//!
//! ## Usage
//!
//! The service provides two modes of operation:
//!
//! 1. **External check**: the application calls `/check` with parsed
//!    inputs and renders the verdict itself.
//!
//! 2. **Direct submit**: forms post to `/submit/<action>`; blocked requests
//!    get a redirect with a flash cookie, or a JSON error for ajax.
//!
//! Pages should call `/probe` once so browsers pick up the probe cookie.
//!
//! ## Configuration
//!
//! Service settings come from environment variables:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `SPAMSHIELD_STORE_PATH`: JSON-lines event log (default: in memory)
//! - `SPAMSHIELD_METRICS`: `no` disables `/metrics` (default: enabled)
//!
//! Evaluation settings are re-read on every request:
//!
//! - `SPAMSHIELD_ENABLED`: `yes` to enable (default: yes)
//! - `SPAMSHIELD_MIN_SUBMIT_TIME`: seconds (default: 1)
//! - `SPAMSHIELD_RATE_LIMIT_WINDOW`: seconds (default: 10)
//! - `SPAMSHIELD_SAMESITE`: Strict, Lax or None (default: Lax)
//! - `SPAMSHIELD_COUNT_FAILURE_MODE`: open or closed (default: open)

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use spamshield::{
    config::{Config, EnvSettings, ShieldConfig},
    handlers::{router, AppState},
    metrics::ShieldMetrics,
    store::EventLog,
    validator::ShieldValidator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = load_config();
    let settings = Arc::new(EnvSettings);
    let shield = ShieldConfig::load(settings.as_ref());
    info!(
        bind_addr = %config.bind_addr,
        store = ?config.store.path,
        enabled = shield.enabled,
        min_submit_seconds = shield.min_submit_seconds,
        rate_limit_window_seconds = shield.rate_limit_window_seconds,
        "Starting spam shield"
    );

    // Create application state
    let store = Arc::new(EventLog::open(config.store.path.as_deref()).await?);
    let metrics = ShieldMetrics::new()?;
    let validator = ShieldValidator::new(store).with_metrics(metrics.clone());

    let state = Arc::new(AppState {
        validator,
        settings,
        metrics,
        config: config.clone(),
    });

    let app = router(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Load configuration from environment variables.
fn load_config() -> Config {
    let mut config = Config {
        bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        ..Default::default()
    };
    config.store.path = std::env::var("SPAMSHIELD_STORE_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty());
    config.metrics.enabled = std::env::var("SPAMSHIELD_METRICS")
        .map(|v| v.trim() != "no")
        .unwrap_or(true);
    config
}

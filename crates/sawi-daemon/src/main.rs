//! sawi-daemon entry point.
//!
//! Thin on purpose: loads config, sets up tracing, starts the telemetry
//! session and the push feed, wires middleware, and serves HTTP. Route
//! handlers live in `routes.rs`; shared state types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use sawi_config::{load_layered_yaml, SawiConfig};
use sawi_daemon::{feed, routes, session::Session, state};
use sawi_snapshot::HttpSnapshotLoader;
use sawi_telemetry::{PushFrame, ReconcilerConfig};
use tokio::sync::mpsc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience). Silent if missing.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cfg = load_config()?;

    let bus = state::new_bus();
    let (feed_tx, feed_rx) = mpsc::channel::<PushFrame>(cfg.push.queue_depth);

    let loader = Arc::new(HttpSnapshotLoader::new_with_path(
        cfg.snapshot.base_url.clone(),
        cfg.snapshot.path.clone(),
        Duration::from_millis(cfg.snapshot.timeout_ms),
    ));
    let session = Session::start(
        ReconcilerConfig::with_cap(cfg.series.cap),
        loader,
        feed_rx,
        bus.clone(),
    );

    let ws_feed = cfg.push.ws_url.clone().map(|url| {
        feed::spawn_ws_feed(
            url,
            Duration::from_millis(cfg.push.reconnect_ms),
            feed_tx.clone(),
        )
    });
    if ws_feed.is_none() {
        info!("no push.ws_url configured; accepting pushes on POST /v1/readings only");
    }

    let shared = Arc::new(state::AppState::new(bus.clone(), session.telemetry(), feed_tx));

    state::spawn_heartbeat(bus, Duration::from_secs(cfg.daemon.heartbeat_secs));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = match bind_addr_from_env() {
        Some(addr) => addr,
        None => cfg
            .daemon
            .bind_addr
            .parse()
            .with_context(|| format!("invalid daemon.bind_addr: {}", cfg.daemon.bind_addr))?,
    };
    info!("sawi-daemon listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    if let Some(handle) = ws_feed {
        handle.abort();
    }
    session.shutdown();
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Layer paths come from `SAWI_CONFIG` (comma-separated, base first).
/// Without it the built-in defaults apply.
fn load_config() -> anyhow::Result<SawiConfig> {
    let Ok(raw) = std::env::var("SAWI_CONFIG") else {
        info!("SAWI_CONFIG not set; using default config");
        return Ok(SawiConfig::default());
    };

    let paths: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let loaded = load_layered_yaml(&paths).context("config load failed")?;
    let cfg = SawiConfig::from_loaded(&loaded)?;
    info!(config_hash = %loaded.config_hash, layers = paths.len(), "config loaded");
    Ok(cfg)
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("SAWI_DAEMON_ADDR").ok()?.parse().ok()
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

/// CORS: allow only localhost origins.
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
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}

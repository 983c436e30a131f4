//! parley-server – entry point.
//!
//! Startup order:
//! 1. Load `.env` (if present) and parse configuration from the environment.
//! 2. Initialise tracing (stdout, optionally JSON and a rolling file).
//! 3. Open the database and create missing tables.
//! 4. Build the generation pipeline.
//! 5. Build the Axum router and serve with graceful shutdown.

mod config;
mod error;
mod extract;
mod logging;
mod middleware;
mod routes;
mod schemas;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use parley_core::Database;
use tracing::{info, warn};

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    match dotenvy::dotenv() {
        Err(e) if !e.not_found() => eprintln!("WARN: failed to load .env: {e}"),
        _ => {}
    }
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let _log_guard = logging::init(&cfg);
    info!(version = env!("CARGO_PKG_VERSION"), "parley-server starting");

    // ── 3. Database ────────────────────────────────────────────────────────────
    let store = Database::from_env();
    store
        .ensure_schema()
        .await
        .context("failed to prepare database")?;
    info!(backend = ?store.backend(), "database ready");

    // ── 4. Generation pipeline ─────────────────────────────────────────────────
    if cfg.model_api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; model calls will likely be rejected");
    }
    let generator = state::build_generator(&cfg).context("failed to build generation pipeline")?;
    info!(
        model = %cfg.model,
        trim_history = cfg.trim_history,
        token_budget = cfg.token_budget,
        "generation pipeline ready"
    );

    // ── 5. HTTP server with graceful shutdown ──────────────────────────────────
    let state = Arc::new(AppState {
        config: Arc::new(cfg.clone()),
        store: Arc::new(store),
        generator,
    });

    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg
        .bind_address
        .parse()
        .with_context(|| format!("invalid PARLEY_BIND '{}'", cfg.bind_address))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.store.close().await;
    info!("parley-server stopped");
    Ok(())
}

/// Resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}

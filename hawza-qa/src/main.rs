//! # hawza-qa
//!
//! Question submission and answer archive service.
//!
//! Visitors submit questions; an administrator logs in, answers, edits or deletes
//! them; anyone can list the answered archive.
//!
//! ## Architecture
//!
//! - **Store**: key-value adapter over a remote blob service (JSON values, optional TTL)
//! - **Questions**: the whole archive as one JSON document, rewritten on every change
//! - **Sessions**: admin login sessions kept in the same store, keyed by a signed cookie
//! - **HTTP**: Axum router with per-address login rate limiting, request IDs, and graceful shutdown

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

mod auth;
mod config;
mod http;
mod questions;
mod session;
mod store;

use std::net::SocketAddr;

use anyhow::Context;
use axum::serve;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, Cli, StoreConfig};
use crate::http::{router, AppState};
use crate::store::KvStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging().context("failed to initialize logging")?;

    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli).context("failed to load configuration")?;
    info!(
        bind = %config.bind,
        base_path = %config.base_path,
        store_backend = config.store.backend_name(),
        session_ttl = %humantime::format_duration(config.session.ttl),
        cookie_secure = config.session.cookie_secure,
        same_site = ?config.session.same_site,
        login_max_attempts = config.login_limit.max_attempts,
        login_window = %humantime::format_duration(config.login_limit.window),
        trust_proxy = config.login_limit.trust_proxy,
        cors_origins = config.cors_origins.len(),
        "configuration loaded"
    );

    let store = KvStore::from_config(&config.store).context("failed to initialize blob store")?;
    match &config.store {
        StoreConfig::Remote(remote) => info!(
            url = %remote.url,
            namespace = %remote.namespace,
            "using remote blob store"
        ),
        StoreConfig::Memory => warn!("using in-memory store; data is lost on restart"),
    }

    let state = AppState::new(&config, store);
    info!(
        username_required = state.credentials.requires_username(),
        "admin credentials loaded"
    );
    let app = router(state);
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    let shutdown = tokio::signal::ctrl_c();
    info!(bind = %config.bind, "hawza-qa listening");

    serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = shutdown.await;
        info!("shutting down gracefully");
    })
    .await
    .context("server exited with error")
}

/// Initialize tracing subscriber with `RUST_LOG` env filter (default: `info`).
fn init_logging() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}

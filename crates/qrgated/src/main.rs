//! qrgated: the qrgate daemon.
//!
//! Single binary that assembles the relay:
//! - Session store with the SVG renderer
//! - REST API + pairing page
//! - Optional keep-alive pinger
//!
//! # Usage
//!
//! ```text
//! qrgated serve --port 8080 --keepalive-url http://my-app.example.com/healthz
//! ```

mod cli;
mod config;

use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use qrgate_keepalive::KeepAlive;
use qrgate_render::SvgQrRenderer;
use qrgate_session::SessionStore;

use cli::{Cli, Command, ServeArgs};
use config::ServiceConfig;

const DEFAULT_LOG_FILTER: &str = "info,qrgated=debug,qrgate=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Serve(args) => run_serve(args).await,
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    info!("qrgate daemon starting");

    let file_config = match &args.config {
        Some(path) => {
            let config = ServiceConfig::from_file(path)?;
            info!(path = %path.display(), "config file loaded");
            config
        }
        None => ServiceConfig::default(),
    };
    let resolved = file_config.merge_cli(&args);

    // ── Initialize subsystems ──────────────────────────────────

    let renderer = Arc::new(SvgQrRenderer::new(resolved.svg.clone()));
    let store = SessionStore::with_options(renderer, resolved.store);
    info!(
        freshness_secs = resolved.store.freshness_window.as_secs(),
        render_timeout_ms = resolved.store.render_timeout.as_millis() as u64,
        "session store initialized"
    );

    let keepalive = match &resolved.keepalive {
        Some(settings) => Some(KeepAlive::new(
            &settings.url,
            settings.interval,
            settings.timeout,
        )?),
        None => {
            info!("keep-alive disabled");
            None
        }
    };

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let keepalive_handle = keepalive.map(|pinger| tokio::spawn(pinger.run(shutdown_rx)));

    // ── Start HTTP server ──────────────────────────────────────

    let router = qrgate_api::build_router(store);
    let addr = resolved.addr;

    info!(%addr, "HTTP server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    if let Some(handle) = keepalive_handle {
        if let Err(e) = handle.await {
            error!(error = %e, "keep-alive task failed");
        }
    }

    info!("qrgate daemon stopped");
    Ok(())
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

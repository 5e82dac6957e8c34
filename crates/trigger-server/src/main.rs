//! trigger-server entry point.
//!
//! Loads settings and service metadata, binds the demo use-case catalog to the
//! declared HTTP and WebSocket triggers, and serves them until Ctrl+C.
//!
//! # Usage
//!
//! ```text
//! trigger-server [OPTIONS]
//!
//! Options:
//!   --config <PATH>        Settings file [default: trigger-server.toml]
//!   --metadata <PATH>      Service metadata file (overrides [metadata] path)
//!   --bind <ADDR>          Listen address (overrides [server] bind_address)
//!   --http-port <PORT>     HTTP port (overrides [server] http_port)
//!   --ws-port <PORT>       WebSocket port (overrides [websocket] port)
//!   --enable-websocket     Serve WebSocket triggers
//!   --enable-cors          Apply the CORS policy to HTTP routes
//!   --check                Validate settings, metadata and bindings, then exit
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                  | Flag                 |
//! |---------------------------|----------------------|
//! | `TRIGGER_CONFIG`          | `--config`           |
//! | `TRIGGER_METADATA`        | `--metadata`         |
//! | `TRIGGER_BIND`            | `--bind`             |
//! | `TRIGGER_HTTP_PORT`       | `--http-port`        |
//! | `TRIGGER_WS_PORT`         | `--ws-port`          |
//!
//! `RUST_LOG` takes precedence over `[logging] level`.
//!
//! # Startup order
//!
//! Every binding is registered and checked for conflicts *before* any
//! listener is bound, so a bad metadata file never leaves a half-served port.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use trigger_core::bind;
use trigger_server::application::demo_catalog;
use trigger_server::domain::ServerSettings;
use trigger_server::infrastructure::{
    bind_service, load_metadata, load_settings, run_server, serve_http,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Serves metadata-declared use cases over HTTP and WebSocket.
#[derive(Debug, Parser)]
#[command(
    name = "trigger-server",
    about = "Binds use cases to HTTP routes and WebSocket events from service metadata",
    version
)]
struct Cli {
    /// Settings file.  A missing file means defaults.
    #[arg(long, default_value = "trigger-server.toml", env = "TRIGGER_CONFIG")]
    config: PathBuf,

    /// Service metadata file (`.toml` or `.json`).
    #[arg(long, env = "TRIGGER_METADATA")]
    metadata: Option<PathBuf>,

    /// IP address both listeners bind to.
    #[arg(long, env = "TRIGGER_BIND")]
    bind: Option<String>,

    /// HTTP listener port.
    #[arg(long, env = "TRIGGER_HTTP_PORT")]
    http_port: Option<u16>,

    /// WebSocket listener port.
    #[arg(long, env = "TRIGGER_WS_PORT")]
    ws_port: Option<u16>,

    /// Serve WebSocket triggers even if the settings file disables them.
    #[arg(long)]
    enable_websocket: bool,

    /// Apply CORS even if the settings file disables it.
    #[arg(long)]
    enable_cors: bool,

    /// Validate everything and exit without listening.
    #[arg(long)]
    check: bool,
}

impl Cli {
    /// Applies command-line overrides on top of file settings.
    fn apply(&self, settings: &mut ServerSettings) {
        if let Some(path) = &self.metadata {
            settings.metadata.path = path.clone();
        }
        if let Some(bind) = &self.bind {
            settings.server.bind_address = bind.clone();
        }
        if let Some(port) = self.http_port {
            settings.server.http_port = port;
        }
        if let Some(port) = self.ws_port {
            settings.websocket.port = port;
        }
        if self.enable_websocket {
            settings.websocket.enabled = true;
        }
        if self.enable_cors {
            settings.cors.enabled = true;
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = load_settings(&cli.config)?;
    cli.apply(&mut settings);

    // ── Logging setup ─────────────────────────────────────────────────────────
    //
    // `RUST_LOG` wins; otherwise the configured level; `info` if that is not a
    // valid filter either.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // ── Bind metadata to implementations ──────────────────────────────────────
    let metadata = load_metadata(&settings.metadata.path)?;
    let descriptors = bind(&metadata, &demo_catalog())
        .with_context(|| format!("service '{}' has malformed triggers", metadata.name))?;
    let cors = settings.cors_policy()?;
    let service = bind_service(&descriptors, cors)
        .with_context(|| format!("service '{}' could not be bound", metadata.name))?;

    info!(
        service = %metadata.name,
        use_cases = service.summary.use_cases,
        http_routes = service.summary.http_routes,
        socket_events = service.summary.socket_events,
        "bindings ready"
    );

    if cli.check {
        println!(
            "ok: {} use case(s), {} HTTP route(s), {} WebSocket event(s)",
            service.summary.use_cases, service.summary.http_routes, service.summary.socket_events
        );
        return Ok(());
    }

    // ── Listeners ─────────────────────────────────────────────────────────────
    let http_addr = settings.http_addr()?;
    let http_listener = TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {http_addr}"))?;

    let ws_listener = if settings.websocket.enabled {
        let ws_addr = settings.ws_addr()?;
        let listener = TcpListener::bind(ws_addr)
            .await
            .with_context(|| format!("failed to bind WebSocket listener on {ws_addr}"))?;
        Some(listener)
    } else {
        if !service.sockets.is_empty() {
            warn!("WebSocket triggers are declared but the WebSocket server is disabled");
        }
        None
    };

    // ── Graceful shutdown ─────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                shutdown_tx.send(true).ok();
            }
            Err(e) => tracing::error!("failed to listen for Ctrl+C signal: {e}"),
        }
        // Keep the sender alive until shutdown so receivers never see it drop early.
        shutdown_tx.closed().await;
    });

    // ── Serve ─────────────────────────────────────────────────────────────────
    let http = serve_http(http_listener, service.router, shutdown_rx.clone());
    match ws_listener {
        Some(listener) => {
            let ws = run_server(listener, service.sockets, shutdown_rx);
            tokio::try_join!(http, ws)?;
        }
        None => http.await?,
    }

    info!("trigger-server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

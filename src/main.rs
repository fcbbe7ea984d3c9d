//! Resource router binary.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ http::server (request id, timeout, body limit, trace)
//!                          │
//!                          ▼
//!                      routing::Dispatcher ── strip base path
//!                          │                  resolver: path → "VERB /key"
//!                          │                  table lookup
//!                          ▼
//!                      handler(&mut Context) ── Ok  → {"data":...,"error":null}
//!                          │                    Err → {"data":null,"error":msg}
//!                          ▼
//!                      observability::ErrorLog ── workers → stderr/stdout/file
//!
//!     Cross-cutting: config (TOML), lifecycle (shutdown), metrics (Prometheus)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use resource_router::config::{load_config, RouterConfig};
use resource_router::demo::{self, UserStore};
use resource_router::lifecycle::{self, spawn_signal_listener, Shutdown};
use resource_router::observability::{logging, metrics, ErrorLog};
use resource_router::routing::{Dispatcher, RouteTableBuilder};
use resource_router::HttpServer;

/// Serve the sample resources.
#[derive(Debug, Parser)]
#[command(name = "resource-router", version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print every handled route and exit.
    #[arg(long)]
    print_routes: bool,

    /// Prefix printed routes with the base path.
    #[arg(long, requires = "print_routes")]
    with_base_path: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };
    logging::init_tracing(&config.logging.level);

    tracing::info!("resource-router v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address,
        base_path = %config.server.base_path,
        word_separator = %config.routing.word_separator,
        request_timeout_secs = config.server.request_timeout_secs,
        "Configuration loaded"
    );

    let routes = demo::register(
        RouteTableBuilder::new()
            .separator(config.routing.word_separator.clone())
            .reject_duplicates(config.routing.reject_duplicate_routes),
        Arc::new(UserStore::default()),
    )
    .build()?;

    let error_log = ErrorLog::from_config(&config.logging)?;
    let config = Arc::new(config);
    let dispatcher = Dispatcher::new(routes, Arc::clone(&config), error_log.clone());

    if cli.print_routes {
        println!("{}", dispatcher.handled_paths(cli.with_base_path));
        return Ok(());
    }

    if config.metrics.enabled {
        match config.metrics.address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.metrics.address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(Arc::new(dispatcher));
    lifecycle::serve(server, listener, &error_log, config.logging.workers, &shutdown).await?;

    tracing::info!(dropped = error_log.dropped(), "Shutdown complete");
    Ok(())
}

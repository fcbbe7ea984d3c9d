//! Serving with ordered shutdown.
//!
//! The error log workers listen on their own channel. They are stopped only
//! after the HTTP server has drained in-flight requests, so failures raised by
//! those requests are still written.

use std::io;

use tokio::net::TcpListener;

use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::observability::ErrorLog;

/// Run `server` until `shutdown` fires, then drain the error log.
pub async fn serve(
    server: HttpServer,
    listener: TcpListener,
    error_log: &ErrorLog,
    workers: usize,
    shutdown: &Shutdown,
) -> io::Result<()> {
    let log_shutdown = Shutdown::new();
    let workers = error_log.spawn_workers(workers, &log_shutdown);

    let served = server.run(listener, shutdown.subscribe()).await;

    log_shutdown.trigger();
    for worker in workers {
        if let Err(e) = worker.await {
            tracing::warn!(error = %e, "Error log worker failed");
        }
    }
    tracing::info!(
        pending = error_log.pending(),
        dropped = error_log.dropped(),
        "Error log drained"
    );
    served
}

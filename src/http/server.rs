//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all handler
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Bind server to listener
//! - Hand every request to the dispatcher

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::RouterConfig;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::response::{render_envelope, Reply};
use crate::routing::Dispatcher;

/// Error message sent when the request body cannot be read.
pub const INVALID_BODY_MESSAGE: &str = "InvalidBody";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// HTTP server in front of the dispatcher.
pub struct HttpServer {
    router: Router,
    config: Arc<RouterConfig>,
}

impl HttpServer {
    /// Create a new HTTP server serving `dispatcher`.
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        let config = Arc::clone(dispatcher.config());
        let state = AppState { dispatcher };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RouterConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch_handler))
            .route("/", any(dispatch_handler))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.server.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            )))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            base_path = %self.config.server.base_path,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }
}

/// Catch-all handler.
/// Resolves the route, reads the body and runs the handler.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let dispatcher = state.dispatcher.as_ref();
    let (parts, body) = request.into_parts();

    let Some((route, resolved)) = dispatcher.route_for(&parts) else {
        tracing::debug!(
            method = %parts.method,
            path = %parts.uri.path(),
            "No route matched"
        );
        return dispatcher.not_found().into_response();
    };

    let config = dispatcher.config();
    let body = match axum::body::to_bytes(body, config.server.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(route = %route.key, error = %e, "Failed to read request body");
            return Reply::new(
                config.status.request_error,
                Default::default(),
                render_envelope(None, Some(INVALID_BODY_MESSAGE)),
            )
            .into_response();
        }
    };

    dispatcher.serve(route, resolved, parts, body).into_response()
}

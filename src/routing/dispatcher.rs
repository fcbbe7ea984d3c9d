//! Request dispatch.
//!
//! # Responsibilities
//! - Strip the base path and resolve the route key
//! - Build the request context and run the optional hooks
//! - Invoke the handler and render the reply
//! - Classify failures and hand them to the error log
//!
//! # Design Decisions
//! - Handlers run synchronously on the request task
//! - Panics in the before-serve hook or the handler are caught and treated as
//!   internal failures carrying the stack of the panic site
//! - The reply body is rendered before the failure is logged, so the log
//!   line carries the byte count
//! - The failure hook runs on the blocking pool with a copy of the context;
//!   the reply never waits for it

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::request::Parts;

use crate::config::RouterConfig;
use crate::error::stack::{install_panic_hook, PanicGuard};
use crate::error::{from_panic, AppError};
use crate::http::response::{render_envelope, Reply};
use crate::http::Context;
use crate::observability::error_log::ErrorLog;
use crate::observability::metrics;
use crate::routing::resolver::{resolve_path, ResolvedPath};
use crate::routing::table::{Route, Routes};

/// Derives the caller id from the request head.
pub type UserIdParser = Arc<dyn Fn(&Parts) -> i64 + Send + Sync>;
/// Runs before every matched handler.
pub type BeforeServe = Arc<dyn Fn(&mut Context) + Send + Sync>;
/// Runs off the request path after a failure was classified and queued for logging.
pub type OnAppError = Arc<dyn Fn(&dyn AppError, &Context) + Send + Sync>;

/// Looks up routes and runs their handlers.
pub struct Dispatcher {
    routes: Routes,
    config: Arc<RouterConfig>,
    error_log: ErrorLog,
    user_id_parser: Option<UserIdParser>,
    before_serve: Option<BeforeServe>,
    on_app_error: Option<OnAppError>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes.table.len())
            .field("base_path", &self.config.server.base_path)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(routes: Routes, config: Arc<RouterConfig>, error_log: ErrorLog) -> Self {
        install_panic_hook();
        Self {
            routes,
            config,
            error_log,
            user_id_parser: None,
            before_serve: None,
            on_app_error: None,
        }
    }

    /// Replace the header-based user id lookup.
    pub fn with_user_id_parser<F>(mut self, parser: F) -> Self
    where
        F: Fn(&Parts) -> i64 + Send + Sync + 'static,
    {
        self.user_id_parser = Some(Arc::new(parser));
        self
    }

    pub fn with_before_serve<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.before_serve = Some(Arc::new(hook));
        self
    }

    pub fn with_on_app_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&dyn AppError, &Context) + Send + Sync + 'static,
    {
        self.on_app_error = Some(Arc::new(hook));
        self
    }

    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    pub fn config(&self) -> &Arc<RouterConfig> {
        &self.config
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.error_log
    }

    /// Sorted dump of every handled route.
    pub fn handled_paths(&self, with_base_path: bool) -> String {
        let base = with_base_path.then_some(self.config.server.base_path.as_str());
        self.routes.table.handled_paths(base)
    }

    /// The request path below the base path, or `None` when outside it.
    pub fn strip_base_path<'a>(&self, path: &'a str) -> Option<&'a str> {
        path.strip_prefix(self.config.server.base_path.as_str())
    }

    pub fn resolve(&self, method: &str, raw_path: &str) -> ResolvedPath {
        resolve_path(method, raw_path, &self.routes.gaps)
    }

    pub fn lookup(&self, key: &str) -> Option<&Route> {
        self.routes.table.get(key)
    }

    /// Find the route for a request head.
    pub fn route_for(&self, parts: &Parts) -> Option<(&Route, ResolvedPath)> {
        let raw_path = self.strip_base_path(parts.uri.path())?;
        let resolved = self.resolve(parts.method.as_str(), raw_path);
        let route = self.lookup(&resolved.key)?;
        Some((route, resolved))
    }

    pub fn not_found(&self) -> Reply {
        metrics::record_not_found();
        Reply::not_found(self.config.status.not_found)
    }

    /// Resolve, look up and serve a request in one step.
    pub fn dispatch(&self, parts: Parts, body: Bytes) -> Reply {
        match self.route_for(&parts) {
            Some((route, resolved)) => self.serve(route, resolved, parts, body),
            None => {
                tracing::debug!(method = %parts.method, path = %parts.uri.path(), "No route matched");
                self.not_found()
            }
        }
    }

    /// Serve a request already matched to `route`.
    pub fn serve(&self, route: &Route, resolved: ResolvedPath, parts: Parts, body: Bytes) -> Reply {
        let user_id = self.user_id(&parts);
        let mut ctx = Context::new(parts, body, resolved, Arc::clone(&self.config));
        ctx.user_id = user_id;

        tracing::debug!(route = %route.key, id = ctx.id, user_id, "Dispatching request");
        let reply = self.invoke_handler(route, &mut ctx);
        metrics::record_request(route.key.verb(), reply.status);
        reply
    }

    fn user_id(&self, parts: &Parts) -> i64 {
        if let Some(parser) = &self.user_id_parser {
            return parser(parts);
        }
        self.config
            .server
            .user_id_header
            .as_deref()
            .and_then(|name| parts.headers.get(name))
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Run the before-serve hook and the handler, then render the reply.
    ///
    /// Stack walks of internal failures stop at this frame.
    #[inline(never)]
    fn invoke_handler(&self, route: &Route, ctx: &mut Context) -> Reply {
        let guard = PanicGuard::enter();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            if let Some(hook) = &self.before_serve {
                hook(ctx);
            }
            route.call(ctx)
        }));
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err),
            Err(payload) => Some(from_panic(
                payload,
                self.config.status.internal_error,
                guard.take_stack(),
            )),
        };
        drop(guard);

        let headers = std::mem::take(&mut ctx.response_headers);
        let Some(err) = failure else {
            let body = render_envelope(ctx.data.as_ref(), None);
            ctx.set_written(body.len());
            return Reply::new(ctx.status, headers, body);
        };

        let status = err.status();
        let body = render_envelope(None, Some(err.message()));
        ctx.set_written(body.len());

        metrics::record_app_error(err.kind());
        tracing::debug!(route = %route.key, status, error = %err, "Handler failed");

        err.log(ctx, &self.error_log);
        if let Some(hook) = &self.on_app_error {
            notify_app_error(Arc::clone(hook), err, ctx.clone());
        }
        Reply::new(status, headers, body)
    }
}

/// Hand a failure to the hook without blocking the caller.
fn notify_app_error(hook: OnAppError, err: Box<dyn AppError>, ctx: Context) {
    let notify = move || hook(err.as_ref(), &ctx);
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn_blocking(notify);
        }
        Err(_) => {
            std::thread::spawn(notify);
        }
    }
}

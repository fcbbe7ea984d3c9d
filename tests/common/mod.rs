//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use resource_router::config::RouterConfig;
use resource_router::error::{HandlerResult, InternalError, RequestError};
use resource_router::http::Context;
use resource_router::lifecycle::{self, Shutdown};
use resource_router::observability::{ErrorLog, LogFormat, LogWriter};
use resource_router::routing::{Dispatcher, Method, Resource, RouteTableBuilder};
use resource_router::HttpServer;

/// Collects error log lines in memory.
#[derive(Default)]
pub struct Lines(Mutex<Vec<String>>);

impl Lines {
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock())
    }
}

impl LogWriter for Lines {
    fn write_line(&self, line: &str) -> io::Result<()> {
        self.0.lock().push(line.to_string());
        Ok(())
    }
}

/// Users with id-paths, failing methods, a panicking one and a slow one.
pub struct UsersId;

impl UsersId {
    fn image_url(&self, ctx: &mut Context) -> HandlerResult {
        let url = format!("https://img.example/{}.png", ctx.id);
        ctx.set_data(&url)
    }

    fn post_image_url(&self, ctx: &mut Context) -> HandlerResult {
        let body = String::from_utf8_lossy(ctx.body()).into_owned();
        if body.is_empty() {
            return Err(RequestError::new("image url required").into());
        }
        ctx.status = 201;
        ctx.set_data(&body)
    }

    fn delete(&self, _ctx: &mut Context) -> HandlerResult {
        Err(InternalError::from_display("storage offline\nretry later").into())
    }

    fn whoami(&self, ctx: &mut Context) -> HandlerResult {
        if ctx.user_id == 0 {
            return Err(ctx.unauthorized());
        }
        let user_id = ctx.user_id;
        ctx.set_data(&user_id)
    }

    fn crash(&self, _ctx: &mut Context) -> HandlerResult {
        panic!("handler crashed")
    }

    fn slow(&self, _ctx: &mut Context) -> HandlerResult {
        std::thread::sleep(Duration::from_millis(400));
        Err(InternalError::from_display("slow upstream timed out").into())
    }
}

impl Resource for UsersId {
    fn methods() -> Vec<Method<Self>> {
        vec![
            Method::new("ImageUrl", Self::image_url),
            Method::new("PostImageUrl", Self::post_image_url),
            Method::new("Delete", Self::delete),
            Method::new("Whoami", Self::whoami),
            Method::new("Crash", Self::crash),
            Method::new("Slow", Self::slow),
        ]
    }
}

/// Plain resource with a trailing-id method and a gap.
pub struct Albums;

impl Albums {
    fn photo_id(&self, ctx: &mut Context) -> HandlerResult {
        let data = serde_json::json!({ "photo": ctx.id, "gaps": ctx.gaps() });
        ctx.set_data(&data)
    }

    fn search(&self, ctx: &mut Context) -> HandlerResult {
        let query = ctx.query("q").unwrap_or_default();
        ctx.set_data(&query)
    }
}

impl Resource for Albums {
    fn methods() -> Vec<Method<Self>> {
        vec![
            Method::new("PhotoId", Self::photo_id),
            Method::new("Search", Self::search),
        ]
    }

    fn gap(&self) -> Option<&str> {
        Some("shared")
    }
}

pub struct TestApp {
    pub dispatcher: Arc<Dispatcher>,
    pub error_log: ErrorLog,
    pub request_lines: Arc<Lines>,
    pub internal_lines: Arc<Lines>,
}

/// Dispatcher over the sample resources with both error kinds logged in memory.
pub fn test_app(config: RouterConfig) -> TestApp {
    let request_lines = Arc::new(Lines::default());
    let internal_lines = Arc::new(Lines::default());
    let error_log = ErrorLog::new(
        LogFormat::from(&config.logging),
        config.logging.queue_capacity,
        Some(request_lines.clone()),
        Some(internal_lines.clone()),
    );

    let routes = RouteTableBuilder::new()
        .separator(config.routing.word_separator.clone())
        .resource(UsersId)
        .resource(Albums)
        .build()
        .unwrap();

    let dispatcher = Dispatcher::new(routes, Arc::new(config), error_log.clone());
    TestApp {
        dispatcher: Arc::new(dispatcher),
        error_log,
        request_lines,
        internal_lines,
    }
}

/// Serve the app on an ephemeral local port with `workers` error log workers.
pub async fn spawn_server(
    app: &TestApp,
    workers: usize,
    shutdown: &Shutdown,
) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(app.dispatcher.clone());
    let error_log = app.error_log.clone();
    let shutdown = shutdown.clone();
    let handle = tokio::spawn(async move {
        lifecycle::serve(server, listener, &error_log, workers, &shutdown)
            .await
            .unwrap();
    });
    (addr, handle)
}

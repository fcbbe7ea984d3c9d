//! Audit log for handler failures.
//!
//! # Responsibilities
//! - Snapshot request details for a failure into a `LogRecord`
//! - Queue records without blocking the request path
//! - Render records into fixed-format lines on background workers
//! - Write lines to the configured sink per failure kind
//!
//! # Design Decisions
//! - Bounded queue; when full, the oldest record is dropped and counted
//! - Fixed number of workers, drained once more on shutdown
//! - Workers hand sink writes to the blocking pool; a slow file or pipe never
//!   stalls the async runtime
//! - Sink errors are swallowed: logging is best effort and never retried
//! - Line layout is a template so existing log consumers keep parsing it

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;

use crate::config::schema::{LogTarget, LoggingConfig};
use crate::error::{AppError, StackTrace};
use crate::http::Context;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Default line template.
pub const DEFAULT_LINE_FORMAT: &str =
    r#"{remote_addr} - {user_id} [{time}] "{method} {uri} {proto}" 200 {written} "{error}" "{stack}""#;

/// Default timestamp format (`02/Jan/2006:15:04:05 -0700` style).
pub const DEFAULT_TIME_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Which sink a record goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Request,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Request => "request",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Templates used to render a record.
#[derive(Debug, Clone)]
pub struct LogFormat {
    pub line: String,
    pub time: String,
    pub frame: String,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self {
            line: DEFAULT_LINE_FORMAT.to_string(),
            time: DEFAULT_TIME_FORMAT.to_string(),
            frame: crate::error::stack::DEFAULT_FRAME_FORMAT.to_string(),
        }
    }
}

impl From<&LoggingConfig> for LogFormat {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            line: config.line_format.clone(),
            time: config.time_format.clone(),
            frame: config.frame_format.clone(),
        }
    }
}

/// Request details captured when a failure is logged.
#[derive(Debug)]
pub struct LogRecord {
    pub kind: ErrorKind,
    pub remote_addr: String,
    pub user_id: i64,
    pub time: DateTime<Local>,
    pub method: String,
    pub uri: String,
    pub proto: String,
    pub written: usize,
    pub error: String,
    pub stack: Option<StackTrace>,
}

impl LogRecord {
    pub fn new(
        kind: ErrorKind,
        ctx: &Context,
        error: &dyn AppError,
        stack: Option<StackTrace>,
    ) -> Self {
        Self {
            kind,
            remote_addr: ctx
                .remote_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_default(),
            user_id: ctx.user_id,
            time: Local::now(),
            method: ctx.method().to_string(),
            uri: ctx
                .uri()
                .path_and_query()
                .map(|pq| pq.to_string())
                .unwrap_or_else(|| ctx.uri().path().to_string()),
            proto: format!("{:?}", ctx.version()),
            written: ctx.written(),
            error: error.to_string(),
            stack,
        }
    }

    /// Render the record as a single line (no trailing newline).
    pub fn render(&mut self, format: &LogFormat) -> String {
        let mut time = String::new();
        if write!(time, "{}", self.time.format(&format.time)).is_err() {
            time = self.time.to_rfc2822();
        }
        let stack = match self.stack.as_mut() {
            Some(trace) => trace.render(&format.frame),
            None => "-".to_string(),
        };
        let error = self.error.replace('\n', ";");

        fill_template(&format.line, |field| match field {
            "remote_addr" => Some(self.remote_addr.clone()),
            "user_id" => Some(self.user_id.to_string()),
            "time" => Some(time.clone()),
            "method" => Some(self.method.clone()),
            "uri" => Some(self.uri.clone()),
            "proto" => Some(self.proto.clone()),
            "written" => Some(self.written.to_string()),
            "error" => Some(error.clone()),
            "stack" => Some(stack.clone()),
            _ => None,
        })
    }
}

/// Destination for rendered lines.
pub trait LogWriter: Send + Sync {
    fn write_line(&self, line: &str) -> io::Result<()>;
}

/// Writes lines to stderr or stdout.
#[derive(Debug, Clone, Copy)]
pub enum StreamWriter {
    Stderr,
    Stdout,
}

impl LogWriter for StreamWriter {
    fn write_line(&self, line: &str) -> io::Result<()> {
        match self {
            StreamWriter::Stderr => writeln!(io::stderr().lock(), "{}", line),
            StreamWriter::Stdout => writeln!(io::stdout().lock(), "{}", line),
        }
    }
}

/// Appends lines to a file.
#[derive(Debug)]
pub struct FileWriter {
    file: Mutex<File>,
}

impl FileWriter {
    pub fn open(path: &std::path::Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl LogWriter for FileWriter {
    fn write_line(&self, line: &str) -> io::Result<()> {
        writeln!(self.file.lock(), "{}", line)
    }
}

/// Forwards lines to the tracing subscriber.
#[derive(Debug, Clone, Copy)]
pub struct TracingWriter(pub ErrorKind);

impl LogWriter for TracingWriter {
    fn write_line(&self, line: &str) -> io::Result<()> {
        match self.0 {
            ErrorKind::Request => tracing::warn!(target: "resource_router::error_log", "{}", line),
            ErrorKind::Internal => tracing::error!(target: "resource_router::error_log", "{}", line),
        }
        Ok(())
    }
}

fn open_writer(target: &LogTarget, kind: ErrorKind) -> io::Result<Option<Arc<dyn LogWriter>>> {
    let writer: Arc<dyn LogWriter> = match target {
        LogTarget::Off => return Ok(None),
        LogTarget::Stderr => Arc::new(StreamWriter::Stderr),
        LogTarget::Stdout => Arc::new(StreamWriter::Stdout),
        LogTarget::Tracing => Arc::new(TracingWriter(kind)),
        LogTarget::File(path) => Arc::new(FileWriter::open(path)?),
    };
    Ok(Some(writer))
}

struct Inner {
    queue: Mutex<VecDeque<LogRecord>>,
    ready: Notify,
    capacity: usize,
    dropped: AtomicU64,
    request_sink: Option<Arc<dyn LogWriter>>,
    internal_sink: Option<Arc<dyn LogWriter>>,
    format: LogFormat,
}

/// Handle to the failure log queue. Cheap to clone.
#[derive(Clone)]
pub struct ErrorLog {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ErrorLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorLog")
            .field("capacity", &self.inner.capacity)
            .field("pending", &self.pending())
            .field("dropped", &self.dropped())
            .finish()
    }
}

impl ErrorLog {
    /// Create a log with explicit sinks. `None` disables that kind.
    pub fn new(
        format: LogFormat,
        capacity: usize,
        request_sink: Option<Arc<dyn LogWriter>>,
        internal_sink: Option<Arc<dyn LogWriter>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
                ready: Notify::new(),
                capacity: capacity.max(1),
                dropped: AtomicU64::new(0),
                request_sink,
                internal_sink,
                format,
            }),
        }
    }

    /// Create a log from configuration, opening file sinks.
    pub fn from_config(config: &LoggingConfig) -> io::Result<Self> {
        let request_sink = open_writer(&config.request_errors, ErrorKind::Request)?;
        let internal_sink = open_writer(&config.internal_errors, ErrorKind::Internal)?;
        Ok(Self::new(
            LogFormat::from(config),
            config.queue_capacity,
            request_sink,
            internal_sink,
        ))
    }

    /// A log that discards everything.
    pub fn disabled() -> Self {
        Self::new(LogFormat::default(), 1, None, None)
    }

    pub fn is_enabled(&self, kind: ErrorKind) -> bool {
        self.sink(kind).is_some()
    }

    fn sink(&self, kind: ErrorKind) -> Option<&Arc<dyn LogWriter>> {
        match kind {
            ErrorKind::Request => self.inner.request_sink.as_ref(),
            ErrorKind::Internal => self.inner.internal_sink.as_ref(),
        }
    }

    /// Queue a record. Never blocks on I/O.
    pub fn submit(&self, record: LogRecord) {
        let evicted = {
            let mut queue = self.inner.queue.lock();
            let evicted = if queue.len() >= self.inner.capacity {
                queue.pop_front()
            } else {
                None
            };
            queue.push_back(record);
            evicted
        };

        if let Some(old) = evicted {
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            metrics::record_log_dropped();
            tracing::debug!(kind = old.kind.as_str(), "Error log queue full, dropped oldest record");
        }
        self.inner.ready.notify_one();
    }

    /// Records discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Records waiting to be written.
    pub fn pending(&self) -> usize {
        self.inner.queue.lock().len()
    }

    fn pop(&self) -> Option<LogRecord> {
        self.inner.queue.lock().pop_front()
    }

    fn write(&self, mut record: LogRecord) {
        let Some(sink) = self.sink(record.kind) else {
            return;
        };
        let line = record.render(&self.inner.format);
        if let Err(e) = sink.write_line(&line) {
            tracing::debug!(error = %e, "Failed to write error log line");
        }
    }

    /// Write every queued record on the calling thread.
    ///
    /// Returns the number of records taken off the queue.
    pub fn write_pending(&self) -> usize {
        let mut written = 0;
        while let Some(record) = self.pop() {
            self.write(record);
            written += 1;
        }
        written
    }

    /// Start `count` workers that drain the queue until shutdown.
    pub fn spawn_workers(&self, count: usize, shutdown: &Shutdown) -> Vec<JoinHandle<()>> {
        (0..count.max(1))
            .map(|worker| {
                let log = self.clone();
                let rx = shutdown.subscribe();
                tokio::spawn(async move { log.run_worker(worker, rx).await })
            })
            .collect()
    }

    async fn run_worker(self, worker: usize, mut shutdown: broadcast::Receiver<()>) {
        tracing::debug!(worker, "Error log worker started");
        loop {
            self.drain_blocking(worker).await;
            tokio::select! {
                _ = self.inner.ready.notified() => {}
                _ = shutdown.recv() => {
                    self.drain_blocking(worker).await;
                    break;
                }
            }
        }
        tracing::debug!(worker, "Error log worker stopped");
    }

    async fn drain_blocking(&self, worker: usize) {
        if self.pending() == 0 {
            return;
        }
        let log = self.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || log.write_pending()).await {
            tracing::warn!(worker, error = %e, "Error log write task failed");
        }
    }
}

/// Substitute `{field}` placeholders. Unknown fields are kept verbatim.
pub(crate) fn fill_template<F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len() + 64);
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let field = &after[..end];
                match lookup(field) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(field);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{InternalError, RequestError};
    use crate::http::Context;
    use chrono::TimeZone;

    #[derive(Default)]
    struct Lines(Mutex<Vec<String>>);

    impl LogWriter for Lines {
        fn write_line(&self, line: &str) -> io::Result<()> {
            self.0.lock().push(line.to_string());
            Ok(())
        }
    }

    fn record(kind: ErrorKind, error: &str) -> LogRecord {
        LogRecord {
            kind,
            remote_addr: "10.0.0.1:5000".to_string(),
            user_id: 7,
            time: Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 6).unwrap(),
            method: "GET".to_string(),
            uri: "/users/5/image_url?size=2".to_string(),
            proto: "HTTP/1.1".to_string(),
            written: 37,
            error: error.to_string(),
            stack: None,
        }
    }

    #[test]
    fn test_fill_template() {
        let out = fill_template("a {x} b {y} {", |f| (f == "x").then(|| "1".to_string()));
        assert_eq!(out, "a 1 b {y} {");
        assert_eq!(fill_template("plain", |_| None), "plain");
    }

    #[test]
    fn test_render_request_error_line() {
        let format = LogFormat {
            time: "%d/%b/%Y:%H:%M:%S".to_string(),
            ..LogFormat::default()
        };
        let line = record(ErrorKind::Request, "bad\nname").render(&format);
        assert_eq!(
            line,
            r#"10.0.0.1:5000 - 7 [09/Mar/2024:14:05:06] "GET /users/5/image_url?size=2 HTTP/1.1" 200 37 "bad;name" "-""#
        );
    }

    #[test]
    fn test_queue_drops_oldest_when_full() {
        let lines = Arc::new(Lines::default());
        let log = ErrorLog::new(LogFormat::default(), 2, Some(lines.clone()), None);

        log.submit(record(ErrorKind::Request, "first"));
        log.submit(record(ErrorKind::Request, "second"));
        log.submit(record(ErrorKind::Request, "third"));

        assert_eq!(log.pending(), 2);
        assert_eq!(log.dropped(), 1);
        assert_eq!(log.write_pending(), 2);

        let written = lines.0.lock();
        assert!(written[0].contains("\"second\""));
        assert!(written[1].contains("\"third\""));
    }

    #[test]
    fn test_disabled_kind_is_not_logged() {
        let lines = Arc::new(Lines::default());
        let log = ErrorLog::new(LogFormat::default(), 8, None, Some(lines.clone()));
        let (parts, _) = axum::http::Request::builder()
            .uri("/users/name")
            .body(())
            .unwrap()
            .into_parts();
        let ctx = Context::for_parts(parts);

        assert!(!log.is_enabled(ErrorKind::Request));
        RequestError::new("ignored").log(&ctx, &log);
        assert_eq!(log.pending(), 0);

        InternalError::new("db down").log(&ctx, &log);
        assert_eq!(log.write_pending(), 1);
        let written = lines.0.lock();
        assert!(written[0].contains("\"GET /users/name HTTP/1.1\""));
        assert!(written[0].contains("\"db down\""));
    }

    #[tokio::test]
    async fn test_workers_drain_on_shutdown() {
        let lines = Arc::new(Lines::default());
        let log = ErrorLog::new(LogFormat::default(), 16, Some(lines.clone()), None);
        let shutdown = Shutdown::new();
        let workers = log.spawn_workers(2, &shutdown);

        for i in 0..5 {
            log.submit(record(ErrorKind::Request, &format!("e{}", i)));
        }
        shutdown.trigger();
        for worker in workers {
            worker.await.unwrap();
        }

        assert_eq!(lines.0.lock().len(), 5);
        assert_eq!(log.pending(), 0);
    }

    struct SlowSink {
        delay: std::time::Duration,
        lines: Lines,
    }

    impl LogWriter for SlowSink {
        fn write_line(&self, line: &str) -> io::Result<()> {
            std::thread::sleep(self.delay);
            self.lines.write_line(line)
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_slow_sink_does_not_stall_runtime() {
        let sink = Arc::new(SlowSink {
            delay: std::time::Duration::from_millis(300),
            lines: Lines::default(),
        });
        let log = ErrorLog::new(LogFormat::default(), 16, Some(sink.clone()), None);
        let shutdown = Shutdown::new();
        let workers = log.spawn_workers(1, &shutdown);

        log.submit(record(ErrorKind::Request, "slow"));
        tokio::task::yield_now().await;

        let started = std::time::Instant::now();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(started.elapsed() < std::time::Duration::from_millis(200));

        shutdown.trigger();
        for worker in workers {
            worker.await.unwrap();
        }
        assert_eq!(sink.lines.0.lock().len(), 1);
    }
}

//! Handler failure classification.
//!
//! # Data Flow
//! ```text
//! handler returns Err / panics
//!     → Box<dyn AppError> (RequestError | InternalError | custom)
//!     → dispatcher writes {"data":null,"error":message()} with status()
//!     → AppError::log(ctx, error_log)
//!         RequestError: queue a line when request errors are logged
//!         InternalError: queue a line with the stack recorded at creation
//!     → observability::error_log workers render and write
//! ```
//!
//! # Design Decisions
//! - Client messages for internal failures never carry the cause
//! - Any non-AppError failure becomes an InternalError
//! - Stacks are recorded unresolved where the failure is created and only
//!   resolved when the line is written

pub mod stack;

use std::any::Any;
use std::fmt;

use crate::http::Context;
use crate::observability::error_log::{ErrorKind, ErrorLog, LogRecord};

pub use stack::StackTrace;

/// Default status for [`RequestError`].
pub const REQUEST_ERROR_STATUS: u16 = 400;
/// Default status for [`InternalError`].
pub const INTERNAL_ERROR_STATUS: u16 = 500;
/// Default status for unauthorized requests.
pub const UNAUTHORIZED_STATUS: u16 = 401;
/// Default status for unmatched routes.
pub const NOT_FOUND_STATUS: u16 = 404;

/// Client-visible message of every [`InternalError`].
pub const INTERNAL_ERROR_MESSAGE: &str = "InternalError";

/// Result returned by every route handler.
pub type HandlerResult = Result<(), Box<dyn AppError>>;

/// A failure that knows how to present and log itself.
///
/// `Display` is the text written to the error log.
pub trait AppError: fmt::Display + fmt::Debug + Send + Sync + 'static {
    /// Status code written to the response.
    fn status(&self) -> u16;

    /// Message sent to the client.
    fn message(&self) -> &str;

    /// Which class of failure this is, for logging and metrics.
    fn kind(&self) -> ErrorKind {
        if self.status() >= 500 {
            ErrorKind::Internal
        } else {
            ErrorKind::Request
        }
    }

    /// Queue a log line for this failure.
    ///
    /// Called by the dispatcher once the response body has been rendered.
    fn log(&self, ctx: &Context, log: &ErrorLog);
}

/// An expected failure caused by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestError {
    message: String,
    status: u16,
}

impl RequestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_status(message, REQUEST_ERROR_STATUS)
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }

    pub fn unauthorized() -> Self {
        Self::with_status("Unauthorized", UNAUTHORIZED_STATUS)
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl AppError for RequestError {
    fn status(&self) -> u16 {
        self.status
    }

    fn message(&self) -> &str {
        &self.message
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::Request
    }

    fn log(&self, ctx: &Context, log: &ErrorLog) {
        if log.is_enabled(ErrorKind::Request) {
            log.submit(LogRecord::new(ErrorKind::Request, ctx, self, None));
        }
    }
}

/// An unexpected failure. The cause is logged, never returned to the client.
///
/// The call stack is recorded when the error is created.
#[derive(Debug)]
pub struct InternalError {
    cause: Box<dyn std::error::Error + Send + Sync>,
    status: u16,
    stack: StackTrace,
}

impl InternalError {
    pub fn new(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::with_status(cause, INTERNAL_ERROR_STATUS)
    }

    pub fn with_status(
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
        status: u16,
    ) -> Self {
        Self {
            cause: cause.into(),
            status,
            stack: StackTrace::capture(),
        }
    }

    fn with_stack(cause: String, status: u16, stack: StackTrace) -> Self {
        Self {
            cause: cause.into(),
            status,
            stack,
        }
    }

    /// Wrap any printable value that is not an error type.
    pub fn from_display(value: impl fmt::Display) -> Self {
        Self::new(value.to_string())
    }

    /// The wrapped cause.
    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.cause.as_ref()
    }
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.cause, f)
    }
}

impl AppError for InternalError {
    fn status(&self) -> u16 {
        self.status
    }

    fn message(&self) -> &str {
        INTERNAL_ERROR_MESSAGE
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::Internal
    }

    fn log(&self, ctx: &Context, log: &ErrorLog) {
        if log.is_enabled(ErrorKind::Internal) {
            let stack = self.stack.clone();
            log.submit(LogRecord::new(ErrorKind::Internal, ctx, self, Some(stack)));
        }
    }
}

impl From<RequestError> for Box<dyn AppError> {
    fn from(err: RequestError) -> Self {
        Box::new(err)
    }
}

impl From<InternalError> for Box<dyn AppError> {
    fn from(err: InternalError) -> Self {
        Box::new(err)
    }
}

/// Adapters from arbitrary `Result`s into handler failures.
pub trait ResultExt<T> {
    /// Treat the error as an internal failure.
    fn or_internal(self) -> Result<T, Box<dyn AppError>>;

    /// Replace the error with a client-facing message.
    fn or_request_error(self, message: &str) -> Result<T, Box<dyn AppError>>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn or_internal(self) -> Result<T, Box<dyn AppError>> {
        self.map_err(|e| InternalError::new(e).into())
    }

    fn or_request_error(self, message: &str) -> Result<T, Box<dyn AppError>> {
        self.map_err(|_| RequestError::new(message).into())
    }
}

/// Convert a caught panic payload into a classified failure.
///
/// `RequestError` and `InternalError` payloads (from `std::panic::panic_any`)
/// keep their classification; string payloads become internal failures
/// carrying `stack`, the stack recorded at the panic site.
pub fn from_panic(
    payload: Box<dyn Any + Send>,
    internal_status: u16,
    stack: Option<StackTrace>,
) -> Box<dyn AppError> {
    let payload = match payload.downcast::<RequestError>() {
        Ok(err) => return err as Box<dyn AppError>,
        Err(other) => other,
    };
    let payload = match payload.downcast::<InternalError>() {
        Ok(err) => return err as Box<dyn AppError>,
        Err(other) => other,
    };
    let text = if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    };
    let stack = stack.unwrap_or_else(StackTrace::capture);
    Box::new(InternalError::with_stack(text, internal_status, stack))
}

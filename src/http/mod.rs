//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, timeout, body limit)
//!     → routing::Dispatcher (resolve, build context.rs, run handler)
//!     → response.rs (envelope, headers)
//!     → Send to client
//! ```

pub mod context;
pub mod request;
pub mod response;
pub mod server;

pub use context::Context;
pub use request::X_REQUEST_ID;
pub use response::Reply;
pub use server::HttpServer;

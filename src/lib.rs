//! Convention-based HTTP resource router.
//!
//! Route paths are derived from resource and method names
//! (`UsersId::ImageUrl` → `GET /users/:id/image_url`), handler failures are
//! classified into client and internal errors, and every failure can be
//! written as a single log line by background workers.

pub mod config;
pub mod demo;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::RouterConfig;
pub use error::{AppError, HandlerResult, InternalError, RequestError, ResultExt};
pub use http::{Context, HttpServer};
pub use lifecycle::Shutdown;
pub use observability::ErrorLog;
pub use routing::{Dispatcher, Method, Resource, ResourceDescriptor, RouteTableBuilder};

//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters)
//!
//! Handler failures additionally produce:
//!     → error_log.rs (queued records → one line per failure)
//!
//! Consumers:
//!     → Log aggregation (stderr, stdout, file)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Error lines keep a fixed template so existing parsers keep working
//! - Request path never blocks on log I/O
//! - Metrics are cheap (atomic increments)

pub mod error_log;
pub mod logging;
pub mod metrics;

pub use error_log::{ErrorKind, ErrorLog, LogFormat, LogRecord, LogWriter};

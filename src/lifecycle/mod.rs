//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     spawn error log workers on a private channel → serve HTTP
//!
//! Shutdown (shutdown.rs):
//!     trigger → HTTP server stops accepting and drains in-flight requests
//!             → then the error log workers are told to write what is
//!               queued and exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - The public channel stops the server only; log workers get their own
//! - Ordered shutdown: stop accept, drain requests, drain error log

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::serve;
pub use signals::{shutdown_signal, spawn_signal_listener};

//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     Resource[] / ResourceDescriptor[]
//!     → naming.rs (CamelCase → separator-joined words)
//!     → table.rs (verb prefix, id suffix, gap segments → "VERB /path")
//!     → Freeze as immutable Routes { table, gaps }
//!
//! Incoming Request (verb, path):
//!     → dispatcher.rs (strip base path)
//!     → resolver.rs (path → route key, id, segments, gaps)
//!     → table lookup → handler or NotFound
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Exact key lookup, no pattern matching in the hot path
//! - Deterministic: same input always resolves to the same key

pub mod dispatcher;
pub mod naming;
pub mod resolver;
pub mod resource;
pub mod table;

pub use dispatcher::Dispatcher;
pub use resolver::{resolve_path, ResolvedPath};
pub use resource::{Handler, Method, Resource, ResourceDescriptor};
pub use table::{BuildError, GapTable, Route, RouteKey, RouteTable, RouteTableBuilder, Routes, Verb};

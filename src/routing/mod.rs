//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path ("/firestore.googleapis.com/v1/...")
//!     → resolver.rs (first-segment allow-list lookup)
//!     → Return: ForwardTarget { host, path } or ResolveError
//! ```
//!
//! # Design Decisions
//! - Allow-list compiled at startup, immutable at runtime
//! - Exact hostname matching only, no patterns
//! - The gRPC-style Firestore service path is rewritten, keeping the
//!   full original path (the upstream expects the service prefix)

pub mod resolver;

pub use resolver::{ForwardTarget, HostResolver, ResolveError};

//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → server.rs (CORS, preflight, health, host resolution, session
//!       tracking, admission)
//!     → forward.rs (outbound request construction, timeout, streaming)
//!     → error.rs (upstream failure translation)
//!     → Send to client
//! ```

pub mod error;
pub mod forward;
pub mod server;

pub use server::{AppState, HttpServer};

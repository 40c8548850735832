//! Edge reverse proxy for Firebase upstreams.
//!
//! Re-homes browser calls through an allow-list of Google API hosts while
//! handling the Firestore WebChannel transport: session tracking across
//! otherwise-stateless HTTP calls, a hard bound on concurrent upstream
//! connections, long-poll timeouts, and translation of upstream
//! session-loss errors into actionable client responses.
//!
//! # Architecture Overview
//!
//! ```text
//! Client Request
//!     → cors       (origin policy: echo or default grant)
//!     → routing    (first path segment → vetted upstream host)
//!     → webchannel (classify channel calls, session registry)
//!     → admission  (FIFO-bounded upstream concurrency)
//!     → http       (forward, stream back, translate failures)
//! Client Response
//! ```

pub mod admission;
pub mod config;
pub mod cors;
pub mod http;
pub mod routing;
pub mod webchannel;

pub use config::ProxyConfig;
pub use http::HttpServer;

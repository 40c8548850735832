//! WebChannel protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request (uri, headers)
//!     → classifier.rs (detect channel calls, extract session parameters)
//!     → registry.rs (session lookup / creation / expiry)
//!     → forwarder applies channel-specific headers and timeout
//! ```
//!
//! # Design Decisions
//! - Classification is total: non-channel requests get an empty tag,
//!   never an error
//! - Session key priority is SID > gsessionid > RID; only SID creates
//! - Fixed-window TTL measured from creation; lookups never renew it

pub mod classifier;
pub mod registry;

pub use classifier::{classify, ChannelInfo, ChannelOperation};
pub use registry::{Session, SessionRegistry};

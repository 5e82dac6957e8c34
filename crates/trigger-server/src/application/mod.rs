//! Application layer for trigger-server.
//!
//! Knows *what* happens to an inbound WebSocket frame and which use cases the
//! demo service offers; the infrastructure layer decides *how* bytes arrive.
//!
//! # What does NOT belong here?
//!
//! - Opening sockets or listening for connections (that is infrastructure)
//! - Tokio task spawning (that happens in the infrastructure layer)
//! - WebSocket framing (handled by tokio-tungstenite)

pub mod catalog;
pub mod socket_dispatch;

pub use catalog::demo_catalog;
pub use socket_dispatch::SocketDispatcher;

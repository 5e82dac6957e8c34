//! Infrastructure layer for trigger-server.
//!
//! The infrastructure layer handles all I/O: reading settings and metadata
//! files, serving HTTP through axum and WebSocket sessions through
//! tokio-tungstenite.
//!
//! # What does NOT belong here?
//!
//! - Frame parsing and event routing (that is the application layer)
//! - Settings and frame type definitions (that is the domain layer)
//! - Command-line parsing (that is done in `main.rs`)

pub mod config_store;
pub mod http_server;
pub mod metadata_file;
pub mod runtime;
pub mod ws_server;

pub use config_store::{load_settings, ConfigStoreError};
pub use http_server::{serve_http, HttpRuntime};
pub use metadata_file::{load_metadata, parse_metadata, MetadataFileError};
pub use runtime::{bind_service, BoundService, ServiceRuntime};
pub use ws_server::run_server;

//! trigger-server library crate.
//!
//! Serves use cases bound by `trigger-core` over HTTP (axum) and WebSocket
//! (tokio-tungstenite).
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Clients (HTTP JSON, WebSocket JSON frames)
//!         ↕
//! [trigger-server]
//!   ├── domain/           Pure types: ServerSettings, WebSocket frames
//!   ├── application/      SocketDispatcher, demo use-case catalog
//!   └── infrastructure/
//!         ├── http_server/    axum runtime + CORS layer
//!         ├── ws_server/      WebSocket accept loop
//!         ├── runtime/        one registration for both transports
//!         ├── config_store/   settings file
//!         └── metadata_file/  service metadata file
//!         ↕
//! [trigger-core]  descriptors → handlers → use cases
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain` and `trigger-core` only.
//! - `infrastructure` depends on all other layers plus `tokio`, `axum` and
//!   `tokio-tungstenite`.

/// Domain layer: settings schema and frame types (no I/O).
pub mod domain;

/// Application layer: socket event dispatch and the demo catalog.
pub mod application;

/// Infrastructure layer: HTTP and WebSocket servers, file loading.
pub mod infrastructure;

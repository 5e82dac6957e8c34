//! Domain layer for trigger-server.
//!
//! Pure types with no I/O: the settings schema and the WebSocket frame
//! format.  Loading files and opening sockets happen in `infrastructure`.

pub mod frames;
pub mod settings;

pub use frames::{InboundFrame, OutboundFrame};
pub use settings::{ServerSettings, SettingsError};

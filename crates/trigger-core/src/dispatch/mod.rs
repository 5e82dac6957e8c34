//! Handler synthesis and route registration.

pub mod registry;
pub mod synthesize;

pub use registry::{
    plan, HttpRoute, Registrar, RegistrationError, RegistrationSummary, RouteTable, SocketRoute,
    ServingRuntime,
};
pub use synthesize::{synthesize_http, synthesize_socket, ConfigError, HttpHandler, SocketHandler};

//! # trigger-core
//!
//! Binds framework-agnostic use cases to network triggers (HTTP routes and
//! WebSocket events) from a declarative description, without per-route glue.
//!
//! This crate has no sockets and no server.  A serving runtime (see the
//! `trigger-server` crate) implements [`ServingRuntime`] and receives fully
//! validated, ready-to-call handlers.
//!
//! # Architecture overview (for beginners)
//!
//! At startup:
//!
//! ```text
//! ServiceMetadata ──bind──► Vec<UseCaseDescriptor> ──Registrar──► RouteTable ──► ServingRuntime
//! ```
//!
//! Per request:
//!
//! ```text
//! InboundRequest / SocketEvent ──resolve──► ResolvedInput ──UseCase──► Outcome ──map──► reply
//! ```
//!
//! - **`domain`** – Descriptors, parameter specs, outcomes and the
//!   [`UseCase`] trait.  Plain data.
//! - **`resolver`** – Pulls raw values out of a request and coerces them into
//!   declared types, collecting every problem into one `ValidationError`.
//! - **`mapping`** – Turns an [`Outcome`] into an HTTP status + JSON body or a
//!   socket event + payload.
//! - **`dispatch`** – Synthesizes one handler per trigger and registers the
//!   whole set all-or-nothing.
//! - **`cors`** – The one cross-origin policy every HTTP route shares.
//! - **`metadata`** – The serde schema for service metadata and its binding
//!   to a catalog of implementations.

pub mod cors;
pub mod dispatch;
pub mod domain;
pub mod mapping;
pub mod metadata;
pub mod resolver;

pub use cors::{AllowedOrigins, CorsPolicy};
pub use dispatch::{
    plan, synthesize_http, synthesize_socket, ConfigError, HttpHandler, HttpRoute, Registrar,
    RegistrationError, RegistrationSummary, RouteTable, ServingRuntime, SocketHandler,
    SocketRoute,
};
pub use domain::{
    use_case_fn, Failure, FailureKind, HttpMethod, HttpTrigger, Outcome, ParamSource, ParamType,
    ParameterSpec, ResolvedInput, SocketTrigger, TriggerDescriptor, UseCase, UseCaseDescriptor,
    DEFAULT_NAMESPACE, ERROR_EVENT,
};
pub use mapping::{failure_emission, failure_reply, map_http, map_socket, HttpReply, SocketEmission};
pub use metadata::{bind, MetadataError, ServiceMetadata, UseCaseCatalog};
pub use resolver::{resolve, BodyDocument, InboundRequest, SocketEvent, ValidationError};

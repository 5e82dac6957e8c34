//! Registration driver: descriptors → synthesized handlers → serving runtime.
//!
//! # All or nothing
//!
//! [`Registrar::register_all`] works in two phases:
//!
//! 1. **Plan.**  Every trigger of every descriptor is validated and
//!    synthesized into a candidate [`RouteTable`].  Address conflicts are
//!    detected here.  The runtime has not been touched yet.
//! 2. **Commit.**  Only a fully valid table is handed to the
//!    [`ServingRuntime`], route by route.
//!
//! A descriptor error therefore leaves the runtime exactly as it was.  A
//! registrar binds once; a second call is rejected with
//! [`RegistrationError::AlreadyRegistered`].

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use thiserror::Error;
use tracing::{debug, info};

use super::synthesize::{
    synthesize_http, synthesize_socket, validate_http, ConfigError, HttpHandler, SocketHandler,
};
use crate::domain::{HttpMethod, TriggerDescriptor, UseCaseDescriptor};

// ── Routes ────────────────────────────────────────────────────────────────────

/// One bound HTTP route.
#[derive(Clone)]
pub struct HttpRoute {
    pub use_case: String,
    pub method: HttpMethod,
    pub path: String,
    pub handler: HttpHandler,
}

impl fmt::Debug for HttpRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRoute")
            .field("use_case", &self.use_case)
            .field("method", &self.method)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// One bound WebSocket event.
#[derive(Clone)]
pub struct SocketRoute {
    pub use_case: String,
    pub namespace: String,
    pub event: String,
    pub handler: SocketHandler,
}

impl fmt::Debug for SocketRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketRoute")
            .field("use_case", &self.use_case)
            .field("namespace", &self.namespace)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

/// Every route bound by one registration, keyed by address.
///
/// HTTP routes are keyed by `(method, shape)` so `/orders/{id}` and
/// `/orders/{order_id}` collide.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    http: BTreeMap<(HttpMethod, String), HttpRoute>,
    socket: BTreeMap<(String, String), SocketRoute>,
}

impl RouteTable {
    pub fn http_routes(&self) -> impl Iterator<Item = &HttpRoute> {
        self.http.values()
    }

    pub fn socket_routes(&self) -> impl Iterator<Item = &SocketRoute> {
        self.socket.values()
    }

    /// Finds the socket route for `event` in `namespace`.
    pub fn socket_route(&self, namespace: &str, event: &str) -> Option<&SocketRoute> {
        self.socket.get(&(namespace.to_owned(), event.to_owned()))
    }

    /// Namespaces with at least one bound event.
    pub fn namespaces(&self) -> BTreeSet<&str> {
        self.socket.keys().map(|(ns, _)| ns.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.http.is_empty() && self.socket.is_empty()
    }

    pub fn len(&self) -> usize {
        self.http.len() + self.socket.len()
    }
}

// ── Errors & summary ──────────────────────────────────────────────────────────

/// Why a registration was refused.  The runtime is untouched unless the
/// variant is [`RegistrationError::Runtime`].
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("{address} is claimed by both '{first}' and '{second}'")]
    Conflict {
        address: String,
        first: String,
        second: String,
    },

    #[error("routes '{first}' ('{first_use_case}') and '{second}' ('{second_use_case}') differ only in placeholder names")]
    AmbiguousPath {
        first: String,
        first_use_case: String,
        second: String,
        second_use_case: String,
    },

    #[error("use case '{0}' is described more than once")]
    DuplicateUseCase(String),

    #[error("this registrar has already bound its routes")]
    AlreadyRegistered,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("serving runtime rejected a route: {0}")]
    Runtime(String),
}

/// Counts reported after a successful registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrationSummary {
    pub use_cases: usize,
    pub http_routes: usize,
    pub socket_events: usize,
}

// ── ServingRuntime ────────────────────────────────────────────────────────────

/// The seam between the engine and a concrete HTTP/WebSocket server.
///
/// Implementations receive only fully validated routes.
pub trait ServingRuntime {
    type Error: fmt::Display;

    fn register_http(&mut self, route: &HttpRoute) -> Result<(), Self::Error>;

    fn register_socket(&mut self, route: &SocketRoute) -> Result<(), Self::Error>;
}

// ── Registrar ─────────────────────────────────────────────────────────────────

/// Drives one registration pass and remembers what it bound.
#[derive(Debug, Default)]
pub struct Registrar {
    table: Option<RouteTable>,
}

impl Registrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds every trigger of every descriptor to `runtime`.
    ///
    /// # Errors
    ///
    /// See [`RegistrationError`].  Every variant except `Runtime` is raised
    /// before the runtime sees a single route.
    pub fn register_all<S: ServingRuntime>(
        &mut self,
        descriptors: &[UseCaseDescriptor],
        runtime: &mut S,
    ) -> Result<RegistrationSummary, RegistrationError> {
        if self.table.is_some() {
            return Err(RegistrationError::AlreadyRegistered);
        }

        let table = plan(descriptors)?;
        for route in table.http_routes() {
            runtime
                .register_http(route)
                .map_err(|e| RegistrationError::Runtime(e.to_string()))?;
            debug!(use_case = %route.use_case, "bound {} {}", route.method, route.path);
        }
        for route in table.socket_routes() {
            runtime
                .register_socket(route)
                .map_err(|e| RegistrationError::Runtime(e.to_string()))?;
            debug!(
                use_case = %route.use_case,
                "bound event '{}' in '{}'",
                route.event,
                route.namespace
            );
        }

        let summary = RegistrationSummary {
            use_cases: descriptors.len(),
            http_routes: table.http.len(),
            socket_events: table.socket.len(),
        };
        info!(
            use_cases = summary.use_cases,
            http_routes = summary.http_routes,
            socket_events = summary.socket_events,
            "trigger registration complete"
        );
        self.table = Some(table);
        Ok(summary)
    }

    /// What the last successful registration bound.
    pub fn table(&self) -> Option<&RouteTable> {
        self.table.as_ref()
    }

    pub fn is_registered(&self) -> bool {
        self.table.is_some()
    }

    /// Forgets the bound table so the registrar can drive a fresh runtime.
    pub fn clear(&mut self) {
        self.table = None;
    }
}

/// Validates and synthesizes everything without touching a runtime.
///
/// # Errors
///
/// The first descriptor problem or address conflict found.
pub fn plan(descriptors: &[UseCaseDescriptor]) -> Result<RouteTable, RegistrationError> {
    let mut table = RouteTable::default();
    let mut names = BTreeSet::new();
    // shape → (raw path, owning use case); placeholder names must agree per shape.
    let mut shapes: BTreeMap<String, (String, String)> = BTreeMap::new();

    for descriptor in descriptors {
        if !names.insert(descriptor.name.as_str()) {
            return Err(RegistrationError::DuplicateUseCase(descriptor.name.clone()));
        }

        for trigger in &descriptor.triggers {
            match trigger {
                TriggerDescriptor::Http(http) => {
                    let template = validate_http(&descriptor.name, http)?;
                    let shape = template.shape();

                    match shapes.entry(shape.clone()) {
                        Entry::Occupied(seen) => {
                            let (path, owner) = seen.get();
                            if path != &http.path {
                                return Err(RegistrationError::AmbiguousPath {
                                    first: path.clone(),
                                    first_use_case: owner.clone(),
                                    second: http.path.clone(),
                                    second_use_case: descriptor.name.clone(),
                                });
                            }
                        }
                        Entry::Vacant(slot) => {
                            slot.insert((http.path.clone(), descriptor.name.clone()));
                        }
                    }

                    match table.http.entry((http.method, shape)) {
                        Entry::Occupied(existing) => {
                            return Err(RegistrationError::Conflict {
                                address: http.label(),
                                first: existing.get().use_case.clone(),
                                second: descriptor.name.clone(),
                            });
                        }
                        Entry::Vacant(slot) => {
                            let handler = synthesize_http(
                                &descriptor.name,
                                descriptor.use_case.clone(),
                                http,
                            )?;
                            slot.insert(HttpRoute {
                                use_case: descriptor.name.clone(),
                                method: http.method,
                                path: http.path.clone(),
                                handler,
                            });
                        }
                    }
                }
                TriggerDescriptor::Socket(socket) => {
                    let key = (socket.namespace().to_owned(), socket.event.clone());
                    match table.socket.entry(key) {
                        Entry::Occupied(existing) => {
                            return Err(RegistrationError::Conflict {
                                address: socket.label(),
                                first: existing.get().use_case.clone(),
                                second: descriptor.name.clone(),
                            });
                        }
                        Entry::Vacant(slot) => {
                            let handler = synthesize_socket(
                                &descriptor.name,
                                descriptor.use_case.clone(),
                                socket,
                            )?;
                            slot.insert(SocketRoute {
                                use_case: descriptor.name.clone(),
                                namespace: socket.namespace().to_owned(),
                                event: socket.event.clone(),
                                handler,
                            });
                        }
                    }
                }
            }
        }
    }

    Ok(table)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

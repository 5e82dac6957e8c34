//! Wires descriptors into both serving runtimes at once.
//!
//! [`ServiceRuntime`] forwards HTTP routes to the axum [`HttpRuntime`] and
//! socket routes to the [`SocketDispatcher`], so a single registration pass
//! covers both transports and a conflict anywhere aborts everything before a
//! listener is bound.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Router;
use trigger_core::{
    CorsPolicy, HttpRoute, Registrar, RegistrationError, RegistrationSummary, ServingRuntime,
    SocketRoute, UseCaseDescriptor,
};

use crate::application::SocketDispatcher;
use crate::infrastructure::http_server::HttpRuntime;

/// Both transports, filled by one registration.
#[derive(Default)]
pub struct ServiceRuntime {
    pub http: HttpRuntime,
    pub sockets: SocketDispatcher,
}

impl ServingRuntime for ServiceRuntime {
    type Error = Infallible;

    fn register_http(&mut self, route: &HttpRoute) -> Result<(), Self::Error> {
        self.http.register_http(route)
    }

    fn register_socket(&mut self, route: &SocketRoute) -> Result<(), Self::Error> {
        self.sockets.register_socket(route)
    }
}

/// What the server needs to start listening.
pub struct BoundService {
    pub router: Router,
    pub sockets: Arc<SocketDispatcher>,
    pub summary: RegistrationSummary,
}

/// Registers `descriptors` and builds the HTTP router and socket dispatcher.
///
/// # Errors
///
/// [`RegistrationError`] for conflicts or malformed descriptors; nothing is
/// built in that case.
pub fn bind_service(
    descriptors: &[UseCaseDescriptor],
    cors: Option<CorsPolicy>,
) -> Result<BoundService, RegistrationError> {
    let mut runtime = ServiceRuntime::default();
    let summary = Registrar::new().register_all(descriptors, &mut runtime)?;

    Ok(BoundService {
        router: runtime.http.into_router(cors),
        sockets: Arc::new(runtime.sockets),
        summary,
    })
}

//! HTTP serving runtime on axum.
//!
//! [`HttpRuntime`] receives every [`HttpRoute`] from the registrar and turns
//! it into an axum method route.  Routes sharing a path are merged into one
//! `MethodRouter`, so `GET /items/{id}` and `DELETE /items/{id}` live on the
//! same axum path.
//!
//! # Per-request flow
//!
//! ```text
//! axum request ──extract──► InboundRequest ──synthesized handler──► HttpReply ──► axum response
//! ```
//!
//! Extraction is lenient on purpose: an undecodable query string or body is
//! recorded on the [`InboundRequest`] and reported by the resolver as a
//! validation failure, so the client gets the same JSON error shape as for
//! any other bad input.

use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::sync::Arc;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{Path, Query, Request, State};
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::{Method, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info};
use trigger_core::cors::HeaderPairs;
use trigger_core::{
    failure_reply, BodyDocument, CorsPolicy, Failure, HttpHandler, HttpMethod, HttpReply,
    HttpRoute, InboundRequest, ServingRuntime, SocketRoute,
};

// ── Runtime ───────────────────────────────────────────────────────────────────

/// Collects HTTP routes and builds the axum [`Router`].
#[derive(Default)]
pub struct HttpRuntime {
    paths: BTreeMap<String, MethodRouter>,
    routes: usize,
}

impl HttpRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route_count(&self) -> usize {
        self.routes
    }

    /// Builds the router: every bound route, a JSON 404 fallback, and the CORS
    /// layer when a policy is given.
    pub fn into_router(self, cors: Option<CorsPolicy>) -> Router {
        let mut router = Router::new();
        for (path, endpoint) in self.paths {
            router = router.route(&path, endpoint);
        }
        router = router.fallback(no_route);

        match cors {
            Some(policy) => {
                router.layer(middleware::from_fn_with_state(Arc::new(policy), apply_cors))
            }
            None => router,
        }
    }
}

impl ServingRuntime for HttpRuntime {
    type Error = Infallible;

    fn register_http(&mut self, route: &HttpRoute) -> Result<(), Self::Error> {
        let handler = route.handler.clone();
        let endpoint = self.paths.remove(&route.path).unwrap_or_default().on(
            method_filter(route.method),
            move |path: Option<Path<HashMap<String, String>>>,
                  uri: Uri,
                  headers: HeaderMap,
                  body: Bytes| {
                let handler = handler.clone();
                async move { call(handler, path, uri, headers, body).await }
            },
        );
        self.paths.insert(route.path.clone(), endpoint);
        self.routes += 1;
        Ok(())
    }

    fn register_socket(&mut self, _route: &SocketRoute) -> Result<(), Self::Error> {
        Ok(())
    }
}

fn method_filter(method: HttpMethod) -> MethodFilter {
    match method {
        HttpMethod::Get => MethodFilter::GET,
        HttpMethod::Post => MethodFilter::POST,
        HttpMethod::Put => MethodFilter::PUT,
        HttpMethod::Patch => MethodFilter::PATCH,
        HttpMethod::Delete => MethodFilter::DELETE,
        HttpMethod::Head => MethodFilter::HEAD,
        HttpMethod::Options => MethodFilter::OPTIONS,
    }
}

// ── Request / response conversion ─────────────────────────────────────────────

async fn call(
    handler: HttpHandler,
    path: Option<Path<HashMap<String, String>>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = inbound_request(path, &uri, &headers, &body);
    into_response(handler(request).await)
}

/// Reduces an axum request to what the resolver reads.
fn inbound_request(
    path: Option<Path<HashMap<String, String>>>,
    uri: &Uri,
    headers: &HeaderMap,
    body: &[u8],
) -> InboundRequest {
    let mut request = InboundRequest::new().with_body(BodyDocument::parse(body));

    if let Some(Path(params)) = path {
        for (name, value) in params {
            request = request.with_path_param(name, value);
        }
    }

    match Query::<Vec<(String, String)>>::try_from_uri(uri) {
        Ok(Query(pairs)) => {
            for (name, value) in pairs {
                request = request.with_query(name, value);
            }
        }
        Err(e) => request = request.with_query_error(e.body_text()),
    }

    for (name, value) in headers {
        // Non-UTF-8 header values cannot be typed parameters; skip them.
        if let Ok(value) = value.to_str() {
            request = request.with_header(name.as_str(), value);
        }
    }

    request
}

fn into_response(reply: HttpReply) -> Response {
    let (status, body) = reply.into_wire();
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response()
}

async fn no_route(method: Method, uri: Uri) -> Response {
    debug!("no route for {method} {}", uri.path());
    into_response(failure_reply(&Failure::not_found(format!(
        "no route for {method} {}",
        uri.path()
    ))))
}

// ── CORS ──────────────────────────────────────────────────────────────────────

/// Applies the service-wide CORS policy.  Preflights are answered here with
/// `204` and never reach a use case.
async fn apply_cors(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let origin = header_text(request.headers(), &header::ORIGIN);
    let requested = header_text(request.headers(), &header::ACCESS_CONTROL_REQUEST_METHOD);

    if request.method() == Method::OPTIONS && origin.is_some() && requested.is_some() {
        let mut response = StatusCode::NO_CONTENT.into_response();
        if let Some(headers) = policy.preflight_headers(origin.as_deref(), requested.as_deref()) {
            append_headers(&mut response, headers);
        }
        return response;
    }

    let mut response = next.run(request).await;
    append_headers(&mut response, policy.response_headers(origin.as_deref()));
    response
}

fn header_text(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

fn append_headers(response: &mut Response, pairs: HeaderPairs) {
    for (name, value) in pairs {
        if let Ok(value) = HeaderValue::from_str(&value) {
            response
                .headers_mut()
                .append(HeaderName::from_static(name), value);
        }
    }
}

// ── Serving ───────────────────────────────────────────────────────────────────

/// Serves `router` on `listener` until `shutdown` flips to `true`.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve_http(
    listener: TcpListener,
    router: Router,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let addr = listener.local_addr().context("HTTP listener has no local address")?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped");
    Ok(())
}

//! Use-case and trigger descriptors.
//!
//! Descriptors are the engine's input: built once at startup (usually from a
//! metadata file, see [`crate::metadata`]) and never mutated afterwards.
//!
//! ```text
//! UseCaseDescriptor "get_order"
//!   ├── use_case: Arc<dyn UseCase>
//!   └── triggers
//!         ├── Http   GET /orders/{id}       params: [id ← path]
//!         └── Socket "get_order" on "/"     params: [id ← socket_payload]
//! ```

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::outcome::Outcome;
use super::parameter::{ParameterSpec, ResolvedInput};

/// Namespace used by socket triggers that do not name one.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Event every socket failure is emitted on.
pub const ERROR_EVENT: &str = "error";

// ── HTTP method ───────────────────────────────────────────────────────────────

/// Error returned when a metadata file names a method the engine cannot route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported HTTP method '{0}'")]
pub struct UnknownMethod(pub String);

/// HTTP methods a trigger can bind to.
///
/// Parsed case-insensitively, so metadata may say `get` or `GET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Whether requests with this method conventionally carry a body.
    pub fn carries_body(self) -> bool {
        !matches!(self, Self::Get | Self::Head | Self::Options)
    }
}

impl FromStr for HttpMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(UnknownMethod(s.to_owned())),
        }
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = UnknownMethod;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HttpMethod> for String {
    fn from(method: HttpMethod) -> Self {
        method.as_str().to_owned()
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Triggers ──────────────────────────────────────────────────────────────────

/// An HTTP route exposing a use case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpTrigger {
    pub method: HttpMethod,
    pub path: String,
    #[serde(default)]
    pub params: Vec<ParameterSpec>,
}

impl HttpTrigger {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, spec: ParameterSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// `"GET /orders/{id}"`, used in logs and error messages.
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// A WebSocket event exposing a use case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketTrigger {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Event successful results are emitted on; defaults to `<event>:ok`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_event: Option<String>,
    #[serde(default)]
    pub params: Vec<ParameterSpec>,
}

impl SocketTrigger {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            namespace: None,
            success_event: None,
            params: Vec::new(),
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_success_event(mut self, event: impl Into<String>) -> Self {
        self.success_event = Some(event.into());
        self
    }

    pub fn with_param(mut self, spec: ParameterSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }

    pub fn success_event(&self) -> String {
        match &self.success_event {
            Some(event) => event.clone(),
            None => format!("{}:ok", self.event),
        }
    }

    /// `"event 'join_room' in namespace '/chat'"`, used in logs and errors.
    pub fn label(&self) -> String {
        format!("event '{}' in namespace '{}'", self.event, self.namespace())
    }
}

/// One network entry point of a use case.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerDescriptor {
    Http(HttpTrigger),
    Socket(SocketTrigger),
}

impl TriggerDescriptor {
    pub fn params(&self) -> &[ParameterSpec] {
        match self {
            Self::Http(t) => &t.params,
            Self::Socket(t) => &t.params,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Http(t) => t.label(),
            Self::Socket(t) => t.label(),
        }
    }
}

impl From<HttpTrigger> for TriggerDescriptor {
    fn from(trigger: HttpTrigger) -> Self {
        Self::Http(trigger)
    }
}

impl From<SocketTrigger> for TriggerDescriptor {
    fn from(trigger: SocketTrigger) -> Self {
        Self::Socket(trigger)
    }
}

// ── Use cases ─────────────────────────────────────────────────────────────────

/// A unit of business logic the engine can expose.
///
/// Implementations report their own failure kinds through
/// [`Outcome::Failure`].  Cancellation follows Rust futures: when the client
/// goes away the serving runtime drops the handler future, which drops the
/// `invoke` future with it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UseCase: Send + Sync {
    async fn invoke(&self, input: ResolvedInput) -> Outcome;
}

/// Adapter turning an async closure into a [`UseCase`].
pub struct FnUseCase<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> UseCase for FnUseCase<F>
where
    F: Fn(ResolvedInput) -> Fut + Send + Sync,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    async fn invoke(&self, input: ResolvedInput) -> Outcome {
        (self.f)(input).await
    }
}

/// Wraps an async closure as a shareable use case.
///
/// ```rust
/// use serde_json::json;
/// use trigger_core::{use_case_fn, Outcome};
///
/// let ping = use_case_fn(|_input| async { Outcome::success(json!("pong")) });
/// # let _ = ping;
/// ```
pub fn use_case_fn<F, Fut>(f: F) -> Arc<dyn UseCase>
where
    F: Fn(ResolvedInput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    Arc::new(FnUseCase { f })
}

/// A use case together with every trigger that exposes it.
#[derive(Clone)]
pub struct UseCaseDescriptor {
    pub name: String,
    pub use_case: Arc<dyn UseCase>,
    pub triggers: Vec<TriggerDescriptor>,
}

impl UseCaseDescriptor {
    pub fn new(name: impl Into<String>, use_case: Arc<dyn UseCase>) -> Self {
        Self {
            name: name.into(),
            use_case,
            triggers: Vec::new(),
        }
    }

    pub fn with_trigger(mut self, trigger: impl Into<TriggerDescriptor>) -> Self {
        self.triggers.push(trigger.into());
        self
    }
}

impl fmt::Debug for UseCaseDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UseCaseDescriptor")
            .field("name", &self.name)
            .field("triggers", &self.triggers)
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Cross-origin policy applied uniformly to every bound HTTP route.
//!
//! The policy is pure: it answers "which headers go on this response" and
//! leaves attaching them to the serving runtime.  Header names are returned in
//! lowercase, which every HTTP/1.1 and HTTP/2 stack accepts.
//!
//! # Rules
//!
//! - A request without an `Origin` header is not cross-origin: no headers.
//! - An origin the policy does not allow gets no headers (the browser then
//!   blocks the response).
//! - With credentials enabled the allowed origin is echoed back, never `*`,
//!   and `vary: origin` is added so caches keep per-origin copies.

use serde::{Deserialize, Serialize};

use crate::domain::HttpMethod;

pub const ALLOW_ORIGIN: &str = "access-control-allow-origin";
pub const ALLOW_METHODS: &str = "access-control-allow-methods";
pub const ALLOW_HEADERS: &str = "access-control-allow-headers";
pub const ALLOW_CREDENTIALS: &str = "access-control-allow-credentials";
pub const MAX_AGE: &str = "access-control-max-age";
pub const VARY: &str = "vary";

/// Which origins may call the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllowedOrigins {
    /// `"*"` in configuration.
    Any(AnyOrigin),
    List(Vec<String>),
}

/// Marker deserialized from the literal string `"*"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnyOrigin {
    #[serde(rename = "*")]
    Wildcard,
}

impl AllowedOrigins {
    pub fn any() -> Self {
        Self::Any(AnyOrigin::Wildcard)
    }

    pub fn list<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(origins.into_iter().map(Into::into).collect())
    }

    fn matches(&self, origin: &str) -> bool {
        match self {
            Self::Any(_) => true,
            Self::List(list) => list.iter().any(|allowed| allowed == origin),
        }
    }
}

/// One CORS policy for the whole service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    pub origins: AllowedOrigins,
    pub methods: Vec<HttpMethod>,
    pub headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age_secs: u64,
}

impl Default for CorsPolicy {
    /// Any origin, `Content-Type` and `Authorization` headers, credentials
    /// allowed, ten-minute preflight cache.
    fn default() -> Self {
        Self {
            origins: AllowedOrigins::any(),
            methods: vec![
                HttpMethod::Get,
                HttpMethod::Post,
                HttpMethod::Put,
                HttpMethod::Patch,
                HttpMethod::Delete,
                HttpMethod::Options,
            ],
            headers: vec!["Content-Type".to_owned(), "Authorization".to_owned()],
            allow_credentials: true,
            max_age_secs: 600,
        }
    }
}

pub type HeaderPairs = Vec<(&'static str, String)>;

impl CorsPolicy {
    pub fn allows_origin(&self, origin: &str) -> bool {
        self.origins.matches(origin)
    }

    /// Headers for an actual (non-preflight) response.
    ///
    /// Empty when `origin` is absent or not allowed.
    pub fn response_headers(&self, origin: Option<&str>) -> HeaderPairs {
        let Some(origin) = origin.filter(|o| self.allows_origin(o)) else {
            return Vec::new();
        };

        let mut headers = Vec::with_capacity(3);
        match (&self.origins, self.allow_credentials) {
            (AllowedOrigins::Any(_), false) => headers.push((ALLOW_ORIGIN, "*".to_owned())),
            _ => {
                headers.push((ALLOW_ORIGIN, origin.to_owned()));
                headers.push((VARY, "origin".to_owned()));
            }
        }
        if self.allow_credentials {
            headers.push((ALLOW_CREDENTIALS, "true".to_owned()));
        }
        headers
    }

    /// Headers for a preflight `OPTIONS` request, or `None` when the origin
    /// or the requested method is not allowed.
    pub fn preflight_headers(
        &self,
        origin: Option<&str>,
        requested_method: Option<&str>,
    ) -> Option<HeaderPairs> {
        let mut headers = self.response_headers(origin);
        if headers.is_empty() {
            return None;
        }
        if let Some(requested) = requested_method {
            let method = requested.parse::<HttpMethod>().ok()?;
            if !self.methods.contains(&method) {
                return None;
            }
        }

        let methods: Vec<&str> = self.methods.iter().map(|m| m.as_str()).collect();
        headers.push((ALLOW_METHODS, methods.join(", ")));
        headers.push((ALLOW_HEADERS, self.headers.join(", ")));
        headers.push((MAX_AGE, self.max_age_secs.to_string()));
        Some(headers)
    }
}

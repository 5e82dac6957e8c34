//! Server settings schema.
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! http_port = 8080
//!
//! [websocket]
//! enabled = true
//! port = 8081
//!
//! [cors]
//! enabled = true
//! origins = ["https://app.example"]   # empty or "*" means any origin
//!
//! [logging]
//! level = "info"
//!
//! [metadata]
//! path = "service.toml"
//! ```
//!
//! Every field has a serde default, so a missing file, a missing section and
//! a missing key all fall back to the same values.  Reading the file lives in
//! `infrastructure::config_store`; this module is plain data.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use trigger_core::domain::UnknownMethod;
use trigger_core::{AllowedOrigins, CorsPolicy, HttpMethod};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid {listener} listen address '{address}'")]
    InvalidAddress {
        listener: &'static str,
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("invalid [cors] method: {0}")]
    CorsMethod(#[from] UnknownMethod),
}

// ── Schema ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default)]
    pub server: HttpSection,
    #[serde(default)]
    pub websocket: WebSocketSection,
    #[serde(default)]
    pub cors: CorsSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub metadata: MetadataSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpSection {
    /// IP address both listeners bind to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSocketSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_ws_port")]
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorsSection {
    #[serde(default)]
    pub enabled: bool,
    /// Allowed origins.  Empty, or containing `"*"`, allows any origin.
    #[serde(default)]
    pub origins: Vec<String>,
    #[serde(default = "default_cors_methods")]
    pub methods: Vec<String>,
    #[serde(default = "default_cors_headers")]
    pub headers: Vec<String>,
    #[serde(default = "default_true")]
    pub supports_credentials: bool,
    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataSection {
    /// Service metadata file (`.toml` or `.json`).
    #[serde(default = "default_metadata_path")]
    pub path: PathBuf,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_ws_port() -> u16 {
    8081
}
fn default_cors_methods() -> Vec<String> {
    CorsPolicy::default()
        .methods
        .iter()
        .map(|m| m.as_str().to_string())
        .collect()
}
fn default_cors_headers() -> Vec<String> {
    CorsPolicy::default().headers
}
fn default_true() -> bool {
    true
}
fn default_max_age() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_metadata_path() -> PathBuf {
    PathBuf::from("service.toml")
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            http_port: default_http_port(),
        }
    }
}

impl Default for WebSocketSection {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_ws_port(),
        }
    }
}

impl Default for CorsSection {
    fn default() -> Self {
        Self {
            enabled: false,
            origins: Vec::new(),
            methods: default_cors_methods(),
            headers: default_cors_headers(),
            supports_credentials: default_true(),
            max_age_secs: default_max_age(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for MetadataSection {
    fn default() -> Self {
        Self {
            path: default_metadata_path(),
        }
    }
}

// ── Derived values ────────────────────────────────────────────────────────────

impl ServerSettings {
    /// # Errors
    ///
    /// [`SettingsError::InvalidAddress`] when `bind_address` is not an IP.
    pub fn http_addr(&self) -> Result<SocketAddr, SettingsError> {
        self.listen_addr("HTTP", self.server.http_port)
    }

    /// # Errors
    ///
    /// [`SettingsError::InvalidAddress`] when `bind_address` is not an IP.
    pub fn ws_addr(&self) -> Result<SocketAddr, SettingsError> {
        self.listen_addr("WebSocket", self.websocket.port)
    }

    fn listen_addr(&self, listener: &'static str, port: u16) -> Result<SocketAddr, SettingsError> {
        let address = format!("{}:{}", self.server.bind_address, port);
        address
            .parse()
            .map_err(|source| SettingsError::InvalidAddress {
                listener,
                address,
                source,
            })
    }

    /// The CORS policy to apply, or `None` when CORS is disabled.
    ///
    /// # Errors
    ///
    /// [`SettingsError::CorsMethod`] for a method name the engine cannot route.
    pub fn cors_policy(&self) -> Result<Option<CorsPolicy>, SettingsError> {
        let cors = &self.cors;
        if !cors.enabled {
            return Ok(None);
        }

        let origins = if cors.origins.is_empty() || cors.origins.iter().any(|o| o == "*") {
            AllowedOrigins::any()
        } else {
            AllowedOrigins::list(cors.origins.iter().cloned())
        };
        let methods = cors
            .methods
            .iter()
            .map(|m| m.parse::<HttpMethod>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(CorsPolicy {
            origins,
            methods,
            headers: cors.headers.clone(),
            allow_credentials: cors.supports_credentials,
            max_age_secs: cors.max_age_secs,
        }))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        // Arrange / Act
        let settings = ServerSettings::default();

        // Assert
        assert_eq!(settings.server.http_port, 8080);
        assert_eq!(settings.websocket.port, 8081);
        assert!(!settings.websocket.enabled);
        assert!(!settings.cors.enabled);
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.metadata.path, PathBuf::from("service.toml"));
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let settings: ServerSettings = toml::from_str("").unwrap();
        assert_eq!(settings, ServerSettings::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let settings: ServerSettings = toml::from_str("[server]\nhttp_port = 9000\n").unwrap();

        assert_eq!(settings.server.http_port, 9000);
        assert_eq!(settings.server.bind_address, "0.0.0.0");
    }

    #[test]
    fn test_cors_disabled_yields_no_policy() {
        assert_eq!(ServerSettings::default().cors_policy().unwrap(), None);
    }

    #[test]
    fn test_cors_policy_from_settings() {
        let mut settings = ServerSettings::default();
        settings.cors.enabled = true;
        settings.cors.origins = vec!["https://app.example".into()];
        settings.cors.methods = vec!["get".into(), "post".into()];

        let policy = settings.cors_policy().unwrap().unwrap();

        assert_eq!(policy.origins, AllowedOrigins::list(["https://app.example"]));
        assert_eq!(policy.methods, vec![HttpMethod::Get, HttpMethod::Post]);
        assert!(policy.allow_credentials);
        assert_eq!(policy.headers, ["Content-Type", "Authorization"]);
    }

    #[test]
    fn test_star_origin_means_any() {
        let mut settings = ServerSettings::default();
        settings.cors.enabled = true;
        settings.cors.origins = vec!["*".into()];

        let policy = settings.cors_policy().unwrap().unwrap();

        assert_eq!(policy.origins, AllowedOrigins::any());
    }

    #[test]
    fn test_unknown_cors_method_is_error() {
        let mut settings = ServerSettings::default();
        settings.cors.enabled = true;
        settings.cors.methods = vec!["BREW".into()];

        assert!(matches!(settings.cors_policy(), Err(SettingsError::CorsMethod(_))));
    }

    #[test]
    fn test_invalid_bind_address_is_error() {
        let mut settings = ServerSettings::default();
        settings.server.bind_address = "not-an-ip".into();

        let err = settings.http_addr().unwrap_err();

        assert!(err.to_string().contains("not-an-ip:8080"));
    }

    #[test]
    fn test_listen_addresses_share_bind_address() {
        let mut settings = ServerSettings::default();
        settings.server.bind_address = "127.0.0.1".into();

        assert_eq!(settings.http_addr().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(settings.ws_addr().unwrap().to_string(), "127.0.0.1:8081");
    }
}

//! Service metadata: the declarative description the descriptors come from.
//!
//! A metadata document names the service and lists its use cases, each with
//! the triggers that expose it.  Only `http` and `websocket` triggers are
//! bound; any other trigger type (`schedule`, `consumer`, …) belongs to some
//! other runtime and is skipped.
//!
//! ```toml
//! name = "orders"
//!
//! [use_cases.get_order]
//! description = "Fetch an order"
//!
//! [[use_cases.get_order.triggers]]
//! type = "http"
//! method = "GET"
//! path = "/orders/{id}"
//! params = [{ field = "id", source = "path", type = "integer", required = true }]
//! ```
//!
//! The schema is format-neutral `serde`; reading the file is the caller's job.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{HttpTrigger, SocketTrigger, TriggerDescriptor, UseCase, UseCaseDescriptor};

pub const HTTP_TRIGGER: &str = "http";
pub const WEBSOCKET_TRIGGER: &str = "websocket";

// ── Schema ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub use_cases: BTreeMap<String, UseCaseMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UseCaseMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub triggers: Vec<TriggerMetadata>,
}

/// One trigger entry.  `type` selects the shape of the remaining keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerMetadata {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("use case '{use_case}': malformed {kind} trigger #{index}: {source}")]
    MalformedTrigger {
        use_case: String,
        kind: String,
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl TriggerMetadata {
    pub fn is_bindable(&self) -> bool {
        matches!(self.kind.to_ascii_lowercase().as_str(), HTTP_TRIGGER | WEBSOCKET_TRIGGER)
    }

    /// Converts the entry into a descriptor trigger.
    ///
    /// Returns `Ok(None)` for trigger types this engine does not serve.  A
    /// websocket trigger without an `event` key listens on the use case name.
    ///
    /// # Errors
    ///
    /// `serde_json::Error` when the options do not fit the trigger type.
    pub fn to_descriptor(
        &self,
        use_case: &str,
    ) -> Result<Option<TriggerDescriptor>, serde_json::Error> {
        let mut options = self.options.clone();
        match self.kind.to_ascii_lowercase().as_str() {
            HTTP_TRIGGER => {
                let trigger: HttpTrigger = serde_json::from_value(Value::Object(options))?;
                Ok(Some(trigger.into()))
            }
            WEBSOCKET_TRIGGER => {
                options
                    .entry("event")
                    .or_insert_with(|| Value::String(use_case.to_owned()));
                let trigger: SocketTrigger = serde_json::from_value(Value::Object(options))?;
                Ok(Some(trigger.into()))
            }
            _ => Ok(None),
        }
    }
}

// ── Catalog ───────────────────────────────────────────────────────────────────

/// Application use-case implementations, by the name metadata refers to.
#[derive(Clone, Default)]
pub struct UseCaseCatalog {
    entries: BTreeMap<String, Arc<dyn UseCase>>,
}

impl UseCaseCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, use_case: Arc<dyn UseCase>) -> Self {
        self.insert(name, use_case);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, use_case: Arc<dyn UseCase>) {
        self.entries.insert(name.into(), use_case);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn UseCase>> {
        self.entries.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for UseCaseCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

// ── Binding ───────────────────────────────────────────────────────────────────

/// Builds descriptors for every use case in `metadata` that has an
/// implementation in `catalog`.
///
/// - A use case with no bindable trigger is left out silently.
/// - A use case with bindable triggers but no implementation is left out
///   with a warning.
/// - Triggers of other types are skipped with a debug log.
///
/// # Errors
///
/// [`MetadataError`] when a bindable trigger's options are malformed.
pub fn bind(
    metadata: &ServiceMetadata,
    catalog: &UseCaseCatalog,
) -> Result<Vec<UseCaseDescriptor>, MetadataError> {
    let mut descriptors = Vec::new();

    for (name, info) in &metadata.use_cases {
        if !info.triggers.iter().any(TriggerMetadata::is_bindable) {
            debug!(use_case = %name, "no http or websocket trigger; skipped");
            continue;
        }
        let Some(use_case) = catalog.get(name) else {
            warn!(
                use_case = %name,
                "use case implementation not found; its triggers are not bound"
            );
            continue;
        };

        let mut descriptor = UseCaseDescriptor::new(name.as_str(), use_case);
        for (index, trigger) in info.triggers.iter().enumerate() {
            match trigger.to_descriptor(name) {
                Ok(Some(bound)) => descriptor.triggers.push(bound),
                Ok(None) => debug!(
                    use_case = %name,
                    kind = %trigger.kind,
                    "trigger type not served here; skipped"
                ),
                Err(source) => {
                    return Err(MetadataError::MalformedTrigger {
                        use_case: name.clone(),
                        kind: trigger.kind.clone(),
                        index,
                        source,
                    })
                }
            }
        }
        descriptors.push(descriptor);
    }

    Ok(descriptors)
}

//! Loads [`ServerSettings`] from a TOML file.
//!
//! A missing file is not an error: the server runs on defaults, the same way
//! a first start with no configuration would.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::domain::ServerSettings;

#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("I/O error reading settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Reads settings from `path`, or returns defaults if the file does not exist.
///
/// # Errors
///
/// [`ConfigStoreError::Io`] for file-system errors other than "not found",
/// [`ConfigStoreError::Parse`] for malformed TOML.
pub fn load_settings(path: &Path) -> Result<ServerSettings, ConfigStoreError> {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).map_err(|source| ConfigStoreError::Parse {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no settings file at {}; using defaults", path.display());
            Ok(ServerSettings::default())
        }
        Err(source) => Err(ConfigStoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

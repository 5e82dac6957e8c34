//! Reads a [`ServiceMetadata`] document from disk.
//!
//! The format follows the file extension: `.json` is parsed as JSON, anything
//! else as TOML.

use std::path::{Path, PathBuf};

use thiserror::Error;
use trigger_core::ServiceMetadata;

#[derive(Debug, Error)]
pub enum MetadataFileError {
    #[error("could not read service metadata at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML service metadata at {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid JSON service metadata at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Loads and parses the metadata file at `path`.
///
/// # Errors
///
/// See [`MetadataFileError`].  Unlike settings, a missing metadata file is an
/// error: there would be nothing to serve.
pub fn load_metadata(path: &Path) -> Result<ServiceMetadata, MetadataFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| MetadataFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_metadata(path, &content)
}

/// Parses metadata text, choosing the format from `path`'s extension.
///
/// # Errors
///
/// [`MetadataFileError::Toml`] or [`MetadataFileError::Json`].
pub fn parse_metadata(path: &Path, content: &str) -> Result<ServiceMetadata, MetadataFileError> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(content).map_err(|source| MetadataFileError::Json {
            path: path.to_path_buf(),
            source,
        })
    } else {
        toml::from_str(content).map_err(|source| MetadataFileError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }
}

//! Structured document files
//!
//! Reference schemas and snapshots may be written as TOML, YAML or JSON; the
//! file extension picks the format.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Toml,
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Format for `path`, or `None` when the extension is not a document type
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        match extension.as_str() {
            "toml" => Some(DocumentFormat::Toml),
            "yaml" | "yml" => Some(DocumentFormat::Yaml),
            "json" => Some(DocumentFormat::Json),
            _ => None,
        }
    }
}

/// Parse a document in the given format
pub fn parse_document<T: DeserializeOwned>(content: &str, format: DocumentFormat) -> Result<T> {
    match format {
        DocumentFormat::Toml => Ok(toml::from_str(content)?),
        DocumentFormat::Yaml => Ok(serde_yaml::from_str(content)?),
        DocumentFormat::Json => Ok(serde_json::from_str(content)?),
    }
}

/// Read and parse a document file
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = DocumentFormat::from_path(path).ok_or_else(|| {
        Error::ConfigError(format!("Unsupported document type: {}", path.display()))
    })?;

    let content = fs::read_to_string(path)?;
    parse_document(&content, format).map_err(|e| match e {
        Error::ConfigError(message) | Error::SerializationError(message) => {
            Error::ConfigError(format!("Failed to parse {}: {}", path.display(), message))
        }
        other => other,
    })
}

/// Serialize `value` into a document file, creating parent directories
pub fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let format = DocumentFormat::from_path(path).ok_or_else(|| {
        Error::ConfigError(format!("Unsupported document type: {}", path.display()))
    })?;

    let content = match format {
        DocumentFormat::Toml => toml::to_string_pretty(value)
            .map_err(|e| Error::SerializationError(e.to_string()))?,
        DocumentFormat::Yaml => serde_yaml::to_string(value)?,
        DocumentFormat::Json => serde_json::to_string_pretty(value)?,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content)?;
    Ok(())
}

//! Concrete [`ConfigSource`](super::ConfigSource) implementations.
//!
//! Formats are selected by file extension and gated by feature flags.
//! [`for_path`] builds a [`FileSource`] for `idgate run`, while
//! [`parse_config_str`] parses in-memory content for `idgate validate`.

pub mod file_source;

use std::path::Path;

use file_source::{Deserializer, FileSource};

use crate::config::model::Config;
use crate::error::IdgateError;

#[cfg(feature = "yaml")]
fn from_yaml(content: &str) -> Result<Config, Box<dyn std::error::Error + Send + Sync>> {
    Ok(serde_yml::from_str(content)?)
}

#[cfg(feature = "json")]
fn from_json(content: &str) -> Result<Config, Box<dyn std::error::Error + Send + Sync>> {
    Ok(serde_json::from_str(content)?)
}

#[cfg(feature = "toml")]
fn from_toml(content: &str) -> Result<Config, Box<dyn std::error::Error + Send + Sync>> {
    Ok(toml::from_str(content)?)
}

/// Source name and deserializer for a file extension.
fn deserializer_for(ext: &str) -> Result<(&'static str, Deserializer), IdgateError> {
    let found: (&'static str, Deserializer) = match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => ("yaml", from_yaml as Deserializer),

        #[cfg(feature = "json")]
        "json" => ("json", from_json as Deserializer),

        #[cfg(feature = "toml")]
        "toml" => ("toml", from_toml as Deserializer),

        other => return Err(IdgateError::UnsupportedFormat(other.to_string())),
    };
    Ok(found)
}

/// File source for `path`, chosen by its extension.
pub fn for_path(path: &Path) -> Result<FileSource, IdgateError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let (name, deserialize) = deserializer_for(ext)?;
    Ok(FileSource::new(path.to_path_buf(), name, deserialize))
}

/// Parse a config string based on file extension.
pub fn parse_config_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<Config, IdgateError> {
    let (_, deserialize) = deserializer_for(ext)?;
    deserialize(content).map_err(|source| IdgateError::ConfigParse {
        path: path_display.to_string(),
        source,
    })
}

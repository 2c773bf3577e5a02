//! Generic async file-based config source.
//!
//! [`FileSource`] implements [`ConfigSource`] for any file format by
//! accepting a deserialization function at construction time. It reads the
//! file with Tokio, validates the result, and hashes the raw content so
//! `/health` can report which revision of the file is running.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::config::model::Config;
use crate::config::validation::validate;
use crate::config::{ConfigSource, ConfigVersion};
use crate::error::IdgateError;
use crate::hash::sha256_hex;

/// Parses raw file content into a [`Config`].
pub type Deserializer = fn(&str) -> Result<Config, Box<dyn std::error::Error + Send + Sync>>;

pub struct FileSource {
    path: PathBuf,
    name: &'static str,
    deserialize: Deserializer,
}

impl FileSource {
    #[must_use]
    pub fn new(path: PathBuf, name: &'static str, deserialize: Deserializer) -> Self {
        Self {
            path,
            name,
            deserialize,
        }
    }

    async fn read_content(&self) -> Result<String, IdgateError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IdgateError::ConfigFileNotFound {
                    path: self.path.clone(),
                }
            } else {
                IdgateError::Io(e)
            }
        })
    }
}

#[async_trait]
impl ConfigSource for FileSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn load(&self) -> Result<(Config, ConfigVersion), IdgateError> {
        let content = self.read_content().await?;

        let config = (self.deserialize)(&content).map_err(|e| IdgateError::ConfigParse {
            path: self.path.display().to_string(),
            source: e,
        })?;

        if let Err(errors) = validate(&config) {
            return Err(IdgateError::ConfigValidation { errors });
        }

        let hash = sha256_hex(content.as_bytes());
        Ok((config, ConfigVersion::Hash(hash)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_source(path: PathBuf) -> FileSource {
        FileSource::new(path, "json", |content| {
            serde_json::from_str::<Config>(content)
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
        })
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("idgate-{}-{name}", std::process::id()))
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let source = json_source(temp_path("missing.json"));
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, IdgateError::ConfigFileNotFound { .. }));
    }

    #[tokio::test]
    async fn loads_and_hashes_content() {
        let path = temp_path("valid.json");
        let content = r#"{"identity": {"strategy": "random", "id_length": 8}}"#;
        tokio::fs::write(&path, content).await.unwrap();

        let (config, version) = json_source(path.clone()).load().await.unwrap();
        assert_eq!(config.identity.id_length, Some(8));
        assert_eq!(version, ConfigVersion::Hash(sha256_hex(content.as_bytes())));

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn invalid_identity_fails_validation() {
        let path = temp_path("invalid.json");
        tokio::fs::write(&path, r#"{"identity": {"id_length": 8}}"#)
            .await
            .unwrap();

        let err = json_source(path.clone()).load().await.unwrap_err();
        assert!(matches!(err, IdgateError::ConfigValidation { .. }));

        tokio::fs::remove_file(&path).await.unwrap();
    }
}

//! Configuration loading and validation.
//!
//! Defines the [`ConfigSource`] trait for pluggable config backends and the
//! [`ConfigVersion`] enum reported by `/health`. Submodules provide the
//! data model, validation logic, and concrete source implementations.
//!
//! Configuration is read once at startup; the identity settings derived
//! from it are immutable for the life of the process.

pub mod model;
pub mod sources;
pub mod validation;

use async_trait::async_trait;

use crate::error::IdgateError;
use model::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigVersion {
    Hash(String),
}

impl ConfigVersion {
    /// First 8 characters of the content hash.
    #[must_use]
    pub fn short(&self) -> &str {
        match self {
            Self::Hash(h) => h.get(..8).unwrap_or(h),
        }
    }
}

// async_trait is required here because ConfigSource is used as Box<dyn ConfigSource>
// and native async fn in traits (Rust 1.75+) does not support dyn dispatch.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn load(&self) -> Result<(Config, ConfigVersion), IdgateError>;
}

//! Request ID generation.
//!
//! Two strategies share the [`GeneratedId`] output type:
//!
//! - [`deterministic_id`] hashes the canonical
//!   `"{timestamp_ns}-{remote_addr}-{user_id}-{method}-{url}"` string with
//!   SHA-256 and returns all 64 lowercase hex characters.
//! - [`random_id`] draws a fresh value from an [`IdSource`], keeps the first
//!   `id_length` characters and optionally prepends `"{prefix}-"`.
//!
//! # Truncation
//!
//! [`UuidSource`] yields the 32-character simple form of a UUID v4, which
//! carries 122 random bits (the version and variant nibbles are fixed and
//! sit at positions 12 and 16). The first 8 characters carry 32 random bits:
//! by the birthday bound a 50% chance of at least one collision is reached
//! after roughly 77,000 IDs, so lengths below 16 only suit low-volume
//! deployments where IDs are correlated within a short time window.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::hash::sha256_hex;

/// Longest ID a [`UuidSource`] can produce.
pub const MAX_ID_LENGTH: usize = 32;

/// Length used by the random strategy when none is configured.
pub const DEFAULT_ID_LENGTH: usize = MAX_ID_LENGTH;

/// Below this length a warning is logged when the middleware is built.
pub const SHORT_ID_WARN_LENGTH: usize = 16;

/// Identifier computed once per request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeneratedId(Arc<str>);

impl GeneratedId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GeneratedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for GeneratedId {
    fn from(s: String) -> Self {
        Self(s.into())
    }
}

/// Request attributes hashed by the deterministic strategy.
#[derive(Debug, Clone, Copy)]
pub struct IdInputs<'a> {
    pub timestamp_ns: u128,
    pub remote_addr: &'a str,
    pub user_id: &'a str,
    pub method: &'a str,
    pub url: &'a str,
}

impl IdInputs<'_> {
    #[must_use]
    pub fn canonical(&self) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            self.timestamp_ns, self.remote_addr, self.user_id, self.method, self.url
        )
    }
}

#[must_use]
pub fn deterministic_id(inputs: &IdInputs<'_>) -> GeneratedId {
    GeneratedId::from(sha256_hex(inputs.canonical().as_bytes()))
}

/// Source of fresh random identifiers.
///
/// Shared by every in-flight request, so implementations must be usable
/// concurrently without external locking.
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> String;
}

/// UUID v4 in 32-character lowercase hex form, backed by the OS RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidSource;

impl IdSource for UuidSource {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

#[must_use]
pub fn random_id(
    source: &dyn IdSource,
    id_length: Option<usize>,
    prefix: Option<&str>,
) -> GeneratedId {
    let raw = source.next_id();
    let len = id_length.filter(|len| *len > 0).unwrap_or(DEFAULT_ID_LENGTH);
    let truncated = raw
        .char_indices()
        .nth(len)
        .map_or(raw.as_str(), |(end, _)| &raw[..end]);

    match prefix {
        Some(prefix) => GeneratedId::from(format!("{prefix}-{truncated}")),
        None => GeneratedId::from(truncated.to_string()),
    }
}

/// Wall clock reading in nanoseconds since the Unix epoch.
pub type Clock = fn() -> u128;

/// Reads [`SystemTime::now`]. A clock set before the epoch reads as 0.
#[must_use]
pub fn system_clock() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos())
}

//! Serde data structures for the idgate configuration file.
//!
//! Contains [`Config`] (the root), [`IdentityConfig`], [`Strategy`] and
//! [`Upstream`]. All types derive `Serialize` and `Deserialize` with
//! `deny_unknown_fields` for strict parsing.

use serde::{Deserialize, Serialize};

pub const DEFAULT_ID_HEADER: &str = "X-Unique-ID";

const fn default_timeout() -> u64 {
    5000
}

const fn default_true() -> bool {
    true
}

fn default_header() -> String {
    DEFAULT_ID_HEADER.to_string()
}

fn is_default_timeout(v: &u64) -> bool {
    *v == default_timeout()
}

fn is_default_header(v: &str) -> bool {
    v == DEFAULT_ID_HEADER
}

fn is_true(v: &bool) -> bool {
    *v
}

fn is_false(v: &bool) -> bool {
    !*v
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Static value appended as `X-Extra-Info` on every response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_info: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<Upstream>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// SHA-256 over the request attributes.
    #[default]
    Deterministic,
    /// UUID v4, optionally truncated and prefixed.
    Random,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deterministic => f.write_str("deterministic"),
            Self::Random => f.write_str("random"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enabled: bool,

    #[serde(default)]
    pub strategy: Strategy,

    /// Request header the generated ID is written to.
    #[serde(default = "default_header", skip_serializing_if = "is_default_header")]
    pub header: String,

    /// Request header holding the caller's user ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id_header: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub log_requests: bool,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub mirror_response: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            strategy: Strategy::default(),
            header: default_header(),
            user_id_header: None,
            id_length: None,
            prefix: None,
            log_requests: false,
            mirror_response: default_true(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Upstream {
    pub url: String,

    #[serde(
        default = "default_timeout",
        skip_serializing_if = "is_default_timeout"
    )]
    pub timeout: u64,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub forward_headers: bool,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub proxy_headers: bool,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub strip_hop_by_hop: bool,
}

impl Upstream {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: default_timeout(),
            forward_headers: default_true(),
            proxy_headers: default_true(),
            strip_hop_by_hop: default_true(),
        }
    }
}

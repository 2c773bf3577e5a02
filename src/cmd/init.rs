//! `idgate init`: generate a starter configuration file.
//!
//! Creates a YAML, JSON, or TOML config file with either minimal
//! or fully documented templates.

use std::path::PathBuf;

use crate::cli::{ConfigFormat, InitArgs};
use crate::error::IdgateError;

pub fn execute(args: &InitArgs) -> Result<(), IdgateError> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("idgate.{}", args.format.extension())));

    if output.exists() {
        return Err(IdgateError::FileExists { path: output });
    }

    std::fs::write(&output, template(&args.format, args.full))?;
    println!("Created {}", output.display());
    Ok(())
}

#[must_use]
pub const fn template(format: &ConfigFormat, full: bool) -> &'static str {
    match (format, full) {
        (ConfigFormat::Yaml, false) => YAML_MINIMAL,
        (ConfigFormat::Yaml, true) => YAML_FULL,
        (ConfigFormat::Json, false) => JSON_MINIMAL,
        (ConfigFormat::Json, true) => JSON_FULL,
        (ConfigFormat::Toml, false) => TOML_MINIMAL,
        (ConfigFormat::Toml, true) => TOML_FULL,
    }
}

const YAML_MINIMAL: &str = r#"# idgate config

identity:
  strategy: deterministic
  log_requests: true

upstream:
  url: "http://localhost:8080"
"#;

const YAML_FULL: &str = r#"# idgate config
#
# All values shown are defaults unless noted. Uncomment and modify as needed.

identity:
  # enabled: true                  # Install the request ID middleware
  # strategy: deterministic        # deterministic (sha-256) | random (uuid v4)
  # header: "X-Unique-ID"          # Request header the ID is written to
  # user_id_header: "X-User-ID"    # Hashed into deterministic IDs; "anonymous" if absent
  # id_length: 32                  # random only, 1..=32; below 16 collides quickly
  # prefix: "req"                  # random only, output is "req-<id>"
  # log_requests: false            # One structured record per request
  # mirror_response: true          # Copy the ID onto the response header

# extra_info: "served by idgate"   # Appended as X-Extra-Info on every response

# Omit to answer every request locally with its identity as JSON
upstream:
  url: "http://localhost:8080"
  # timeout: 5000                  # Upstream timeout in ms
  # forward_headers: true          # Forward client headers upstream
  # proxy_headers: true            # Add X-Forwarded-*, Via headers
  # strip_hop_by_hop: true         # Strip Connection, TE, etc.
"#;

const JSON_MINIMAL: &str = r#"{
  "identity": {
    "strategy": "deterministic",
    "log_requests": true
  },
  "upstream": {
    "url": "http://localhost:8080"
  }
}
"#;

const JSON_FULL: &str = r#"{
  "identity": {
    "enabled": true,
    "strategy": "random",
    "header": "Req-ID",
    "user_id_header": "X-User-ID",
    "id_length": 32,
    "prefix": "req",
    "log_requests": false,
    "mirror_response": true
  },
  "extra_info": "served by idgate",
  "upstream": {
    "url": "http://localhost:8080",
    "timeout": 5000,
    "forward_headers": true,
    "proxy_headers": true,
    "strip_hop_by_hop": true
  }
}
"#;

const TOML_MINIMAL: &str = r#"# idgate config

[identity]
strategy = "deterministic"
log_requests = true

[upstream]
url = "http://localhost:8080"
"#;

const TOML_FULL: &str = r#"# idgate config
#
# All values shown are defaults unless noted. Uncomment and modify as needed.

# extra_info = "served by idgate"  # Appended as X-Extra-Info on every response

[identity]
# enabled = true
# strategy = "deterministic"       # deterministic | random
# header = "X-Unique-ID"
# user_id_header = "X-User-ID"
# id_length = 32                   # random only, 1..=32
# prefix = "req"                   # random only
# log_requests = false
# mirror_response = true

[upstream]
url = "http://localhost:8080"
# timeout = 5000
# forward_headers = true
# proxy_headers = true
# strip_hop_by_hop = true
"#;

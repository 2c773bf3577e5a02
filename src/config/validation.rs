//! Configuration validation with detailed error reporting.
//!
//! The [`validate`] function checks a parsed [`Config`] for errors the
//! type system cannot catch: bad header names, identity options that do
//! not apply to the chosen strategy, out-of-range ID lengths, header-unsafe
//! values, and malformed upstream URLs. Returns a list of
//! [`ValidationError`] values with per-field suggestions.

use http::HeaderValue;
use url::Url;

use super::model::{Config, Strategy};
use crate::error::ValidationError;
use crate::middleware::generator::DEFAULT_ID_LENGTH;
use crate::middleware::IdentitySpec;

/// Validate a single upstream URL. Returns `Ok(())` or a human-readable error.
pub fn validate_upstream_url(url: &str) -> Result<(), String> {
    match Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            if scheme != "http" && scheme != "https" {
                Err(format!(
                    "unsupported scheme '{scheme}' (expected http or https)"
                ))
            } else if parsed.host_str().is_none() {
                Err(format!("'{url}' has no host"))
            } else {
                Ok(())
            }
        }
        Err(_) => Err(format!("'{url}' is not a valid URL")),
    }
}

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(identity_errors) = IdentitySpec::from_config(&config.identity) {
        errors.extend(identity_errors);
    }

    if let Some(ref message) = config.extra_info {
        if HeaderValue::from_str(message).is_err() {
            errors.push(
                ValidationError::new(
                    "(root)",
                    "extra_info",
                    "contains characters not allowed in a header value",
                )
                .with_suggestion("use printable ASCII without line breaks"),
            );
        }
    }

    if let Some(ref upstream) = config.upstream {
        if let Err(msg) = validate_upstream_url(&upstream.url) {
            let suggestion = (!upstream.url.contains("://"))
                .then(|| format!("did you mean 'http://{}'?", upstream.url));
            let mut error = ValidationError::new("upstream", "url", msg);
            error.suggestion = suggestion;
            errors.push(error);
        }
        if upstream.timeout == 0 {
            errors.push(ValidationError::new(
                "upstream",
                "timeout",
                "must be greater than 0",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[must_use]
pub fn format_validation_report(path: &str, config: &Config) -> String {
    let identity = &config.identity;
    let mut lines = Vec::new();

    if identity.enabled {
        let detail = match identity.strategy {
            Strategy::Deterministic => "sha-256, 64 hex chars".to_string(),
            Strategy::Random => {
                let len = identity.id_length.unwrap_or(DEFAULT_ID_LENGTH);
                identity.prefix.as_ref().map_or_else(
                    || format!("uuid, {len} chars"),
                    |p| format!("uuid, {len} chars, prefix '{p}'"),
                )
            }
        };
        lines.push(format!(
            "  identity: {} ({detail}) -> {}",
            identity.strategy, identity.header
        ));
        lines.push(format!(
            "    user id header: {}",
            identity.user_id_header.as_deref().unwrap_or("(none, anonymous)")
        ));
        lines.push(format!(
            "    log requests: {}, mirror response: {}",
            identity.log_requests, identity.mirror_response
        ));
    } else {
        lines.push("  identity: disabled".to_string());
    }

    if let Some(ref message) = config.extra_info {
        lines.push(format!("  extra info: {message}"));
    }

    match config.upstream {
        Some(ref upstream) => lines.push(format!(
            "  upstream: {} (timeout {}ms)",
            upstream.url, upstream.timeout
        )),
        None => lines.push("  upstream: none (echo mode)".to_string()),
    }

    format!("{} is valid\n{}", path, lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{IdentityConfig, Upstream};

    fn minimal_config() -> Config {
        Config {
            upstream: Some(Upstream::new("http://localhost:8080")),
            ..Config::default()
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate(&minimal_config()).is_ok());
    }

    #[test]
    fn empty_config_passes() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn identity_errors_are_reported() {
        let config = Config {
            identity: IdentityConfig {
                id_length: Some(8),
                ..IdentityConfig::default()
            },
            ..minimal_config()
        };
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].section, "identity");
    }

    #[test]
    fn invalid_url_fails() {
        let config = Config {
            upstream: Some(Upstream::new("not a url")),
            ..Config::default()
        };
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors[0].field, "url");
    }

    #[test]
    fn url_without_scheme_gets_suggestion() {
        let config = Config {
            upstream: Some(Upstream::new("backend:8080")),
            ..Config::default()
        };
        let errors = validate(&config).unwrap_err();
        assert_eq!(
            errors[0].suggestion.as_deref(),
            Some("did you mean 'http://backend:8080'?")
        );
    }

    #[test]
    fn unsupported_scheme_fails() {
        assert!(validate_upstream_url("ftp://files.example.com").is_err());
        assert!(validate_upstream_url("https://api.example.com").is_ok());
    }

    #[test]
    fn zero_timeout_fails() {
        let mut upstream = Upstream::new("http://localhost:8080");
        upstream.timeout = 0;
        let config = Config {
            upstream: Some(upstream),
            ..Config::default()
        };
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors[0].field, "timeout");
    }

    #[test]
    fn extra_info_with_newline_fails() {
        let config = Config {
            extra_info: Some("line\nbreak".into()),
            ..Config::default()
        };
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors[0].field, "extra_info");
    }

    #[test]
    fn report_describes_random_strategy() {
        let config = Config {
            identity: IdentityConfig {
                strategy: Strategy::Random,
                id_length: Some(8),
                prefix: Some("req".into()),
                ..IdentityConfig::default()
            },
            ..minimal_config()
        };
        let report = format_validation_report("idgate.yaml", &config);
        assert!(report.starts_with("idgate.yaml is valid"));
        assert!(report.contains("random (uuid, 8 chars, prefix 'req') -> X-Unique-ID"));
        assert!(report.contains("upstream: http://localhost:8080"));
    }
}

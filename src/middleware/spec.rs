//! Resolved identity settings.
//!
//! [`IdentitySpec::from_config`] turns the `identity` section of the config
//! file into typed header names and checks every option, so a bad value
//! stops startup instead of surfacing per request.

use http::{HeaderName, HeaderValue};

use super::generator::MAX_ID_LENGTH;
use crate::config::model::{IdentityConfig, Strategy, DEFAULT_ID_HEADER};
use crate::error::ValidationError;

const SECTION: &str = "identity";

/// Immutable middleware configuration.
#[derive(Debug, Clone)]
pub struct IdentitySpec {
    /// Request (and mirrored response) header carrying the ID.
    pub header: HeaderName,
    pub user_id_header: Option<HeaderName>,
    pub strategy: Strategy,
    /// Random strategy only.
    pub id_length: Option<usize>,
    /// Random strategy only.
    pub prefix: Option<String>,
    pub log_enabled: bool,
    pub mirror_response: bool,
}

impl Default for IdentitySpec {
    fn default() -> Self {
        Self {
            header: HeaderName::from_static("x-unique-id"),
            user_id_header: None,
            strategy: Strategy::Deterministic,
            id_length: None,
            prefix: None,
            log_enabled: false,
            mirror_response: true,
        }
    }
}

impl IdentitySpec {
    /// Random strategy with the given truncation and prefix.
    #[must_use]
    pub fn random(id_length: Option<usize>, prefix: Option<&str>) -> Self {
        Self {
            strategy: Strategy::Random,
            id_length,
            prefix: prefix.map(String::from),
            ..Self::default()
        }
    }

    pub fn from_config(config: &IdentityConfig) -> Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();

        let header = parse_header_name(&config.header, "header", &mut errors);
        let user_id_header = config
            .user_id_header
            .as_deref()
            .and_then(|name| parse_header_name(name, "user_id_header", &mut errors));

        if let Some(len) = config.id_length {
            if config.strategy == Strategy::Deterministic {
                errors.push(
                    ValidationError::new(
                        SECTION,
                        "id_length",
                        "only applies to the random strategy; deterministic IDs are never truncated",
                    )
                    .with_suggestion("remove id_length or set strategy: random"),
                );
            } else if len == 0 || len > MAX_ID_LENGTH {
                errors.push(
                    ValidationError::new(
                        SECTION,
                        "id_length",
                        format!("must be between 1 and {MAX_ID_LENGTH}, got {len}"),
                    )
                    .with_suggestion(format!("use {MAX_ID_LENGTH} to keep the full UUID")),
                );
            }
        }

        if let Some(ref prefix) = config.prefix {
            if config.strategy == Strategy::Deterministic {
                errors.push(
                    ValidationError::new(
                        SECTION,
                        "prefix",
                        "only applies to the random strategy",
                    )
                    .with_suggestion("remove prefix or set strategy: random"),
                );
            } else if prefix.is_empty() {
                errors.push(ValidationError::new(
                    SECTION,
                    "prefix",
                    "cannot be empty when set",
                ));
            } else if HeaderValue::from_str(prefix).is_err()
                || prefix.chars().any(char::is_whitespace)
            {
                errors.push(ValidationError::new(
                    SECTION,
                    "prefix",
                    format!("'{prefix}' is not a valid header value fragment"),
                ));
            }
        }

        match header {
            Some(header) if errors.is_empty() => Ok(Self {
                header,
                user_id_header,
                strategy: config.strategy,
                id_length: config.id_length,
                prefix: config.prefix.clone(),
                log_enabled: config.log_requests,
                mirror_response: config.mirror_response,
            }),
            _ => Err(errors),
        }
    }
}

fn parse_header_name(
    name: &str,
    field: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<HeaderName> {
    match name.parse::<HeaderName>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            errors.push(
                ValidationError::new(
                    SECTION,
                    field,
                    format!("'{name}' is not a valid header name"),
                )
                .with_suggestion(format!("e.g. '{DEFAULT_ID_HEADER}'")),
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_config() -> IdentityConfig {
        IdentityConfig {
            strategy: Strategy::Random,
            ..IdentityConfig::default()
        }
    }

    #[test]
    fn default_config_resolves() {
        let spec = IdentitySpec::from_config(&IdentityConfig::default()).unwrap();
        assert_eq!(spec.header, "x-unique-id");
        assert_eq!(spec.strategy, Strategy::Deterministic);
        assert!(spec.user_id_header.is_none());
        assert!(spec.mirror_response);
    }

    #[test]
    fn header_names_are_case_insensitive() {
        let config = IdentityConfig {
            header: "Req-ID".into(),
            user_id_header: Some("X-User-ID".into()),
            ..IdentityConfig::default()
        };
        let spec = IdentitySpec::from_config(&config).unwrap();
        assert_eq!(spec.header, "req-id");
        assert_eq!(spec.user_id_header.unwrap(), "x-user-id");
    }

    #[test]
    fn invalid_header_name_fails() {
        let config = IdentityConfig {
            header: "bad header".into(),
            ..IdentityConfig::default()
        };
        let errors = IdentitySpec::from_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "header");
    }

    #[test]
    fn id_length_rejected_for_deterministic() {
        let config = IdentityConfig {
            id_length: Some(8),
            ..IdentityConfig::default()
        };
        let errors = IdentitySpec::from_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "id_length");
    }

    #[test]
    fn id_length_out_of_range_fails() {
        for len in [0, 33] {
            let config = IdentityConfig {
                id_length: Some(len),
                ..random_config()
            };
            assert!(IdentitySpec::from_config(&config).is_err(), "length {len}");
        }
    }

    #[test]
    fn random_with_prefix_resolves() {
        let config = IdentityConfig {
            id_length: Some(8),
            prefix: Some("req".into()),
            log_requests: true,
            ..random_config()
        };
        let spec = IdentitySpec::from_config(&config).unwrap();
        assert_eq!(spec.id_length, Some(8));
        assert_eq!(spec.prefix.as_deref(), Some("req"));
        assert!(spec.log_enabled);
    }

    #[test]
    fn prefix_with_whitespace_fails() {
        let config = IdentityConfig {
            prefix: Some("my req".into()),
            ..random_config()
        };
        let errors = IdentitySpec::from_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "prefix");
    }

    #[test]
    fn all_errors_are_collected() {
        let config = IdentityConfig {
            header: "".into(),
            user_id_header: Some("no spaces allowed".into()),
            prefix: Some(String::new()),
            ..random_config()
        };
        let errors = IdentitySpec::from_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}

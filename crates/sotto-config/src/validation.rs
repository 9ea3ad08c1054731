// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as parseable bind addresses, positive gate limits, and
//! the production-secret check.

use crate::diagnostic::ConfigError;
use crate::model::{DEFAULT_SECRET, SottoConfig};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &SottoConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.server.bind.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.bind must not be empty".to_string(),
        });
    } else if config.server.bind.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ConfigError::Validation {
            message: format!(
                "server.bind `{}` is not a valid socket address (expected host:port)",
                config.server.bind
            ),
        });
    }

    if config.encryption.secret.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "encryption.secret must not be empty".to_string(),
        });
    }

    if config.encryption.secret == DEFAULT_SECRET && !config.encryption.allow_default_secret {
        errors.push(ConfigError::Validation {
            message: "encryption.secret is still the built-in default; set a real secret \
                      or set encryption.allow_default_secret = true for development"
                .to_string(),
        });
    }

    for (name, value) in [
        ("limits.per_ip", config.limits.per_ip),
        ("limits.per_conversation", config.limits.per_conversation),
        (
            "limits.max_concurrent_streams",
            config.limits.max_concurrent_streams,
        ),
    ] {
        if value == 0 {
            errors.push(ConfigError::Validation {
                message: format!("{name} must be at least 1, got 0"),
            });
        }
    }

    if config.limits.window_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "limits.window_secs must be at least 1, got 0".to_string(),
        });
    }

    if config.limits.sweep_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "limits.sweep_interval_secs must be at least 1, got 0".to_string(),
        });
    }

    for (name, value) in [
        ("upstream.base_url", &config.upstream.base_url),
        ("upstream.model", &config.upstream.model),
    ] {
        if value.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("{name} must not be empty"),
            });
        }
    }

    if let Some(base_url) = &config.store.base_url
        && !base_url.starts_with("http://")
        && !base_url.starts_with("https://")
    {
        errors.push(ConfigError::Validation {
            message: format!("store.base_url `{base_url}` must start with http:// or https://"),
        });
    }

    if !matches!(config.log.format.as_str(), "pretty" | "json") {
        errors.push(ConfigError::Validation {
            message: format!(
                "log.format must be `pretty` or `json`, got `{}`",
                config.log.format
            ),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Errors that block `sotto run` but not `sotto check-config`.
///
/// A config with no store URL or API key is valid (it check-configs and
/// print-configs fine), it just cannot serve.
pub fn validate_for_serve(config: &SottoConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.store.base_url.is_none() {
        errors.push(ConfigError::MissingKey {
            key: "store.base_url".to_string(),
        });
    }

    if config.upstream.api_key.is_none() {
        errors.push(ConfigError::MissingKey {
            key: "upstream.api_key".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./sotto.toml` > `~/.config/sotto/sotto.toml` >
//! `/etc/sotto/sotto.toml` with environment variable overrides via the
//! `SOTTO_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::SottoConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/sotto/sotto.toml` (system-wide)
/// 3. `~/.config/sotto/sotto.toml` (user XDG config)
/// 4. `./sotto.toml` (local directory)
/// 5. `SOTTO_*` environment variables
pub fn load_config() -> Result<SottoConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<SottoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SottoConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SottoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SottoConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for
/// diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SottoConfig::default()))
        .merge(Toml::file("/etc/sotto/sotto.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("sotto/sotto.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("sotto.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `SOTTO_LIMITS_PER_IP` must map to
/// `limits.per_ip`, not `limits.per.ip`.
fn env_provider() -> Env {
    Env::prefixed("SOTTO_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("encryption_", "encryption.", 1)
            .replacen("limits_", "limits.", 1)
            .replacen("upstream_", "upstream.", 1)
            .replacen("store_", "store.", 1)
            .replacen("log_", "log.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_str_applies_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.limits.per_conversation, 30);
        assert_eq!(config.upstream.model, "google/gemini-3-flash-preview");
    }

    #[test]
    fn file_values_override_defaults() {
        let config = load_config_from_str(
            r#"
[limits]
per_ip = 7

[server]
bind = "0.0.0.0:9000"
"#,
        )
        .unwrap();
        assert_eq!(config.limits.per_ip, 7);
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        // Untouched sections keep their defaults.
        assert_eq!(config.limits.per_conversation, 30);
    }

    #[test]
    fn env_overrides_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "sotto.toml",
                r#"
[limits]
per_ip = 7
"#,
            )?;
            jail.set_env("SOTTO_LIMITS_PER_IP", "3");
            jail.set_env("SOTTO_UPSTREAM_API_KEY", "env-key");

            let config: SottoConfig = Figment::new()
                .merge(Serialized::defaults(SottoConfig::default()))
                .merge(Toml::file("sotto.toml"))
                .merge(super::env_provider())
                .extract()?;

            assert_eq!(config.limits.per_ip, 3);
            assert_eq!(config.upstream.api_key.as_deref(), Some("env-key"));
            Ok(())
        });
    }

    #[test]
    fn env_mapping_preserves_underscored_keys() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SOTTO_LIMITS_MAX_CONCURRENT_STREAMS", "9");
            jail.set_env("SOTTO_STORE_SERVICE_KEY", "svc");

            let config: SottoConfig = Figment::new()
                .merge(Serialized::defaults(SottoConfig::default()))
                .merge(super::env_provider())
                .extract()?;

            assert_eq!(config.limits.max_concurrent_streams, 9);
            assert_eq!(config.store.service_key.as_deref(), Some("svc"));
            Ok(())
        });
    }

    #[test]
    fn load_from_path_reads_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sotto.toml");
        std::fs::write(&path, "[log]\nlevel = \"debug\"\n").unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.log.level, "debug");
    }
}

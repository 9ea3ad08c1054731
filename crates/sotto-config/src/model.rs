// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Sotto relay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// The development fallback secret. Serving with it is a validation error
/// unless explicitly allowed.
pub const DEFAULT_SECRET: &str = "sotto-default-secret-change-in-prod";

/// Top-level Sotto configuration.
///
/// Loaded from `sotto.toml` following the XDG hierarchy, with `SOTTO_*`
/// environment variable overrides. All sections default to sensible values;
/// `store.base_url` and `upstream.api_key` are required to actually serve.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SottoConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Payload encryption settings.
    #[serde(default)]
    pub encryption: EncryptionConfig,

    /// Rate-limit and concurrency gate settings.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Upstream completion gateway settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// External conversation store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `127.0.0.1:8787`.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Bearer token protecting the admin routes. `None` means admin routes
    /// reject every request (fail-closed).
    #[serde(default)]
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            admin_token: None,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

/// Payload encryption configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptionConfig {
    /// Shared secret for key derivation. Both the relay and the widget must
    /// hold the same value.
    #[serde(default = "default_secret")]
    pub secret: String,

    /// Allow serving with the built-in default secret. Development only.
    #[serde(default)]
    pub allow_default_secret: bool,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            allow_default_secret: false,
        }
    }
}

impl std::fmt::Display for EncryptionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EncryptionConfig {{ secret: [redacted] }}")
    }
}

fn default_secret() -> String {
    DEFAULT_SECRET.to_string()
}

/// Rate-limit and concurrency configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Max requests per caller IP per window.
    #[serde(default = "default_per_ip")]
    pub per_ip: u32,

    /// Max requests per conversation per window.
    #[serde(default = "default_per_conversation")]
    pub per_conversation: u32,

    /// Max simultaneously open upstream streams.
    #[serde(default = "default_max_concurrent_streams")]
    pub max_concurrent_streams: u32,

    /// Rolling window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Interval between sweeper passes over expired windows.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            per_ip: default_per_ip(),
            per_conversation: default_per_conversation(),
            max_concurrent_streams: default_max_concurrent_streams(),
            window_secs: default_window_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_per_ip() -> u32 {
    100
}

fn default_per_conversation() -> u32 {
    30
}

fn default_max_concurrent_streams() -> u32 {
    50
}

fn default_window_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    60
}

/// Upstream completion gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Gateway base URL.
    #[serde(default = "default_upstream_base_url")]
    pub base_url: String,

    /// Gateway API key. Required to serve.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier sent with every completion request.
    #[serde(default = "default_model")]
    pub model: String,

    /// System prompt prepended to every transcript.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Request timeout in seconds (covers the whole stream).
    #[serde(default = "default_upstream_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_base_url(),
            api_key: None,
            model: default_model(),
            system_prompt: default_system_prompt(),
            timeout_secs: default_upstream_timeout_secs(),
        }
    }
}

fn default_upstream_base_url() -> String {
    "https://ai.gateway.lovable.dev".to_string()
}

fn default_model() -> String {
    "google/gemini-3-flash-preview".to_string()
}

fn default_system_prompt() -> String {
    "You are a friendly and helpful customer support assistant. \
     Answer questions about the product concisely. If you cannot help, \
     offer to connect the customer with a human agent."
        .to_string()
}

fn default_upstream_timeout_secs() -> u64 {
    300
}

/// External conversation store configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Store base URL, e.g. `https://store.internal`. Required to serve.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Service key sent as the RPC bearer token.
    #[serde(default)]
    pub service_key: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_store_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_store_timeout_secs() -> u64 {
    30
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Log level directive (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl SottoConfig {
    /// The effective config with secrets replaced by a redaction marker,
    /// for `sotto print-config`.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.encryption.secret = "[redacted]".to_string();
        if copy.server.admin_token.is_some() {
            copy.server.admin_token = Some("[redacted]".to_string());
        }
        if copy.upstream.api_key.is_some() {
            copy.upstream.api_key = Some("[redacted]".to_string());
        }
        if copy.store.service_key.is_some() {
            copy.store.service_key = Some("[redacted]".to_string());
        }
        copy
    }
}

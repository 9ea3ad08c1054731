// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sotto run` command implementation.
//!
//! Wires the configured adapters together -- store client, upstream
//! completion client, rate limiter, Prometheus exporter, key ring -- and
//! hands them to the relay server.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use sotto_bus::EventBus;
use sotto_config::SottoConfig;
use sotto_config::model::LogConfig;
use sotto_core::SottoError;
use sotto_crypto::Keyring;
use sotto_limiter::RateLimiter;
use sotto_metrics::PrometheusExporter;
use sotto_relay::{AdminAuth, HealthState, RelayState};
use sotto_session::KeywordClassifier;
use sotto_store::StoreClient;
use sotto_upstream::CompletionClient;
use tracing::{info, warn};

/// Runs the `sotto run` command.
///
/// The caller has already run the serve-mode validation, so `store.base_url`
/// and `upstream.api_key` are present here.
pub async fn run(config: SottoConfig) -> Result<(), SottoError> {
    init_tracing(&config.log);

    info!(version = env!("CARGO_PKG_VERSION"), "starting sotto relay");

    let store_url = config
        .store
        .base_url
        .clone()
        .ok_or_else(|| SottoError::Config("store.base_url is required".to_string()))?;
    let store = Arc::new(StoreClient::new(
        store_url,
        config.store.service_key.as_deref(),
        Duration::from_secs(config.store.timeout_secs),
    )?);

    let api_key = config
        .upstream
        .api_key
        .clone()
        .ok_or_else(|| SottoError::Config("upstream.api_key is required".to_string()))?;
    let gateway = Arc::new(CompletionClient::new(
        config.upstream.base_url.clone(),
        &api_key,
        config.upstream.model.clone(),
        config.upstream.system_prompt.clone(),
        Duration::from_secs(config.upstream.timeout_secs),
    )?);

    let limiter = RateLimiter::new(
        config.limits.per_ip,
        config.limits.per_conversation,
        config.limits.max_concurrent_streams,
        Duration::from_secs(config.limits.window_secs),
    );
    limiter.spawn_sweeper(Duration::from_secs(config.limits.sweep_interval_secs));

    let mut health = HealthState::default();
    match PrometheusExporter::new() {
        Ok(exporter) => {
            let exporter = Arc::new(exporter);
            health.prometheus_render = Some(Arc::new(move || exporter.render()));
        }
        Err(e) => {
            // The relay serves without metrics rather than refusing to start.
            warn!(error = %e, "prometheus exporter unavailable");
        }
    }

    let keyring = Arc::new(Keyring::new(SecretString::from(
        config.encryption.secret.clone(),
    )));

    if config.server.admin_token.is_none() {
        warn!("server.admin_token not set -- admin routes will reject every request");
    }
    let auth = AdminAuth {
        admin_token: config.server.admin_token.clone(),
    };

    let state = RelayState {
        store,
        gateway,
        limiter,
        bus: EventBus::new(),
        classifier: Arc::new(KeywordClassifier),
        keyring,
        health,
    };

    sotto_relay::serve(&config.server.bind, state, auth).await
}

fn init_tracing(log: &LogConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("SOTTO_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("sotto={},warn", log.level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false);

    if log.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics for the Sotto relay.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. Metrics are
//! rendered as Prometheus text format via the `render()` method, which is
//! exposed through the relay's /metrics endpoint.

pub mod recording;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sotto_core::{HealthStatus, ServiceAdapter, SottoError};

pub use recording::{
    RequestOutcome, record_chunk, record_latency, record_rate_limited, record_request,
    record_stream_saturated, record_typing, set_active_streams,
};

/// Prometheus metrics exporter.
///
/// Installs the Prometheus recorder and exposes a handle for rendering
/// metrics in Prometheus text format.
pub struct PrometheusExporter {
    handle: PrometheusHandle,
}

impl PrometheusExporter {
    /// Install the Prometheus recorder globally.
    ///
    /// Only one recorder can be installed per process. Returns an error if
    /// a recorder is already installed.
    pub fn new() -> Result<Self, SottoError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            SottoError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();

        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl ServiceAdapter for PrometheusExporter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, SottoError> {
        Ok(HealthStatus::Healthy)
    }
}

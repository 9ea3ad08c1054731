// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait shared by all external-service clients.

use async_trait::async_trait;

use crate::error::SottoError;
use crate::types::HealthStatus;

/// The base trait for Sotto's external-service adapters.
///
/// Every adapter (store, completion gateway) implements this trait, which
/// provides identity and health check capabilities surfaced through the
/// relay's health endpoint.
#[async_trait]
pub trait ServiceAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, SottoError>;
}

// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A full relay server over mock adapters, bound to an ephemeral port.
//!
//! Scenario tests drive it with a real HTTP client so streaming responses,
//! headers, and status codes are exercised end to end.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sotto_bus::EventBus;
use sotto_crypto::{Envelope, Keyring, open_chunk, open_payload, seal_payload};
use sotto_limiter::RateLimiter;
use sotto_relay::{AdminAuth, HealthState, RelayState, build_router};
use sotto_session::KeywordClassifier;

use crate::mock_gateway::MockGateway;
use crate::mock_store::MockStore;

/// The shared encryption secret both harness and "widget" side derive from.
pub const TEST_SECRET: &str = "harness-shared-secret";

/// Bearer token accepted on the admin routes.
pub const TEST_ADMIN_TOKEN: &str = "harness-admin-token";

/// Gate settings for one harness instance.
#[derive(Debug, Clone, Copy)]
pub struct HarnessLimits {
    pub per_ip: u32,
    pub per_conversation: u32,
    pub max_concurrent_streams: u32,
}

impl Default for HarnessLimits {
    fn default() -> Self {
        Self {
            per_ip: 100,
            per_conversation: 30,
            max_concurrent_streams: 50,
        }
    }
}

/// A running relay over [`MockStore`] and [`MockGateway`].
pub struct RelayHarness {
    pub base_url: String,
    pub client: reqwest::Client,
    pub store: Arc<MockStore>,
    pub gateway: Arc<MockGateway>,
    pub bus: EventBus,
    keyring: Arc<Keyring>,
    server: tokio::task::JoinHandle<()>,
}

impl RelayHarness {
    /// Spawn a relay with default limits.
    pub async fn spawn() -> Self {
        Self::spawn_with_limits(HarnessLimits::default()).await
    }

    /// Spawn a relay with explicit gate settings.
    pub async fn spawn_with_limits(limits: HarnessLimits) -> Self {
        let store = Arc::new(MockStore::new());
        let gateway = Arc::new(MockGateway::new());
        let bus = EventBus::new();
        let keyring = Arc::new(Keyring::new(SecretString::from(TEST_SECRET.to_string())));

        let state = RelayState {
            store: store.clone(),
            gateway: gateway.clone(),
            limiter: RateLimiter::new(
                limits.per_ip,
                limits.per_conversation,
                limits.max_concurrent_streams,
                Duration::from_secs(3600),
            ),
            bus: bus.clone(),
            classifier: Arc::new(KeywordClassifier),
            keyring: keyring.clone(),
            health: HealthState::default(),
        };
        let auth = AdminAuth {
            admin_token: Some(TEST_ADMIN_TOKEN.to_string()),
        };

        let app = build_router(state, auth);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");

        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            store,
            gateway,
            bus,
            keyring,
            server,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Seal a request body the way the widget would, for `identifier`.
    pub fn seal<T: Serialize>(&self, value: &T, identifier: &str) -> Envelope {
        let key = self.keyring.derive_key(identifier);
        seal_payload(value, &key).expect("seal test payload")
    }

    /// Open a response envelope for `identifier`.
    pub fn open<T: DeserializeOwned>(&self, envelope: &Envelope, identifier: &str) -> T {
        let key = self.keyring.derive_key(identifier);
        open_payload(envelope, &key).expect("open test payload")
    }

    /// Open one streamed chunk token for `identifier`.
    pub fn open_chunk(&self, token: &str, identifier: &str) -> String {
        let key = self.keyring.derive_key(identifier);
        open_chunk(token, &key).expect("open test chunk")
    }

    /// Try to open one streamed chunk token; `Err` for corrupted tokens.
    pub fn try_open_chunk(
        &self,
        token: &str,
        identifier: &str,
    ) -> Result<String, sotto_core::SottoError> {
        let key = self.keyring.derive_key(identifier);
        open_chunk(token, &key)
    }
}

impl Drop for RelayHarness {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Split an SSE body into its `data:` payloads.
pub fn sse_data_lines(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(str::to_string)
        .collect()
}

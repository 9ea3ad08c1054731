// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Sotto integration tests.
//!
//! Provides mock adapters and a full-server harness for fast, deterministic,
//! CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockStore`] - in-memory conversation store with real token minting
//! - [`MockGateway`] - completion gateway with scripted streaming replies
//! - [`RelayHarness`] - the relay served over both mocks on an ephemeral port

pub mod harness;
pub mod mock_gateway;
pub mod mock_store;

pub use harness::{HarnessLimits, RelayHarness, TEST_ADMIN_TOKEN, TEST_SECRET, sse_data_lines};
pub use mock_gateway::{DEFAULT_REPLY, MockGateway};
pub use mock_store::MockStore;

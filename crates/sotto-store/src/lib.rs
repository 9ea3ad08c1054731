// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP RPC client for the external conversation store.
//!
//! The store exposes named RPCs as `POST {base}/rpc/{name}` with a JSON
//! object body and a service-key bearer token. This crate implements
//! [`ConversationStore`] over that contract; the relay never issues raw
//! queries.

mod client;

pub use client::StoreClient;

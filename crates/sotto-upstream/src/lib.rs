// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client for the upstream streaming completion gateway.
//!
//! The gateway speaks an OpenAI-compatible wire format:
//! `POST /v1/chat/completions` with `{model, messages, stream: true}`,
//! answered by SSE frames `data: {json}` carrying
//! `choices[0].delta.content` text deltas and terminated by `data: [DONE]`.
//! The relay treats the gateway as opaque beyond this contract.

mod client;
mod sse;

pub use client::CompletionClient;
pub use sse::parse_completion_stream;

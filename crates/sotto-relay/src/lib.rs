// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Sotto relay HTTP server.
//!
//! Routes, middleware, and the streaming pipeline tying the other crates
//! together: decrypt, admit, route between AI and human agent, relay the
//! upstream stream re-encrypted, and fan events out over SSE.

pub mod admin;
pub mod auth;
pub mod chat;
pub mod error;
pub mod extract;
pub mod health;
pub mod server;
pub mod sse;
pub mod state;
pub mod visitor;

pub use auth::AdminAuth;
pub use server::{build_router, serve};
pub use state::{HealthState, RelayState};

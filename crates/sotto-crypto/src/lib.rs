// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encryption primitives for the Sotto relay.
//!
//! Three layers, leaf-first:
//!
//! - [`kdf`]: derive a per-session AES-256 key from the shared secret and a
//!   caller identifier (user id, session token, or IP).
//! - [`aead`]: AES-256-GCM seal/open with fresh random nonces.
//! - [`envelope`] / [`chunk`]: the two wire formats -- the JSON body envelope
//!   and the colon-delimited streaming token.
//!
//! No key ever crosses the wire; both sides derive independently.

pub mod aead;
pub mod chunk;
pub mod envelope;
pub mod kdf;

pub use aead::{generate_random_key, open, seal};
pub use chunk::{open_chunk, seal_chunk};
pub use envelope::{Envelope, open_payload, seal_payload};
pub use kdf::{ANONYMOUS_IDENTIFIER, DerivedKey, Keyring};

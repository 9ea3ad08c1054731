// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PBKDF2-HMAC-SHA256 key derivation from the shared secret and a caller
//! identifier.
//!
//! Both ends of the wire derive the same key independently, so the algorithm
//! is fixed: PBKDF2 with 50,000 iterations over
//! `{secret}:{identifier}:chat-encryption` and a versioned static salt. The
//! browser side computes the identical derivation through WebCrypto, which is
//! why this is PBKDF2 and not a memory-hard KDF.

use std::num::NonZeroU32;

use ring::pbkdf2;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

/// Static salt; bump the suffix when the derivation scheme changes.
pub const KDF_SALT: &[u8] = b"sotto-chat-encryption-v1";

/// PBKDF2 iteration count agreed with the caller side.
pub const KDF_ITERATIONS: NonZeroU32 = NonZeroU32::new(50_000).unwrap();

/// Identifier used when the caller supplied none.
pub const ANONYMOUS_IDENTIFIER: &str = "anonymous";

/// A derived 256-bit key, zeroed on drop.
pub type DerivedKey = Zeroizing<[u8; 32]>;

/// Holds the process-wide encryption secret and derives per-session keys.
///
/// The secret is never logged; `Debug` redacts it.
pub struct Keyring {
    secret: SecretString,
}

impl Keyring {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Derive the 256-bit AES key for `identifier`.
    ///
    /// Deterministic: identical `(secret, identifier)` pairs always yield
    /// byte-identical key material. Empty identifiers fall back to
    /// [`ANONYMOUS_IDENTIFIER`] rather than failing.
    pub fn derive_key(&self, identifier: &str) -> DerivedKey {
        let identifier = if identifier.is_empty() {
            ANONYMOUS_IDENTIFIER
        } else {
            identifier
        };

        let material = Zeroizing::new(
            format!(
                "{}:{}:chat-encryption",
                self.secret.expose_secret(),
                identifier
            )
            .into_bytes(),
        );

        let mut key = Zeroizing::new([0u8; 32]);
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            KDF_ITERATIONS,
            KDF_SALT,
            &material,
            key.as_mut(),
        );
        key
    }
}

impl std::fmt::Debug for Keyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyring")
            .field("secret", &"[redacted]")
            .finish()
    }
}

// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Header extraction: caller IP, encryption mode, and the key identifier.
//!
//! The key identifier precedence mirrors the widget side exactly, or the two
//! ends derive different keys: user bearer token (longer than 50 characters)
//! before `x-session-token` before caller IP.

use axum::http::HeaderMap;
use sotto_crypto::{DerivedKey, Keyring};

/// Bearer values at or below this length are service/anon keys, not user
/// tokens, and never feed the key derivation.
const USER_TOKEN_MIN_LEN: usize = 50;

/// First entry of `x-forwarded-for`, else `x-real-ip`, else `"unknown"`.
pub fn caller_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// The session token header, when present and non-empty.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-session-token")
        .and_then(|v| v.to_str().ok())
        .filter(|t| !t.is_empty())
}

/// A bearer value long enough to be a user token rather than an anon key.
fn user_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| t.len() > USER_TOKEN_MIN_LEN)
}

/// Per-request encryption context.
pub struct RequestCrypto {
    /// Whether the caller set `x-encrypted: true`.
    pub encrypted: bool,
    /// Key derived from the highest-precedence identifier. Always derivable
    /// because the caller IP is a last-resort identifier.
    pub key: DerivedKey,
}

impl RequestCrypto {
    /// Derive the request's encryption context from its headers.
    pub fn from_headers(headers: &HeaderMap, keyring: &Keyring) -> Self {
        let encrypted = headers
            .get("x-encrypted")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        let identifier = user_bearer(headers)
            .or_else(|| session_token(headers))
            .map(str::to_string)
            .unwrap_or_else(|| caller_ip(headers));

        Self {
            encrypted,
            key: keyring.derive_key(&identifier),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use secrecy::SecretString;

    use super::*;

    fn keyring() -> Keyring {
        Keyring::new(SecretString::from("test-secret".to_string()))
    }

    #[test]
    fn forwarded_for_takes_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(caller_ip(&headers), "203.0.113.9");
    }

    #[test]
    fn real_ip_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(caller_ip(&headers), "10.0.0.2");
    }

    #[test]
    fn missing_headers_yield_unknown() {
        assert_eq!(caller_ip(&HeaderMap::new()), "unknown");
    }

    #[test]
    fn short_bearer_is_not_a_user_token() {
        let ring = keyring();
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer anon-key"));
        headers.insert("x-session-token", HeaderValue::from_static("tok-1"));

        // The short bearer is skipped; the session token wins.
        let from_headers = RequestCrypto::from_headers(&headers, &ring);
        assert_eq!(*from_headers.key, *ring.derive_key("tok-1"));
    }

    #[test]
    fn long_bearer_outranks_the_session_token() {
        let ring = keyring();
        let user_token = "u".repeat(64);
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {user_token}")).unwrap(),
        );
        headers.insert("x-session-token", HeaderValue::from_static("tok-1"));

        let crypto = RequestCrypto::from_headers(&headers, &ring);
        assert_eq!(*crypto.key, *ring.derive_key(&user_token));
    }

    #[test]
    fn ip_is_the_last_resort_identifier() {
        let ring = keyring();
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        headers.insert("x-encrypted", HeaderValue::from_static("true"));

        let crypto = RequestCrypto::from_headers(&headers, &ring);
        assert!(crypto.encrypted);
        assert_eq!(*crypto.key, *ring.derive_key("10.0.0.2"));
    }
}

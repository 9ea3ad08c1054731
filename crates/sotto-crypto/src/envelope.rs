// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The JSON request/response envelope: `{"encrypted": ..., "iv": ...}`.
//!
//! Whole request and response bodies travel inside this envelope when the
//! caller sets `x-encrypted: true`. Both fields are standard base64 with
//! padding, matching the caller side's `btoa` output.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sotto_core::SottoError;

use crate::aead;

/// An encrypted JSON body on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Base64 ciphertext including the 16-byte GCM tag.
    pub encrypted: String,
    /// Base64 96-bit nonce.
    pub iv: String,
}

/// Serialize `value` to JSON and seal it into an [`Envelope`].
pub fn seal_payload<T: Serialize>(value: &T, key: &[u8; 32]) -> Result<Envelope, SottoError> {
    let plaintext = serde_json::to_vec(value)
        .map_err(|e| SottoError::Internal(format!("payload serialization failed: {e}")))?;
    let (ciphertext, nonce) = aead::seal(key, &plaintext)?;
    Ok(Envelope {
        encrypted: BASE64.encode(ciphertext),
        iv: BASE64.encode(nonce),
    })
}

/// Open an [`Envelope`] and deserialize the plaintext JSON.
///
/// Fails with [`SottoError::DecryptionFailure`] on malformed base64, a nonce
/// of the wrong size, an authentication failure, or plaintext that is not
/// valid JSON for `T`.
pub fn open_payload<T: DeserializeOwned>(envelope: &Envelope, key: &[u8; 32]) -> Result<T, SottoError> {
    let ciphertext = BASE64
        .decode(&envelope.encrypted)
        .map_err(|_| SottoError::DecryptionFailure {
            detail: "ciphertext is not valid base64".to_string(),
        })?;
    let iv = BASE64
        .decode(&envelope.iv)
        .map_err(|_| SottoError::DecryptionFailure {
            detail: "nonce is not valid base64".to_string(),
        })?;
    let nonce: [u8; 12] = iv.try_into().map_err(|_| SottoError::DecryptionFailure {
        detail: "nonce must be 96 bits".to_string(),
    })?;

    let plaintext = aead::open(key, &nonce, &ciphertext)?;
    serde_json::from_slice(&plaintext).map_err(|_| SottoError::DecryptionFailure {
        detail: "decrypted payload is not valid JSON".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use secrecy::SecretString;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::kdf::Keyring;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct ChatRequest {
        messages: Vec<String>,
        #[serde(rename = "conversationId")]
        conversation_id: Option<String>,
    }

    fn test_key(identifier: &str) -> crate::kdf::DerivedKey {
        Keyring::new(SecretString::from("test-secret".to_string())).derive_key(identifier)
    }

    #[test]
    fn payload_round_trips() {
        let key = test_key("session-abc");
        let request = ChatRequest {
            messages: vec!["hello".into(), "how do badges work?".into()],
            conversation_id: Some("c1".into()),
        };

        let envelope = seal_payload(&request, &key).unwrap();
        let opened: ChatRequest = open_payload(&envelope, &key).unwrap();

        assert_eq!(opened, request);
    }

    #[test]
    fn envelope_fields_are_base64() {
        let key = test_key("session-abc");
        let envelope = seal_payload(&serde_json::json!({"a": 1}), &key).unwrap();

        assert!(BASE64.decode(&envelope.encrypted).is_ok());
        assert_eq!(BASE64.decode(&envelope.iv).unwrap().len(), 12);
    }

    #[test]
    fn wrong_identifier_key_fails_to_open() {
        let envelope = seal_payload(&serde_json::json!("hi"), &test_key("token-1")).unwrap();
        let result: Result<serde_json::Value, _> = open_payload(&envelope, &test_key("token-2"));
        assert!(matches!(result, Err(SottoError::DecryptionFailure { .. })));
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let key = test_key("session-abc");
        let mut envelope = seal_payload(&serde_json::json!({"secret": true}), &key).unwrap();

        let mut raw = BASE64.decode(&envelope.encrypted).unwrap();
        raw[0] ^= 0x01;
        envelope.encrypted = BASE64.encode(raw);

        let result: Result<serde_json::Value, _> = open_payload(&envelope, &key);
        assert!(matches!(result, Err(SottoError::DecryptionFailure { .. })));
    }

    #[test]
    fn short_nonce_is_rejected() {
        let key = test_key("session-abc");
        let mut envelope = seal_payload(&serde_json::json!(1), &key).unwrap();
        envelope.iv = BASE64.encode([0u8; 4]);

        let result: Result<serde_json::Value, _> = open_payload(&envelope, &key);
        assert!(matches!(result, Err(SottoError::DecryptionFailure { .. })));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        // Round-trip identity over arbitrary payload strings and identifiers.
        #[test]
        fn round_trip_identity(content in ".{0,200}", identifier in "[a-zA-Z0-9._-]{0,40}") {
            let key = test_key(&identifier);
            let value = serde_json::json!({ "content": content });

            let envelope = seal_payload(&value, &key).unwrap();
            let opened: serde_json::Value = open_payload(&envelope, &key).unwrap();

            prop_assert_eq!(opened, value);
        }
    }
}

// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The colon-delimited streaming chunk codec: `"<iv b64>:<ciphertext b64>"`.
//!
//! Each streamed token gets its own nonce and its own seal; the compact wire
//! token avoids a JSON envelope per chunk. Decryption returns a `Result` per
//! chunk so consumers must acknowledge the failure case; a bad chunk is
//! skipped, never fatal to the stream.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sotto_core::SottoError;

use crate::aead;

/// Seal one streaming chunk into an `iv:ciphertext` wire token.
pub fn seal_chunk(text: &str, key: &[u8; 32]) -> Result<String, SottoError> {
    let (ciphertext, nonce) = aead::seal(key, text.as_bytes())?;
    Ok(format!(
        "{}:{}",
        BASE64.encode(nonce),
        BASE64.encode(ciphertext)
    ))
}

/// Open an `iv:ciphertext` wire token back into chunk text.
pub fn open_chunk(token: &str, key: &[u8; 32]) -> Result<String, SottoError> {
    let (iv_b64, ct_b64) = token.split_once(':').ok_or_else(|| {
        SottoError::DecryptionFailure {
            detail: "chunk token is missing the iv delimiter".to_string(),
        }
    })?;

    let iv = BASE64
        .decode(iv_b64)
        .map_err(|_| SottoError::DecryptionFailure {
            detail: "chunk nonce is not valid base64".to_string(),
        })?;
    let nonce: [u8; 12] = iv.try_into().map_err(|_| SottoError::DecryptionFailure {
        detail: "chunk nonce must be 96 bits".to_string(),
    })?;
    let ciphertext = BASE64
        .decode(ct_b64)
        .map_err(|_| SottoError::DecryptionFailure {
            detail: "chunk ciphertext is not valid base64".to_string(),
        })?;

    let plaintext = aead::open(key, &nonce, &ciphertext)?;
    String::from_utf8(plaintext).map_err(|_| SottoError::DecryptionFailure {
        detail: "decrypted chunk is not valid UTF-8".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::aead::generate_random_key;

    #[test]
    fn chunk_round_trips() {
        let key = generate_random_key().unwrap();
        let token = seal_chunk("data: {\"choices\":[]}\n\n", &key).unwrap();
        let text = open_chunk(&token, &key).unwrap();
        assert_eq!(text, "data: {\"choices\":[]}\n\n");
    }

    #[test]
    fn token_has_two_base64_segments() {
        let key = generate_random_key().unwrap();
        let token = seal_chunk("hi", &key).unwrap();

        let (iv, ct) = token.split_once(':').unwrap();
        assert_eq!(BASE64.decode(iv).unwrap().len(), 12);
        // 2 bytes of plaintext + 16-byte tag.
        assert_eq!(BASE64.decode(ct).unwrap().len(), 18);
    }

    #[test]
    fn nonces_are_unique_across_10_000_chunks() {
        let key = generate_random_key().unwrap();
        let mut nonces = HashSet::new();

        for _ in 0..10_000 {
            let token = seal_chunk("tick", &key).unwrap();
            let (iv, _) = token.split_once(':').unwrap();
            nonces.insert(iv.to_string());
        }

        assert_eq!(nonces.len(), 10_000);
    }

    #[test]
    fn missing_delimiter_is_a_decryption_failure() {
        let key = generate_random_key().unwrap();
        let result = open_chunk("not-a-token", &key);
        assert!(matches!(result, Err(SottoError::DecryptionFailure { .. })));
    }

    #[test]
    fn corrupted_chunk_is_skippable_without_poisoning_the_stream() {
        let key = generate_random_key().unwrap();
        let tokens: Vec<String> = ["one", "two", "three"]
            .iter()
            .map(|t| seal_chunk(t, &key).unwrap())
            .collect();

        // Corrupt the middle token's ciphertext.
        let (iv, ct) = tokens[1].split_once(':').unwrap();
        let mut raw = BASE64.decode(ct).unwrap();
        raw[0] ^= 0xff;
        let corrupted = format!("{iv}:{}", BASE64.encode(raw));

        let mut recovered = Vec::new();
        for token in [&tokens[0], &corrupted, &tokens[2]] {
            if let Ok(text) = open_chunk(token, &key) {
                recovered.push(text);
            }
        }

        assert_eq!(recovered, vec!["one".to_string(), "three".to_string()]);
    }

    #[test]
    fn chunk_sealed_with_other_key_fails() {
        let key1 = generate_random_key().unwrap();
        let key2 = generate_random_key().unwrap();

        let token = seal_chunk("private", &key1).unwrap();
        assert!(open_chunk(&token, &key2).is_err());
    }
}

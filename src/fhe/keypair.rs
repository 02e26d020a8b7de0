// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 HealLock Contributors

//! Ephemeral decryption keypairs and key-material normalization.
//!
//! Backends have been observed returning key material in several shapes:
//! raw 32-byte arrays, oversized arrays, hex strings, base64 strings, and
//! JSON-wrapped objects. Rather than a speculative fallback chain, every
//! foreign shape is classified into [`KeyMaterial`] and coerced through one
//! deterministic path per variant; anything that cannot yield exactly 32
//! bytes is a descriptive error, never a silently wrong-length key.

use base64ct::{Base64, Encoding};
use ring::rand::{SecureRandom, SystemRandom};
use serde_json::Value;

use super::FhevmError;

/// Exact byte length of each session key.
pub const KEY_LEN: usize = 32;

/// An ephemeral (public, private) decryption keypair.
///
/// Generated fresh per decryption attempt and never reused across sessions.
#[derive(Clone)]
pub struct DecryptionKeypair {
    pub public_key: [u8; KEY_LEN],
    pub private_key: [u8; KEY_LEN],
}

impl std::fmt::Debug for DecryptionKeypair {
    // The private key never appears in logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptionKeypair")
            .field("public_key", &alloy::hex::encode(self.public_key))
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl DecryptionKeypair {
    /// Generate a fresh keypair from the system CSPRNG.
    pub fn generate() -> Result<Self, FhevmError> {
        let rng = SystemRandom::new();
        let mut public_key = [0u8; KEY_LEN];
        let mut private_key = [0u8; KEY_LEN];
        rng.fill(&mut public_key)
            .map_err(|_| FhevmError::Keypair("system RNG unavailable".into()))?;
        rng.fill(&mut private_key)
            .map_err(|_| FhevmError::Keypair("system RNG unavailable".into()))?;
        Ok(Self {
            public_key,
            private_key,
        })
    }

    /// Build a keypair from foreign key material, coercing each part.
    pub fn from_material(
        public: KeyMaterial,
        private: KeyMaterial,
    ) -> Result<Self, FhevmError> {
        Ok(Self {
            public_key: normalize_key(public)?,
            private_key: normalize_key(private)?,
        })
    }
}

/// The shapes key material arrives in.
#[derive(Debug, Clone)]
pub enum KeyMaterial {
    /// Raw bytes; must be at least 32 (extras beyond 32 are dropped).
    RawBytes(Vec<u8>),
    /// A hex (optionally 0x-prefixed) or base64 encoding of at least 32 bytes.
    EncodedString(String),
    /// A JSON value wrapping the key: an object with a `publicKey`,
    /// `privateKey`, or `key` field, or a numeric byte array.
    WrappedObject(Value),
}

impl KeyMaterial {
    /// Classify a string that may itself be JSON, hex, or base64.
    pub fn classify(raw: &str) -> KeyMaterial {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => KeyMaterial::WrappedObject(value),
                Err(_) => KeyMaterial::EncodedString(trimmed.to_string()),
            }
        } else {
            KeyMaterial::EncodedString(trimmed.to_string())
        }
    }
}

/// Coerce key material to exactly 32 bytes, or fail with a description of
/// what was received.
pub fn normalize_key(material: KeyMaterial) -> Result<[u8; KEY_LEN], FhevmError> {
    match material {
        KeyMaterial::RawBytes(bytes) => from_bytes(&bytes),
        KeyMaterial::EncodedString(text) => from_encoded(&text),
        KeyMaterial::WrappedObject(value) => from_wrapped(&value),
    }
}

fn from_bytes(bytes: &[u8]) -> Result<[u8; KEY_LEN], FhevmError> {
    if bytes.len() < KEY_LEN {
        return Err(FhevmError::Keypair(format!(
            "raw key is {} bytes, need {KEY_LEN}",
            bytes.len()
        )));
    }
    if bytes.len() > KEY_LEN {
        tracing::warn!(
            len = bytes.len(),
            "oversized key material, truncating to {KEY_LEN} bytes"
        );
    }
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&bytes[..KEY_LEN]);
    Ok(key)
}

fn from_encoded(text: &str) -> Result<[u8; KEY_LEN], FhevmError> {
    let trimmed = text.trim();

    // Hex first: an explicit 0x prefix decides outright, otherwise a string
    // of hex digits long enough for 32 bytes is taken as hex.
    if let Some(stripped) = trimmed.strip_prefix("0x") {
        let bytes = alloy::hex::decode(stripped)
            .map_err(|e| FhevmError::Keypair(format!("invalid hex key: {e}")))?;
        return from_bytes(&bytes);
    }
    if trimmed.len() >= KEY_LEN * 2 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        let bytes = alloy::hex::decode(trimmed)
            .map_err(|e| FhevmError::Keypair(format!("invalid hex key: {e}")))?;
        return from_bytes(&bytes);
    }

    // Otherwise base64.
    let bytes = Base64::decode_vec(trimmed)
        .map_err(|e| FhevmError::Keypair(format!("key is neither hex nor base64: {e}")))?;
    from_bytes(&bytes)
}

fn from_wrapped(value: &Value) -> Result<[u8; KEY_LEN], FhevmError> {
    match value {
        Value::Object(map) => {
            for field in ["publicKey", "privateKey", "key"] {
                if let Some(inner) = map.get(field) {
                    return from_wrapped(inner);
                }
            }
            Err(FhevmError::Keypair(
                "JSON object has no publicKey/privateKey/key field".into(),
            ))
        }
        Value::Array(items) => {
            let bytes: Result<Vec<u8>, _> = items
                .iter()
                .map(|v| {
                    v.as_u64()
                        .filter(|n| *n <= 255)
                        .map(|n| n as u8)
                        .ok_or_else(|| {
                            FhevmError::Keypair("JSON array holds non-byte values".into())
                        })
                })
                .collect();
            from_bytes(&bytes?)
        }
        Value::String(text) => from_encoded(text),
        other => Err(FhevmError::Keypair(format!(
            "cannot extract a key from JSON {}",
            type_name(other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: [u8; 32] = [
        0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
        0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d, 0x1e,
        0x1f, 0x20,
    ];

    #[test]
    fn raw_bytes_exact_length_pass_through() {
        let key = normalize_key(KeyMaterial::RawBytes(SAMPLE.to_vec())).unwrap();
        assert_eq!(key, SAMPLE);
    }

    #[test]
    fn oversized_bytes_are_truncated_to_32() {
        let mut oversized = SAMPLE.to_vec();
        oversized.extend_from_slice(&[0xff; 16]);
        let key = normalize_key(KeyMaterial::RawBytes(oversized)).unwrap();
        assert_eq!(key, SAMPLE);
    }

    #[test]
    fn undersized_bytes_are_rejected_with_length() {
        let err = normalize_key(KeyMaterial::RawBytes(vec![0u8; 16])).unwrap_err();
        assert!(err.to_string().contains("16 bytes"));
    }

    #[test]
    fn hex_with_prefix_decodes() {
        let encoded = format!("0x{}", alloy::hex::encode(SAMPLE));
        let key = normalize_key(KeyMaterial::EncodedString(encoded)).unwrap();
        assert_eq!(key, SAMPLE);
    }

    #[test]
    fn bare_hex_decodes() {
        let key =
            normalize_key(KeyMaterial::EncodedString(alloy::hex::encode(SAMPLE))).unwrap();
        assert_eq!(key, SAMPLE);
    }

    #[test]
    fn base64_decodes() {
        let encoded = Base64::encode_string(&SAMPLE);
        let key = normalize_key(KeyMaterial::EncodedString(encoded)).unwrap();
        assert_eq!(key, SAMPLE);
    }

    #[test]
    fn json_wrapped_public_key_decodes() {
        let wrapped = json!({ "publicKey": format!("0x{}", alloy::hex::encode(SAMPLE)) });
        let key = normalize_key(KeyMaterial::WrappedObject(wrapped)).unwrap();
        assert_eq!(key, SAMPLE);
    }

    #[test]
    fn json_byte_array_decodes() {
        let wrapped = json!(SAMPLE.to_vec());
        let key = normalize_key(KeyMaterial::WrappedObject(wrapped)).unwrap();
        assert_eq!(key, SAMPLE);
    }

    #[test]
    fn json_without_key_field_is_rejected() {
        let err =
            normalize_key(KeyMaterial::WrappedObject(json!({ "other": 1 }))).unwrap_err();
        assert!(err.to_string().contains("no publicKey"));
    }

    #[test]
    fn garbage_string_is_rejected_not_defaulted() {
        let err =
            normalize_key(KeyMaterial::EncodedString("!!definitely-not-a-key".into()))
                .unwrap_err();
        assert!(matches!(err, FhevmError::Keypair(_)));
    }

    #[test]
    fn classify_routes_json_and_plain_strings() {
        assert!(matches!(
            KeyMaterial::classify(r#"{"publicKey": "0x00"}"#),
            KeyMaterial::WrappedObject(_)
        ));
        assert!(matches!(
            KeyMaterial::classify("deadbeef"),
            KeyMaterial::EncodedString(_)
        ));
    }

    #[test]
    fn generated_keypairs_are_distinct() {
        let a = DecryptionKeypair::generate().unwrap();
        let b = DecryptionKeypair::generate().unwrap();
        assert_ne!(a.public_key, b.public_key);
        assert_ne!(a.private_key, b.private_key);
    }

    #[test]
    fn debug_redacts_private_key() {
        let pair = DecryptionKeypair::generate().unwrap();
        let debug = format!("{pair:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(&alloy::hex::encode(pair.private_key)));
    }
}

// rmos-core/src/core/hashing.rs
// ============================================================================
// Module: RMOS Canonical Hashing
// Description: RFC 8785 JSON canonicalization and content hashing utilities.
// Purpose: Provide deterministic hashes for artifacts, blobs, and fingerprints.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! RMOS hashes all canonical JSON using RFC 8785 (JCS) to guarantee stable,
//! replayable digests for `inputs_fingerprint` and parameter-override drift
//! detection. Binary blob payloads are hashed directly over raw bytes to
//! produce the `sha256` that is a blob's sole identity in the content-addressed
//! store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

use super::identifiers::Sha256Hex;

// ============================================================================
// SECTION: Hash Algorithm
// ============================================================================

/// Supported hash algorithms for RMOS artifacts and blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256 hashing, the only algorithm the content-addressed store uses.
    Sha256,
}

/// Default hash algorithm for RMOS.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

// ============================================================================
// SECTION: Hash Digest
// ============================================================================

/// Deterministic content hash representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashDigest {
    /// Hash algorithm identifier.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex-encoded digest bytes.
    pub value: String,
}

impl HashDigest {
    /// Creates a new digest from raw bytes.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        Self {
            algorithm,
            value: hex_encode(bytes),
        }
    }

    /// Returns the digest value as a [`Sha256Hex`] identifier.
    #[must_use]
    pub fn as_sha256_hex(&self) -> Sha256Hex {
        Sha256Hex::new(self.value.clone())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when computing canonical hashes.
#[derive(Debug, Error)]
pub enum HashError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Returns canonical JSON bytes for a serializable value using RFC 8785.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes canonical JSON using the provided algorithm.
///
/// Used to compute `inputs_fingerprint` on SPEC artifacts and the drift
/// fingerprint compared against an EXECUTION artifact's recorded inputs.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_canonical_json<T: Serialize + ?Sized>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(algorithm, &bytes))
}

/// Hashes raw bytes using the provided algorithm.
///
/// Used to compute a blob's `sha256` identity in the content-addressed store.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            let digest = hasher.finalize();
            HashDigest::new(HashAlgorithm::Sha256, &digest)
        }
    }
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panics are acceptable."
    )]

    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_is_order_independent() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        let hash_a = hash_canonical_json(HashAlgorithm::Sha256, &a).expect("hash a");
        let hash_b = hash_canonical_json(HashAlgorithm::Sha256, &b).expect("hash b");
        assert_eq!(hash_a.value, hash_b.value);
    }

    #[test]
    fn hash_bytes_is_deterministic() {
        let first = hash_bytes(HashAlgorithm::Sha256, b"toolpath-payload");
        let second = hash_bytes(HashAlgorithm::Sha256, b"toolpath-payload");
        assert_eq!(first.value, second.value);
        assert_eq!(first.value.len(), 64);
    }

    #[test]
    fn hash_bytes_changes_with_content() {
        let first = hash_bytes(HashAlgorithm::Sha256, b"a");
        let second = hash_bytes(HashAlgorithm::Sha256, b"b");
        assert_ne!(first.value, second.value);
    }
}

//! Canonical JSON (RFC 8785 / JCS)
//!
//! Every hash over JSON content goes through [`canonical_json`]: keys sorted
//! by UTF-16 code unit, no insignificant whitespace, ECMAScript number
//! formatting. Producers and verifiers must share this one function.

use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum CanonicalError {
    #[error("canonical serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Serialize `value` to its canonical JSON string
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CanonicalError> {
    Ok(serde_jcs::to_string(value)?)
}

/// Serialize `value` to canonical JSON bytes
pub fn canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CanonicalError> {
    Ok(serde_jcs::to_vec(value)?)
}

//! Error types for chain access

use thiserror::Error;

/// Errors that can occur while talking to the chain
///
/// These are transport-level failures. Retry policy belongs to whoever owns
/// the client; callers above it pass these through untouched.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Client is not available or misconfigured
    #[error("Chain client unavailable: {0}")]
    Unavailable(String),

    /// HTTP / connection failure
    #[error("Network error: {0}")]
    Network(String),

    /// The node answered with a JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Return data did not match the expected ABI shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

//! Fusion error types

use forge_chain::ChainError;
use forge_core::{Address, CanonicalError, RngError, TokenId};
use forge_vault::VaultError;

/// Errors raised while preparing, revealing or auditing a fusion
#[derive(Debug, thiserror::Error)]
pub enum FusionError {
    #[error("Cannot fuse token {0} with itself")]
    SameParent(TokenId),

    #[error("Token {token_id} is owned by {owner}, not {caller}")]
    NotOwner {
        token_id: TokenId,
        owner: Address,
        caller: Address,
    },

    #[error("Token {0} is sealed")]
    SealedParent(TokenId),

    #[error("No fusion commit for parents {parent_a} and {parent_b}")]
    NoCommitFound { parent_a: TokenId, parent_b: TokenId },

    #[error("Fusion of {parent_a} and {parent_b} was already revealed")]
    AlreadyRevealed { parent_a: TokenId, parent_b: TokenId },

    #[error("Reveal too early: block {current_block}, earliest {earliest_block}")]
    RevealTooEarly {
        current_block: u64,
        earliest_block: u64,
    },

    #[error("Commit expired: block {current_block}, deadline {deadline_block}")]
    CommitExpired {
        current_block: u64,
        deadline_block: u64,
    },

    /// The commit block has left the chain's block-hash window
    #[error("Block hash for commit block {commit_block} is no longer available")]
    BlockHashUnavailable { commit_block: u64 },

    #[error("No vault traits for token {0}")]
    TraitsUnavailable(TokenId),

    /// The vault record is not the one committed on-chain
    #[error("Vault record for token {0} does not match its on-chain learning root")]
    VaultMismatch(TokenId),

    #[error("Invalid on-chain metadata for token {token_id}: {reason}")]
    InvalidMetadata { token_id: TokenId, reason: String },

    #[error("Generator error: {0}")]
    Rng(#[from] RngError),

    #[error(transparent)]
    Canonical(#[from] CanonicalError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Vault(#[from] VaultError),
}

impl FusionError {
    /// True for rejections of the request itself, false for transport
    /// and storage failures that may succeed on retry
    pub fn is_validation(&self) -> bool {
        !matches!(self, FusionError::Chain(_) | FusionError::Vault(_))
    }
}

//! Core client trait for the fusion contract

use async_trait::async_trait;
use forge_core::{Address, FusionMode, Hash, TokenId};
use serde::{Deserialize, Serialize};

use crate::error::ChainError;

/// On-chain commit keyed by `(owner, parent_a, parent_b)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub commit_hash: Hash,
    pub commit_block: u64,
    pub revealed: bool,
    pub mode: FusionMode,
}

impl CommitRecord {
    /// The contract returns a zeroed record for missing or cancelled commits
    pub fn exists(&self) -> bool {
        !self.commit_hash.is_zero()
    }

    pub fn empty() -> Self {
        Self {
            commit_hash: Hash::ZERO,
            commit_block: 0,
            revealed: false,
            mode: FusionMode::Burn,
        }
    }
}

/// `getMetadata(tokenId)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub house_id: u8,
    pub rarity_tier: u8,
    pub vault_hash: Hash,
    pub learning_root: Hash,
}

/// `getLineage(tokenId)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage {
    pub parent_a: TokenId,
    pub parent_b: TokenId,
    pub generation: u32,
    pub is_fusion: bool,
}

impl Lineage {
    pub fn genesis() -> Self {
        Self {
            parent_a: 0,
            parent_b: 0,
            generation: 0,
            is_fusion: false,
        }
    }
}

/// Read access to the fusion contract
///
/// Implementations only read. Every state-changing call (`commitFusion`,
/// `revealFusion`) is signed and submitted by the user, never by HouseForge.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// `ownerOf(tokenId)`
    async fn owner_of(&self, token_id: TokenId) -> Result<Address, ChainError>;

    /// `isSealed(tokenId)`
    async fn is_sealed(&self, token_id: TokenId) -> Result<bool, ChainError>;

    /// Current block height
    async fn block_number(&self) -> Result<u64, ChainError>;

    /// `getCommit(owner, parentA, parentB)`
    async fn get_commit(
        &self,
        owner: &Address,
        parent_a: TokenId,
        parent_b: TokenId,
    ) -> Result<CommitRecord, ChainError>;

    /// `getCommitBlockHash(owner, parentA, parentB)`; zero once the hash
    /// has fallen out of the chain's block-hash window
    async fn get_commit_block_hash(
        &self,
        owner: &Address,
        parent_a: TokenId,
        parent_b: TokenId,
    ) -> Result<Hash, ChainError>;

    /// `getMetadata(tokenId)`
    async fn get_metadata(&self, token_id: TokenId) -> Result<TokenMetadata, ChainError>;

    /// `getLineage(tokenId)`
    async fn get_lineage(&self, token_id: TokenId) -> Result<Lineage, ChainError>;

    /// `nextTokenId()`
    async fn next_token_id(&self) -> Result<TokenId, ChainError>;

    /// Human-readable name of this client
    fn name(&self) -> &str;

    /// Check if the client can reach its chain
    async fn is_healthy(&self) -> bool;
}

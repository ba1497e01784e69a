//! In-memory fusion contract
//!
//! Simulates the contract's storage and the chain's block clock for tests,
//! local development and replay tooling. Block hashes are synthetic and only
//! queryable for [`MemoryChain::BLOCK_HASH_WINDOW`] blocks, like the EVM's
//! `blockhash` opcode.

use async_trait::async_trait;
use forge_core::{u64_word, Address, FusionMode, Hash, TokenId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::client::{ChainClient, CommitRecord, Lineage, TokenMetadata};
use crate::error::ChainError;

type CommitKey = (Address, TokenId, TokenId);

#[derive(Debug)]
struct ChainState {
    block: u64,
    next_token_id: TokenId,
    owners: HashMap<TokenId, Address>,
    sealed: HashSet<TokenId>,
    metadata: HashMap<TokenId, TokenMetadata>,
    lineage: HashMap<TokenId, Lineage>,
    commits: HashMap<CommitKey, CommitRecord>,
}

/// Fields for a token minted directly into the simulator
#[derive(Debug, Clone)]
pub struct MintRequest {
    pub owner: Address,
    pub metadata: TokenMetadata,
    pub lineage: Lineage,
}

/// In-memory [`ChainClient`] with contract-like mutators
#[derive(Debug)]
pub struct MemoryChain {
    state: RwLock<ChainState>,
    reads: AtomicUsize,
}

fn revert(reason: &str) -> ChainError {
    ChainError::Rpc {
        code: 3,
        message: format!("execution reverted: {}", reason),
    }
}

impl MemoryChain {
    /// Blocks for which a block hash stays queryable
    pub const BLOCK_HASH_WINDOW: u64 = 256;

    /// Start at `block` with token ids counting from 1
    pub fn new(block: u64) -> Self {
        Self {
            state: RwLock::new(ChainState {
                block,
                next_token_id: 1,
                owners: HashMap::new(),
                sealed: HashSet::new(),
                metadata: HashMap::new(),
                lineage: HashMap::new(),
                commits: HashMap::new(),
            }),
            reads: AtomicUsize::new(0),
        }
    }

    /// Synthetic, deterministic hash of block `number`
    pub fn block_hash(number: u64) -> Hash {
        let mut tag = [0u8; 32];
        tag[..12].copy_from_slice(b"memory-chain");
        Hash::digest_words(&[tag, u64_word(number)])
    }

    /// Number of `ChainClient` reads served so far
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn advance_blocks(&self, count: u64) -> u64 {
        let mut state = self.state.write().await;
        state.block += count;
        state.block
    }

    pub async fn mint(&self, request: MintRequest) -> TokenId {
        let mut state = self.state.write().await;
        let token_id = state.next_token_id;
        state.next_token_id += 1;
        state.owners.insert(token_id, request.owner);
        state.metadata.insert(token_id, request.metadata);
        state.lineage.insert(token_id, request.lineage);
        tracing::debug!(token_id, owner = %request.owner, "minted token");
        token_id
    }

    pub async fn transfer(&self, token_id: TokenId, to: Address) -> Result<(), ChainError> {
        let mut state = self.state.write().await;
        match state.owners.get_mut(&token_id) {
            Some(owner) => {
                *owner = to;
                Ok(())
            }
            None => Err(revert("nonexistent token")),
        }
    }

    pub async fn seal(&self, token_id: TokenId) {
        self.state.write().await.sealed.insert(token_id);
    }

    /// Mirror of the contract's `commitFusion`
    pub async fn commit_fusion(
        &self,
        owner: Address,
        parent_a: TokenId,
        parent_b: TokenId,
        commit_hash: Hash,
        mode: FusionMode,
    ) -> Result<u64, ChainError> {
        let mut state = self.state.write().await;
        for parent in [parent_a, parent_b] {
            if state.owners.get(&parent) != Some(&owner) {
                return Err(revert("not owner"));
            }
            if state.sealed.contains(&parent) {
                return Err(revert("parent sealed"));
            }
        }
        let key = (owner, parent_a, parent_b);
        if let Some(existing) = state.commits.get(&key) {
            if existing.exists() && !existing.revealed {
                return Err(revert("commit pending"));
            }
        }

        let commit_block = state.block;
        state.commits.insert(
            key,
            CommitRecord {
                commit_hash,
                commit_block,
                revealed: false,
                mode,
            },
        );
        Ok(commit_block)
    }

    /// Mirror of the contract's cancel path: the record is zeroed
    pub async fn cancel_fusion(
        &self,
        owner: Address,
        parent_a: TokenId,
        parent_b: TokenId,
    ) -> Result<(), ChainError> {
        let mut state = self.state.write().await;
        match state.commits.remove(&(owner, parent_a, parent_b)) {
            Some(record) if !record.revealed => Ok(()),
            Some(record) => {
                state.commits.insert((owner, parent_a, parent_b), record);
                Err(revert("already revealed"))
            }
            None => Err(revert("no commit")),
        }
    }

    /// Mirror of `revealFusion`: marks the commit revealed, applies the
    /// fusion mode to the parents and mints the offspring
    pub async fn reveal_fusion(
        &self,
        owner: Address,
        parent_a: TokenId,
        parent_b: TokenId,
        metadata: TokenMetadata,
    ) -> Result<TokenId, ChainError> {
        let mut state = self.state.write().await;
        let key = (owner, parent_a, parent_b);
        let mode = match state.commits.get_mut(&key) {
            Some(record) if record.exists() && !record.revealed => {
                record.revealed = true;
                record.mode
            }
            Some(record) if record.revealed => return Err(revert("already revealed")),
            _ => return Err(revert("no commit")),
        };

        match mode {
            FusionMode::Burn => {
                state.owners.remove(&parent_a);
                state.owners.remove(&parent_b);
            }
            FusionMode::Seal => {
                state.sealed.insert(parent_a);
                state.sealed.insert(parent_b);
            }
        }

        let generation = [parent_a, parent_b]
            .iter()
            .filter_map(|p| state.lineage.get(p).map(|l| l.generation))
            .max()
            .unwrap_or(0)
            + 1;

        let token_id = state.next_token_id;
        state.next_token_id += 1;
        state.owners.insert(token_id, owner);
        state.metadata.insert(token_id, metadata);
        state.lineage.insert(
            token_id,
            Lineage {
                parent_a,
                parent_b,
                generation,
                is_fusion: true,
            },
        );
        Ok(token_id)
    }
}

impl Default for MemoryChain {
    fn default() -> Self {
        Self::new(1)
    }
}

#[async_trait]
impl ChainClient for MemoryChain {
    async fn owner_of(&self, token_id: TokenId) -> Result<Address, ChainError> {
        self.record_read();
        self.state
            .read()
            .await
            .owners
            .get(&token_id)
            .copied()
            .ok_or_else(|| revert("nonexistent token"))
    }

    async fn is_sealed(&self, token_id: TokenId) -> Result<bool, ChainError> {
        self.record_read();
        Ok(self.state.read().await.sealed.contains(&token_id))
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        self.record_read();
        Ok(self.state.read().await.block)
    }

    async fn get_commit(
        &self,
        owner: &Address,
        parent_a: TokenId,
        parent_b: TokenId,
    ) -> Result<CommitRecord, ChainError> {
        self.record_read();
        Ok(self
            .state
            .read()
            .await
            .commits
            .get(&(*owner, parent_a, parent_b))
            .cloned()
            .unwrap_or_else(CommitRecord::empty))
    }

    async fn get_commit_block_hash(
        &self,
        owner: &Address,
        parent_a: TokenId,
        parent_b: TokenId,
    ) -> Result<Hash, ChainError> {
        self.record_read();
        let state = self.state.read().await;
        let Some(record) = state.commits.get(&(*owner, parent_a, parent_b)) else {
            return Ok(Hash::ZERO);
        };
        let age = state.block.saturating_sub(record.commit_block);
        if age == 0 || age > Self::BLOCK_HASH_WINDOW {
            return Ok(Hash::ZERO);
        }
        Ok(Self::block_hash(record.commit_block))
    }

    async fn get_metadata(&self, token_id: TokenId) -> Result<TokenMetadata, ChainError> {
        self.record_read();
        self.state
            .read()
            .await
            .metadata
            .get(&token_id)
            .cloned()
            .ok_or_else(|| revert("nonexistent token"))
    }

    async fn get_lineage(&self, token_id: TokenId) -> Result<Lineage, ChainError> {
        self.record_read();
        self.state
            .read()
            .await
            .lineage
            .get(&token_id)
            .cloned()
            .ok_or_else(|| revert("nonexistent token"))
    }

    async fn next_token_id(&self) -> Result<TokenId, ChainError> {
        self.record_read();
        Ok(self.state.read().await.next_token_id)
    }

    fn name(&self) -> &str {
        "memory"
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Address {
        Address::from_bytes([0xa1; 20])
    }

    fn mint_request(owner: Address) -> MintRequest {
        MintRequest {
            owner,
            metadata: TokenMetadata {
                house_id: 1,
                rarity_tier: 0,
                vault_hash: Hash::digest(b"vault"),
                learning_root: Hash::digest(b"root"),
            },
            lineage: Lineage::genesis(),
        }
    }

    #[tokio::test]
    async fn test_commit_lifecycle() {
        let chain = MemoryChain::new(100);
        let a = chain.mint(mint_request(user())).await;
        let b = chain.mint(mint_request(user())).await;

        assert!(!chain.get_commit(&user(), a, b).await.unwrap().exists());

        let commit_block = chain
            .commit_fusion(user(), a, b, Hash::digest(b"c"), FusionMode::Seal)
            .await
            .unwrap();
        assert_eq!(commit_block, 100);

        // Pending commits block a second commit on the same key
        assert!(chain
            .commit_fusion(user(), a, b, Hash::digest(b"d"), FusionMode::Seal)
            .await
            .is_err());

        let record = chain.get_commit(&user(), a, b).await.unwrap();
        assert!(record.exists());
        assert!(!record.revealed);

        chain.advance_blocks(2).await;
        let child = chain
            .reveal_fusion(user(), a, b, mint_request(user()).metadata)
            .await
            .unwrap();
        assert_eq!(child, 3);
        assert!(chain.get_commit(&user(), a, b).await.unwrap().revealed);
        assert!(chain.is_sealed(a).await.unwrap());
        assert_eq!(chain.get_lineage(child).await.unwrap().generation, 1);

        // Second reveal on the same key loses
        assert!(chain
            .reveal_fusion(user(), a, b, mint_request(user()).metadata)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_block_hash_window() {
        let chain = MemoryChain::new(10);
        let a = chain.mint(mint_request(user())).await;
        let b = chain.mint(mint_request(user())).await;
        chain
            .commit_fusion(user(), a, b, Hash::digest(b"c"), FusionMode::Burn)
            .await
            .unwrap();

        // Not yet mined past the commit block
        assert!(chain.get_commit_block_hash(&user(), a, b).await.unwrap().is_zero());

        chain.advance_blocks(1).await;
        assert_eq!(
            chain.get_commit_block_hash(&user(), a, b).await.unwrap(),
            MemoryChain::block_hash(10)
        );

        chain.advance_blocks(MemoryChain::BLOCK_HASH_WINDOW).await;
        assert!(chain.get_commit_block_hash(&user(), a, b).await.unwrap().is_zero());
    }

    #[tokio::test]
    async fn test_cancel_zeroes_commit() {
        let chain = MemoryChain::new(1);
        let a = chain.mint(mint_request(user())).await;
        let b = chain.mint(mint_request(user())).await;
        chain
            .commit_fusion(user(), a, b, Hash::digest(b"c"), FusionMode::Burn)
            .await
            .unwrap();
        chain.cancel_fusion(user(), a, b).await.unwrap();
        assert!(!chain.get_commit(&user(), a, b).await.unwrap().exists());
        assert!(chain.cancel_fusion(user(), a, b).await.is_err());
    }

    #[tokio::test]
    async fn test_reads_are_counted() {
        let chain = MemoryChain::default();
        assert_eq!(chain.read_count(), 0);
        chain.block_number().await.unwrap();
        let _ = chain.owner_of(42).await;
        assert_eq!(chain.read_count(), 2);
    }
}

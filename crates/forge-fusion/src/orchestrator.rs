//! Commit-reveal fusion orchestrator
//!
//! Per `(owner, parent_a, parent_b)` a fusion moves through
//! `NoCommit -> Committed -> Revealed | Expired | Cancelled`. The chain owns
//! that state; the orchestrator only reads it, validates, derives, and writes
//! one vault record as the final step of a reveal. It never signs or submits
//! transactions: both phases end in calldata the user submits themselves.

use std::sync::Arc;

use forge_chain::{abi, abi::Token, ChainClient};
use forge_core::{
    canonical_json, commit_hash, fusion_seed, traits_hash, Address, FusionMode,
    GeneratedMetadata, Hash, House, ParentInfo, RarityTier, SeededRng, TokenId,
};
use forge_vault::{VaultDocument, VaultRecord, VaultResult, VaultService};
use serde::{Deserialize, Serialize};

use crate::config::FusionConfig;
use crate::error::FusionError;
use crate::generator::TraitGenerator;

/// Output of [`FusionOrchestrator::prepare_commit`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResult {
    pub commit_hash: Hash,
    pub parent_a: TokenId,
    pub parent_b: TokenId,
    pub mode: FusionMode,
    /// Block the hash was computed against
    pub block_number: u64,
}

/// Output of [`FusionOrchestrator::prepare_reveal`]; advisory until the
/// user submits the reveal transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealResult {
    /// Id the offspring gets if this reveal is the next mint; the chain
    /// assigns the final id, see [`FusionOrchestrator::confirm_reveal`]
    pub offspring_token_id: TokenId,
    pub offspring_metadata: GeneratedMetadata,
    pub vault_result: VaultResult,
    pub offspring_house_id: u8,
    pub traits_hash: Hash,
    pub fusion_seed: Hash,
    pub commit_block: u64,
}

/// `fusion:#<a>+#<b>:gen<n>`; also the learning summary of the offspring vault
pub fn experience_label(parent_a: TokenId, parent_b: TokenId, generation: u32) -> String {
    format!("fusion:#{}+#{}:gen{}", parent_a, parent_b, generation)
}

/// Fusion orchestrator over injected chain, vault and generator
pub struct FusionOrchestrator<C: ChainClient, V: VaultService, G: TraitGenerator> {
    /// Configuration
    pub config: FusionConfig,
    chain: Arc<C>,
    vault: Arc<V>,
    generator: Arc<G>,
}

impl<C: ChainClient, V: VaultService, G: TraitGenerator> Clone for FusionOrchestrator<C, V, G> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            chain: self.chain.clone(),
            vault: self.vault.clone(),
            generator: self.generator.clone(),
        }
    }
}

impl<C: ChainClient, V: VaultService, G: TraitGenerator> FusionOrchestrator<C, V, G> {
    pub fn new(chain: Arc<C>, vault: Arc<V>, generator: Arc<G>, config: FusionConfig) -> Self {
        Self {
            config,
            chain,
            vault,
            generator,
        }
    }

    pub fn chain(&self) -> &Arc<C> {
        &self.chain
    }

    pub fn vault(&self) -> &Arc<V> {
        &self.vault
    }

    /// Validate a fusion request and compute the commit hash to submit.
    ///
    /// Reads only; nothing is submitted.
    pub async fn prepare_commit(
        &self,
        parent_a: TokenId,
        parent_b: TokenId,
        salt: &Hash,
        mode: FusionMode,
        user: &Address,
    ) -> Result<CommitResult, FusionError> {
        if parent_a == parent_b {
            return Err(FusionError::SameParent(parent_a));
        }

        // Ownership of A is checked alone first; a foreign token costs one read
        self.ensure_owner(parent_a, user).await?;
        self.ensure_owner(parent_b, user).await?;

        for parent in [parent_a, parent_b] {
            if self.chain.is_sealed(parent).await? {
                return Err(FusionError::SealedParent(parent));
            }
        }

        let block_number = self.chain.block_number().await?;
        let commit_hash = commit_hash(parent_a, parent_b, salt, block_number, user, mode);

        tracing::info!(
            parent_a,
            parent_b,
            user = %user,
            block_number,
            commit_hash = %commit_hash,
            "fusion commit prepared"
        );

        Ok(CommitResult {
            commit_hash,
            parent_a,
            parent_b,
            mode,
            block_number,
        })
    }

    /// Recompute the fusion seed from chain state, generate the offspring
    /// and persist its vault record.
    ///
    /// Every check runs before the vault write, so a rejected reveal leaves
    /// no trace. Repeating a reveal against unchanged chain state returns
    /// the same seed, traits hash and vault hash. The record is stored by
    /// content and bound to no token, so reveals on other keys, or a retry
    /// with a different salt, never contend for it.
    pub async fn prepare_reveal(
        &self,
        parent_a: TokenId,
        parent_b: TokenId,
        salt: &Hash,
        user: &Address,
    ) -> Result<RevealResult, FusionError> {
        if parent_a == parent_b {
            return Err(FusionError::SameParent(parent_a));
        }

        let commit = self.chain.get_commit(user, parent_a, parent_b).await?;
        if !commit.exists() {
            return Err(FusionError::NoCommitFound { parent_a, parent_b });
        }
        if commit.revealed {
            return Err(FusionError::AlreadyRevealed { parent_a, parent_b });
        }

        let current_block = self.chain.block_number().await?;
        let earliest_block = commit.commit_block.saturating_add(self.config.min_reveal_delay);
        let deadline_block = commit.commit_block.saturating_add(self.config.reveal_window);
        if current_block < earliest_block {
            return Err(FusionError::RevealTooEarly {
                current_block,
                earliest_block,
            });
        }
        if current_block > deadline_block {
            return Err(FusionError::CommitExpired {
                current_block,
                deadline_block,
            });
        }

        let block_hash = self
            .chain
            .get_commit_block_hash(user, parent_a, parent_b)
            .await?;
        if block_hash.is_zero() {
            tracing::warn!(
                commit_block = commit.commit_block,
                current_block,
                "commit block hash unavailable"
            );
            return Err(FusionError::BlockHashUnavailable {
                commit_block: commit.commit_block,
            });
        }

        let info_a = self.load_parent(parent_a).await?;
        let info_b = self.load_parent(parent_b).await?;

        let seed = fusion_seed(
            parent_a,
            parent_b,
            &info_a.learning_root,
            &info_b.learning_root,
            salt,
            &block_hash,
        );
        let offspring_token_id = self.chain.next_token_id().await?;

        let metadata =
            self.generator
                .generate_fusion_metadata(offspring_token_id, &info_a, &info_b, &seed)?;
        let house = *SeededRng::new(seed)
            .derive("house")
            .pick(&[info_a.house, info_b.house])?;
        let traits_hash = traits_hash(&metadata.traits)?;

        let document = VaultDocument {
            schema_version: VaultDocument::SCHEMA_VERSION.to_string(),
            token_id: None,
            house,
            rarity_tier: metadata.rarity_tier,
            generation: metadata.generation,
            traits: metadata.traits.clone(),
            persona: metadata.persona.clone(),
            parents: Some([parent_a, parent_b]),
            fusion_seed: Some(seed),
            is_mythic: metadata.is_mythic,
            mythic_key: metadata.mythic_key.clone(),
            summary: experience_label(parent_a, parent_b, metadata.generation),
        };

        // Only side effect; stays last
        let vault_result = self.vault.create(document).await?;

        tracing::info!(
            parent_a,
            parent_b,
            offspring_token_id,
            house = %house,
            fusion_seed = %seed,
            vault_hash = %vault_result.vault_hash,
            "fusion reveal prepared"
        );

        Ok(RevealResult {
            offspring_token_id,
            offspring_metadata: metadata,
            vault_result,
            offspring_house_id: house.id(),
            traits_hash,
            fusion_seed: seed,
            commit_block: commit.commit_block,
        })
    }

    /// Calldata for `commitFusion(uint256,uint256,bytes32,uint8)`
    pub fn encode_commit_calldata(&self, commit: &CommitResult) -> Vec<u8> {
        abi::encode_call(
            abi::selector::COMMIT_FUSION,
            &[
                Token::Uint(commit.parent_a),
                Token::Uint(commit.parent_b),
                Token::Bytes32(commit.commit_hash),
                Token::Uint(u64::from(commit.mode.as_u8())),
            ],
        )
    }

    /// Calldata for
    /// `revealFusion(uint256,uint256,bytes32,string,bytes32,bytes32,string,string,uint8)`.
    ///
    /// The persona argument is the canonical JSON of the generated persona.
    pub fn encode_reveal_calldata(
        &self,
        parent_a: TokenId,
        parent_b: TokenId,
        salt: &Hash,
        reveal: &RevealResult,
    ) -> Result<Vec<u8>, FusionError> {
        let persona = canonical_json(&reveal.offspring_metadata.persona)?;
        Ok(abi::encode_call(
            abi::selector::REVEAL_FUSION,
            &[
                Token::Uint(parent_a),
                Token::Uint(parent_b),
                Token::Bytes32(*salt),
                Token::String(reveal.vault_result.vault_uri.clone()),
                Token::Bytes32(reveal.vault_result.vault_hash),
                Token::Bytes32(reveal.vault_result.learning_root),
                Token::String(persona),
                Token::String(experience_label(
                    parent_a,
                    parent_b,
                    reveal.offspring_metadata.generation,
                )),
                Token::Uint(u64::from(reveal.offspring_house_id)),
            ],
        ))
    }

    /// Bind a minted offspring to the vault record its reveal committed to.
    ///
    /// Call once the user's `revealFusion` transaction has landed. The
    /// record is located by the on-chain vault hash and must reproduce the
    /// on-chain learning root. Binding again is a no-op.
    pub async fn confirm_reveal(&self, token_id: TokenId) -> Result<VaultRecord, FusionError> {
        let lineage = self.chain.get_lineage(token_id).await?;
        if !lineage.is_fusion {
            return Err(FusionError::InvalidMetadata {
                token_id,
                reason: "not a fusion offspring".to_string(),
            });
        }
        let metadata = self.chain.get_metadata(token_id).await?;

        let record = self
            .vault
            .get_by_hash(&metadata.vault_hash)
            .await?
            .ok_or(FusionError::TraitsUnavailable(token_id))?;
        if record.learning_root != metadata.learning_root {
            return Err(FusionError::VaultMismatch(token_id));
        }

        self.vault.bind_token(token_id, &metadata.vault_hash).await?;
        tracing::info!(
            token_id,
            parent_a = lineage.parent_a,
            parent_b = lineage.parent_b,
            vault_hash = %metadata.vault_hash,
            "fusion offspring confirmed"
        );
        Ok(record)
    }

    async fn ensure_owner(&self, token_id: TokenId, user: &Address) -> Result<(), FusionError> {
        let owner = self.chain.owner_of(token_id).await?;
        if owner != *user {
            tracing::debug!(token_id, owner = %owner, caller = %user, "ownership check failed");
            return Err(FusionError::NotOwner {
                token_id,
                owner,
                caller: *user,
            });
        }
        Ok(())
    }

    /// Chain metadata and lineage joined with the vault's traits and persona.
    ///
    /// The on-chain learning root is authoritative; a vault record that does
    /// not reproduce it is rejected.
    async fn load_parent(&self, token_id: TokenId) -> Result<ParentInfo, FusionError> {
        let metadata = self.chain.get_metadata(token_id).await?;
        let lineage = self.chain.get_lineage(token_id).await?;

        let house = House::from_id(metadata.house_id).ok_or_else(|| FusionError::InvalidMetadata {
            token_id,
            reason: format!("unknown house id {}", metadata.house_id),
        })?;
        let rarity_tier =
            RarityTier::from_u8(metadata.rarity_tier).ok_or_else(|| FusionError::InvalidMetadata {
                token_id,
                reason: format!("unknown rarity tier {}", metadata.rarity_tier),
            })?;

        let record = self
            .vault
            .get_by_token_id(token_id)
            .await?
            .ok_or(FusionError::TraitsUnavailable(token_id))?;
        if record.learning_root != metadata.learning_root {
            return Err(FusionError::VaultMismatch(token_id));
        }

        Ok(ParentInfo {
            token_id,
            house,
            rarity_tier,
            generation: lineage.generation,
            traits: record.document.traits,
            learning_root: metadata.learning_root,
            persona: record.document.persona,
        })
    }
}

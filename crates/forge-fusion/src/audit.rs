//! Third-party verification of minted agents
//!
//! Re-derives every commitment from the vault document and compares it to
//! what the contract recorded. Needs no trust in whoever wrote the vault.

use std::sync::Arc;

use forge_chain::ChainClient;
use forge_core::{fusion_seed, learning_root, traits_hash, Address, Hash, TokenId};
use forge_vault::VaultService;
use serde::{Deserialize, Serialize};

use crate::error::FusionError;

/// Result of [`FusionAuditor::verify_token`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub token_id: TokenId,
    /// `H(canonical(document))` recomputed from the vault
    pub vault_hash: Hash,
    pub learning_root: Hash,
    pub traits_hash: Hash,
    pub vault_hash_matches: bool,
    pub learning_root_matches: bool,
    pub house_matches: bool,
}

impl AuditReport {
    pub fn is_valid(&self) -> bool {
        self.vault_hash_matches && self.learning_root_matches && self.house_matches
    }

    /// Compare against a traits hash published elsewhere (e.g. a reveal result)
    pub fn traits_match(&self, expected: &Hash) -> bool {
        self.traits_hash == *expected
    }
}

/// Result of [`FusionAuditor::verify_fusion_seed`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedAudit {
    pub token_id: TokenId,
    pub recorded: Option<Hash>,
    pub recomputed: Hash,
}

impl SeedAudit {
    pub fn matches(&self) -> bool {
        self.recorded == Some(self.recomputed)
    }
}

/// Read-only auditor over a chain and a vault
pub struct FusionAuditor<C: ChainClient, V: VaultService> {
    chain: Arc<C>,
    vault: Arc<V>,
}

impl<C: ChainClient, V: VaultService> FusionAuditor<C, V> {
    pub fn new(chain: Arc<C>, vault: Arc<V>) -> Self {
        Self { chain, vault }
    }

    /// Recompute vault hash, learning root and traits hash for `token_id`
    /// and compare them to the on-chain metadata
    pub async fn verify_token(&self, token_id: TokenId) -> Result<AuditReport, FusionError> {
        let metadata = self.chain.get_metadata(token_id).await?;
        let record = self
            .vault
            .get_by_token_id(token_id)
            .await?
            .ok_or(FusionError::TraitsUnavailable(token_id))?;

        let document = &record.document;
        let vault_hash = document.vault_hash()?;
        let learning_root = learning_root(&vault_hash, &document.summary);

        let report = AuditReport {
            token_id,
            vault_hash,
            learning_root,
            traits_hash: traits_hash(&document.traits)?,
            vault_hash_matches: vault_hash == metadata.vault_hash,
            learning_root_matches: learning_root == metadata.learning_root,
            house_matches: document.house.id() == metadata.house_id,
        };

        if report.is_valid() {
            tracing::info!(token_id, vault_hash = %vault_hash, "audit passed");
        } else {
            tracing::warn!(
                token_id,
                vault_hash_matches = report.vault_hash_matches,
                learning_root_matches = report.learning_root_matches,
                house_matches = report.house_matches,
                "audit failed"
            );
        }
        Ok(report)
    }

    /// Recompute a fusion offspring's seed from chain reads and the revealed
    /// salt, and compare it to the seed recorded in its vault document.
    ///
    /// The commit block hash must still be inside the chain's block-hash window.
    pub async fn verify_fusion_seed(
        &self,
        token_id: TokenId,
        owner: &Address,
        salt: &Hash,
    ) -> Result<SeedAudit, FusionError> {
        let lineage = self.chain.get_lineage(token_id).await?;
        if !lineage.is_fusion {
            return Err(FusionError::InvalidMetadata {
                token_id,
                reason: "not a fusion offspring".to_string(),
            });
        }
        let (parent_a, parent_b) = (lineage.parent_a, lineage.parent_b);

        let block_hash = self
            .chain
            .get_commit_block_hash(owner, parent_a, parent_b)
            .await?;
        if block_hash.is_zero() {
            let commit = self.chain.get_commit(owner, parent_a, parent_b).await?;
            return Err(FusionError::BlockHashUnavailable {
                commit_block: commit.commit_block,
            });
        }

        let root_a = self.chain.get_metadata(parent_a).await?.learning_root;
        let root_b = self.chain.get_metadata(parent_b).await?.learning_root;
        let recomputed = fusion_seed(parent_a, parent_b, &root_a, &root_b, salt, &block_hash);

        let recorded = self
            .vault
            .get_by_token_id(token_id)
            .await?
            .ok_or(FusionError::TraitsUnavailable(token_id))?
            .document
            .fusion_seed;

        Ok(SeedAudit {
            token_id,
            recorded,
            recomputed,
        })
    }
}

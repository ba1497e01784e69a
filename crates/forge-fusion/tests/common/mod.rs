//! Shared fixtures: an in-memory chain and vault with genesis agents minted
//! the way the mint pipeline does it

#![allow(dead_code)]

use std::sync::Arc;

use forge_chain::{ChainClient, Lineage, MemoryChain, MintRequest, TokenMetadata};
use forge_core::{Address, Hash, House, TokenId};
use forge_fusion::{FusionConfig, FusionOrchestrator, RevealResult, SeededTraitGenerator};
use forge_vault::{MemoryVault, VaultDocument, VaultService};

pub const ALICE: Address = Address([0xa1; 20]);
pub const BOB: Address = Address([0xb0; 20]);

pub type MemoryOrchestrator = FusionOrchestrator<MemoryChain, MemoryVault, SeededTraitGenerator>;

pub struct Harness {
    pub chain: Arc<MemoryChain>,
    pub vault: Arc<MemoryVault>,
    pub generator: Arc<SeededTraitGenerator>,
    pub orchestrator: MemoryOrchestrator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(FusionConfig::default())
    }

    pub fn with_config(config: FusionConfig) -> Self {
        let chain = Arc::new(MemoryChain::new(1_000));
        let vault = Arc::new(MemoryVault::with_uri_prefix(config.vault_uri_prefix.clone()));
        let generator = Arc::new(SeededTraitGenerator::new(config.generator.clone()));
        let orchestrator =
            FusionOrchestrator::new(chain.clone(), vault.clone(), generator.clone(), config);
        Self {
            chain,
            vault,
            generator,
            orchestrator,
        }
    }

    /// Mint a generation-0 agent with a matching vault record
    pub async fn mint_genesis(&self, owner: Address, house: House) -> TokenId {
        mint_genesis_into(&self.chain, self.vault.as_ref(), &self.generator, owner, house).await
    }

    /// Mint a token whose vault record was never written
    pub async fn mint_without_vault(&self, owner: Address, house: House) -> TokenId {
        self.chain
            .mint(MintRequest {
                owner,
                metadata: TokenMetadata {
                    house_id: house.id(),
                    rarity_tier: 0,
                    vault_hash: Hash::digest(b"missing"),
                    learning_root: Hash::digest(b"missing-root"),
                },
                lineage: Lineage::genesis(),
            })
            .await
    }

    /// Submit the commit on-chain the way the user's wallet would
    pub async fn commit(
        &self,
        owner: Address,
        parent_a: TokenId,
        parent_b: TokenId,
        salt: &Hash,
        mode: forge_core::FusionMode,
    ) -> u64 {
        let prepared = self
            .orchestrator
            .prepare_commit(parent_a, parent_b, salt, mode, &owner)
            .await
            .unwrap();
        self.chain
            .commit_fusion(owner, parent_a, parent_b, prepared.commit_hash, mode)
            .await
            .unwrap()
    }

    /// Land the reveal transaction on-chain and bind the minted offspring
    pub async fn submit_reveal(
        &self,
        owner: Address,
        parent_a: TokenId,
        parent_b: TokenId,
        reveal: &RevealResult,
    ) -> TokenId {
        let offspring = self
            .chain
            .reveal_fusion(
                owner,
                parent_a,
                parent_b,
                TokenMetadata {
                    house_id: reveal.offspring_house_id,
                    rarity_tier: reveal.offspring_metadata.rarity_tier.as_u8(),
                    vault_hash: reveal.vault_result.vault_hash,
                    learning_root: reveal.vault_result.learning_root,
                },
            )
            .await
            .unwrap();
        self.orchestrator.confirm_reveal(offspring).await.unwrap();
        offspring
    }
}

pub async fn mint_genesis_into<V: VaultService>(
    chain: &MemoryChain,
    vault: &V,
    generator: &SeededTraitGenerator,
    owner: Address,
    house: House,
) -> TokenId {
    let token_id = chain.next_token_id().await.unwrap();
    let seed = Hash::digest(&token_id.to_be_bytes());
    let meta = generator.generate_genesis(token_id, house, &seed).unwrap();

    let vault_result = vault
        .create(VaultDocument {
            schema_version: VaultDocument::SCHEMA_VERSION.to_string(),
            token_id: Some(token_id),
            house,
            rarity_tier: meta.rarity_tier,
            generation: 0,
            traits: meta.traits,
            persona: meta.persona,
            parents: None,
            fusion_seed: None,
            is_mythic: meta.is_mythic,
            mythic_key: meta.mythic_key,
            summary: "genesis".to_string(),
        })
        .await
        .unwrap();

    let minted = chain
        .mint(MintRequest {
            owner,
            metadata: TokenMetadata {
                house_id: house.id(),
                rarity_tier: meta.rarity_tier.as_u8(),
                vault_hash: vault_result.vault_hash,
                learning_root: vault_result.learning_root,
            },
            lineage: Lineage::genesis(),
        })
        .await;
    assert_eq!(minted, token_id);
    minted
}

pub fn salt(tag: u8) -> Hash {
    Hash::from_bytes([tag; 32])
}

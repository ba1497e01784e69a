//! End-to-end fusion: commit, reveal, on-chain mint, audit

mod common;

use std::sync::Arc;

use common::{mint_genesis_into, salt, Harness, ALICE, BOB};
use forge_chain::{abi, ChainClient, MemoryChain, TokenMetadata};
use forge_core::{canonical_json, fusion_seed, traits_hash, FusionMode, Hash, House};
use forge_fusion::{
    experience_label, FusionAuditor, FusionConfig, FusionOrchestrator, RenderRecipe,
    SeededTraitGenerator,
};
use forge_vault::{FileVault, VaultError, VaultService};

#[tokio::test]
async fn test_fusion_lifecycle_burn() {
    let h = Harness::new();
    let a = h.mint_genesis(ALICE, House::Thunder).await;
    let b = h.mint_genesis(ALICE, House::Frost).await;
    let salt = salt(0x5a);

    let commit_block = h.commit(ALICE, a, b, &salt, FusionMode::Burn).await;
    h.chain.advance_blocks(1).await;

    let reveal = h.orchestrator.prepare_reveal(a, b, &salt, &ALICE).await.unwrap();

    assert_eq!(reveal.offspring_token_id, 3);
    assert_eq!(reveal.commit_block, commit_block);
    assert_eq!(reveal.offspring_metadata.generation, 1);
    assert!([House::Thunder.id(), House::Frost.id()].contains(&reveal.offspring_house_id));
    assert_eq!(reveal.traits_hash, traits_hash(&reveal.offspring_metadata.traits).unwrap());

    // The seed is reproducible from public chain data plus the salt
    let root_a = h.chain.get_metadata(a).await.unwrap().learning_root;
    let root_b = h.chain.get_metadata(b).await.unwrap().learning_root;
    let block_hash = MemoryChain::block_hash(commit_block);
    let expected_seed = fusion_seed(a, b, &root_a, &root_b, &salt, &block_hash);
    assert_eq!(reveal.fusion_seed, expected_seed);

    // Stored by content only; no token points at it before the mint
    let stored = h
        .vault
        .get_by_hash(&reveal.vault_result.vault_hash)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.document.token_id, None);
    assert_eq!(stored.document.parents, Some([a, b]));
    assert_eq!(stored.document.fusion_seed, Some(expected_seed));
    assert_eq!(stored.document.summary, experience_label(a, b, 1));
    assert!(h.vault.get_by_token_id(3).await.unwrap().is_none());

    // User submits the reveal
    let offspring = h.submit_reveal(ALICE, a, b, &reveal).await;
    assert_eq!(offspring, reveal.offspring_token_id);
    assert!(h.chain.owner_of(a).await.is_err(), "burned parent keeps no owner");
    assert_eq!(
        h.vault.get_by_token_id(offspring).await.unwrap().unwrap().vault_hash,
        reveal.vault_result.vault_hash
    );

    let auditor = FusionAuditor::new(h.chain.clone(), h.vault.clone());
    let report = auditor.verify_token(offspring).await.unwrap();
    assert!(report.is_valid());
    assert!(report.traits_match(&reveal.traits_hash));

    let seed_audit = auditor.verify_fusion_seed(offspring, &ALICE, &salt).await.unwrap();
    assert!(seed_audit.matches());

    let wrong_salt = auditor
        .verify_fusion_seed(offspring, &ALICE, &common::salt(0x01))
        .await
        .unwrap();
    assert!(!wrong_salt.matches());

    assert!(matches!(
        h.orchestrator.prepare_reveal(a, b, &salt, &ALICE).await,
        Err(forge_fusion::FusionError::AlreadyRevealed { .. })
    ));
}

#[tokio::test]
async fn test_fusion_lifecycle_seal_keeps_parents() {
    let h = Harness::new();
    let a = h.mint_genesis(ALICE, House::Sand).await;
    let b = h.mint_genesis(ALICE, House::Aurora).await;
    let salt = salt(0x77);

    h.commit(ALICE, a, b, &salt, FusionMode::Seal).await;
    h.chain.advance_blocks(5).await;
    let reveal = h.orchestrator.prepare_reveal(a, b, &salt, &ALICE).await.unwrap();
    let offspring = h.submit_reveal(ALICE, a, b, &reveal).await;

    assert_eq!(h.chain.owner_of(a).await.unwrap(), ALICE);
    assert!(h.chain.is_sealed(a).await.unwrap());

    // Sealed parents cannot fuse again, the offspring can
    let c = h.mint_genesis(ALICE, House::Clear).await;
    assert!(matches!(
        h.orchestrator
            .prepare_commit(a, c, &salt, FusionMode::Burn, &ALICE)
            .await,
        Err(forge_fusion::FusionError::SealedParent(id)) if id == a
    ));
    assert!(h
        .orchestrator
        .prepare_commit(offspring, c, &salt, FusionMode::Burn, &ALICE)
        .await
        .is_ok());

    // A confirmed offspring fuses again with its own vault traits
    let salt = common::salt(0x78);
    h.commit(ALICE, offspring, c, &salt, FusionMode::Burn).await;
    h.chain.advance_blocks(1).await;
    let grandchild = h
        .orchestrator
        .prepare_reveal(offspring, c, &salt, &ALICE)
        .await
        .unwrap();
    assert_eq!(grandchild.offspring_metadata.generation, 2);
}

#[tokio::test]
async fn test_distinct_keys_reveal_independently() {
    let h = Harness::new();
    let a = h.mint_genesis(ALICE, House::Thunder).await;
    let b = h.mint_genesis(ALICE, House::Frost).await;
    let c = h.mint_genesis(BOB, House::Sand).await;
    let d = h.mint_genesis(BOB, House::Aurora).await;

    h.commit(ALICE, a, b, &salt(0x01), FusionMode::Burn).await;
    h.commit(BOB, c, d, &salt(0x02), FusionMode::Burn).await;
    h.chain.advance_blocks(1).await;

    // Both reveals see the same next token id and both succeed
    let alice = h.orchestrator.prepare_reveal(a, b, &salt(0x01), &ALICE).await.unwrap();
    let bob = h.orchestrator.prepare_reveal(c, d, &salt(0x02), &BOB).await.unwrap();
    assert_eq!(alice.offspring_token_id, bob.offspring_token_id);
    assert_ne!(alice.vault_result.vault_hash, bob.vault_result.vault_hash);

    // Whichever lands second gets the next id and still binds its own record
    let bob_token = h.submit_reveal(BOB, c, d, &bob).await;
    let alice_token = h.submit_reveal(ALICE, a, b, &alice).await;
    assert_eq!(alice_token, bob_token + 1);

    let auditor = FusionAuditor::new(h.chain.clone(), h.vault.clone());
    for (token, reveal) in [(alice_token, &alice), (bob_token, &bob)] {
        let report = auditor.verify_token(token).await.unwrap();
        assert!(report.is_valid());
        assert!(report.traits_match(&reveal.traits_hash));
    }
}

#[tokio::test]
async fn test_wrong_salt_then_retry() {
    let h = Harness::new();
    let a = h.mint_genesis(ALICE, House::Clear).await;
    let b = h.mint_genesis(ALICE, House::Eclipse).await;
    let salt = salt(0x10);

    h.commit(ALICE, a, b, &salt, FusionMode::Burn).await;
    h.chain.advance_blocks(1).await;

    // A mistyped salt still derives a seed; the chain rejects it at reveal time
    let mistyped = h
        .orchestrator
        .prepare_reveal(a, b, &common::salt(0x11), &ALICE)
        .await
        .unwrap();
    let retry = h.orchestrator.prepare_reveal(a, b, &salt, &ALICE).await.unwrap();
    assert_ne!(mistyped.fusion_seed, retry.fusion_seed);
    assert_ne!(mistyped.vault_result.vault_hash, retry.vault_result.vault_hash);

    let offspring = h.submit_reveal(ALICE, a, b, &retry).await;
    let bound = h.vault.get_by_token_id(offspring).await.unwrap().unwrap();
    assert_eq!(bound.vault_hash, retry.vault_result.vault_hash);

    // The stray record cannot be bound over the confirmed one
    assert!(matches!(
        h.vault
            .bind_token(offspring, &mistyped.vault_result.vault_hash)
            .await,
        Err(VaultError::AlreadyExists(_))
    ));
    let seed_audit = FusionAuditor::new(h.chain.clone(), h.vault.clone())
        .verify_fusion_seed(offspring, &ALICE, &salt)
        .await
        .unwrap();
    assert!(seed_audit.matches());
}

#[tokio::test]
async fn test_confirm_reveal_guards() {
    let h = Harness::new();
    let a = h.mint_genesis(ALICE, House::Monsoon).await;
    assert!(matches!(
        h.orchestrator.confirm_reveal(a).await,
        Err(forge_fusion::FusionError::InvalidMetadata { token_id, .. }) if token_id == a
    ));

    // Offspring minted with a vault hash nobody stored
    let b = h.mint_genesis(ALICE, House::Frost).await;
    h.commit(ALICE, a, b, &salt(0x20), FusionMode::Seal).await;
    h.chain.advance_blocks(1).await;
    let orphan = h
        .chain
        .reveal_fusion(
            ALICE,
            a,
            b,
            TokenMetadata {
                house_id: House::Frost.id(),
                rarity_tier: 0,
                vault_hash: Hash::digest(b"never stored"),
                learning_root: Hash::digest(b"never stored root"),
            },
        )
        .await
        .unwrap();
    assert!(matches!(
        h.orchestrator.confirm_reveal(orphan).await,
        Err(forge_fusion::FusionError::TraitsUnavailable(id)) if id == orphan
    ));
}

#[tokio::test]
async fn test_reveal_is_idempotent() {
    let h = Harness::new();
    let a = h.mint_genesis(ALICE, House::Monsoon).await;
    let b = h.mint_genesis(ALICE, House::Eclipse).await;
    let salt = salt(0x33);

    h.commit(ALICE, a, b, &salt, FusionMode::Burn).await;
    h.chain.advance_blocks(2).await;

    let first = h.orchestrator.prepare_reveal(a, b, &salt, &ALICE).await.unwrap();
    let second = h.orchestrator.prepare_reveal(a, b, &salt, &ALICE).await.unwrap();

    assert_eq!(first.fusion_seed, second.fusion_seed);
    assert_eq!(first.traits_hash, second.traits_hash);
    assert_eq!(first.vault_result.vault_hash, second.vault_result.vault_hash);
    assert_eq!(first, second);
    // 2 genesis records plus one offspring
    assert_eq!(h.vault.len().await, 3);
}

#[tokio::test]
async fn test_calldata_encoding() {
    let h = Harness::new();
    let a = h.mint_genesis(ALICE, House::Clear).await;
    let b = h.mint_genesis(ALICE, House::Thunder).await;
    let salt = salt(0x42);

    let commit = h
        .orchestrator
        .prepare_commit(a, b, &salt, FusionMode::Seal, &ALICE)
        .await
        .unwrap();
    let commit_data = h.orchestrator.encode_commit_calldata(&commit);
    assert_eq!(&commit_data[..4], &abi::selector::COMMIT_FUSION);
    assert_eq!(commit_data.len(), 4 + 4 * 32);
    let reader = abi::AbiReader::new(&commit_data[4..]);
    assert_eq!(reader.bytes32(2).unwrap(), commit.commit_hash);
    assert_eq!(reader.uint(3).unwrap(), 1);

    h.chain
        .commit_fusion(ALICE, a, b, commit.commit_hash, FusionMode::Seal)
        .await
        .unwrap();
    h.chain.advance_blocks(1).await;
    let reveal = h.orchestrator.prepare_reveal(a, b, &salt, &ALICE).await.unwrap();

    let data = h
        .orchestrator
        .encode_reveal_calldata(a, b, &salt, &reveal)
        .unwrap();
    assert_eq!(&data[..4], &abi::selector::REVEAL_FUSION);

    let reader = abi::AbiReader::new(&data[4..]);
    assert_eq!(reader.uint(0).unwrap(), a);
    assert_eq!(reader.uint(1).unwrap(), b);
    assert_eq!(reader.bytes32(2).unwrap(), salt);
    assert_eq!(reader.string(3).unwrap(), reveal.vault_result.vault_uri);
    assert_eq!(reader.bytes32(4).unwrap(), reveal.vault_result.vault_hash);
    assert_eq!(reader.bytes32(5).unwrap(), reveal.vault_result.learning_root);
    assert_eq!(
        reader.string(6).unwrap(),
        canonical_json(&reveal.offspring_metadata.persona).unwrap()
    );
    assert_eq!(reader.string(7).unwrap(), experience_label(a, b, 1));
    assert_eq!(reader.uint(8).unwrap(), u64::from(reveal.offspring_house_id));

    let recipe = RenderRecipe::from_reveal(&reveal).unwrap();
    assert_eq!(recipe.token_id, reveal.offspring_token_id);
    assert_eq!(recipe.seed, reveal.fusion_seed);
}

#[tokio::test]
async fn test_file_vault_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = FusionConfig::default();
    let chain = Arc::new(MemoryChain::new(500));
    let vault = Arc::new(FileVault::new(dir.path(), config.vault_uri_prefix.clone()));
    let generator = Arc::new(SeededTraitGenerator::new(config.generator.clone()));
    let orchestrator =
        FusionOrchestrator::new(chain.clone(), vault.clone(), generator.clone(), config);

    let a = mint_genesis_into(&chain, vault.as_ref(), &generator, ALICE, House::Frost).await;
    let b = mint_genesis_into(&chain, vault.as_ref(), &generator, ALICE, House::Sand).await;
    let salt = salt(0x99);

    let commit = orchestrator
        .prepare_commit(a, b, &salt, FusionMode::Burn, &ALICE)
        .await
        .unwrap();
    chain
        .commit_fusion(ALICE, a, b, commit.commit_hash, FusionMode::Burn)
        .await
        .unwrap();
    chain.advance_blocks(3).await;

    let reveal = orchestrator.prepare_reveal(a, b, &salt, &ALICE).await.unwrap();

    // Reading the record back from disk reproduces the committed hash
    let record = vault
        .get_by_hash(&reveal.vault_result.vault_hash)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.document.vault_hash().unwrap(), reveal.vault_result.vault_hash);
    assert_eq!(record.learning_root, reveal.vault_result.learning_root);
    assert_eq!(
        traits_hash(&record.document.traits).unwrap(),
        reveal.traits_hash
    );

    let again = orchestrator.prepare_reveal(a, b, &salt, &ALICE).await.unwrap();
    assert_eq!(again.vault_result, reveal.vault_result);

    let offspring = chain
        .reveal_fusion(
            ALICE,
            a,
            b,
            TokenMetadata {
                house_id: reveal.offspring_house_id,
                rarity_tier: reveal.offspring_metadata.rarity_tier.as_u8(),
                vault_hash: reveal.vault_result.vault_hash,
                learning_root: reveal.vault_result.learning_root,
            },
        )
        .await
        .unwrap();
    let confirmed = orchestrator.confirm_reveal(offspring).await.unwrap();
    assert_eq!(vault.get_by_token_id(offspring).await.unwrap(), Some(confirmed));
}

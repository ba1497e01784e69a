//! # HouseForge Core
//!
//! Deterministic building blocks shared by every HouseForge crate:
//! - [`Hash`] / [`Address`]: 32-byte commitments and 20-byte accounts
//! - [`SeededRng`]: hash-chain PRNG with derivable substreams
//! - [`commitment`]: vault hash, learning root, traits hash, fusion seed, commit hash
//! - [`canonical_json`]: the single canonical serialization used for hashing
//! - Agent model: [`House`], [`RarityTier`], [`TraitKey`], [`TraitSet`], [`ParentInfo`]

pub mod agent;
pub mod canonical;
pub mod commitment;
pub mod hash;
pub mod rng;

pub use agent::{
    FusionMode, GeneratedMetadata, House, ParentInfo, RarityTier, TokenId, TraitKey, TraitSet,
};
pub use canonical::{canonical_bytes, canonical_json, CanonicalError};
pub use commitment::{commit_hash, fusion_seed, learning_root, traits_hash, vault_hash};
pub use hash::{u64_word, Address, Hash, ParseHexError};
pub use rng::{RngError, SeededRng};

//! Hash functions binding off-chain content to on-chain commitments
//!
//! JSON content is hashed over its canonical form. Fixed-width inputs are
//! hashed as a sequence of 32-byte ABI words (`sha256(abi.encode(...))` on
//! the contract side), so no two distinct argument tuples share an encoding.

use serde::Serialize;

use crate::agent::{FusionMode, TokenId, TraitSet};
use crate::canonical::{canonical_bytes, CanonicalError};
use crate::hash::{u64_word, Address, Hash};

/// `H(canonical_json(document))`
pub fn vault_hash<T: Serialize + ?Sized>(document: &T) -> Result<Hash, CanonicalError> {
    Ok(Hash::digest(&canonical_bytes(document)?))
}

/// `H(vault_hash ‖ H(summary))`
pub fn learning_root(vault_hash: &Hash, summary: &str) -> Hash {
    Hash::combine(vault_hash, &Hash::digest(summary.as_bytes()))
}

/// `H(canonical_json(traits))`
pub fn traits_hash(traits: &TraitSet) -> Result<Hash, CanonicalError> {
    Ok(Hash::digest(&canonical_bytes(traits)?))
}

/// Derive the randomness root of one fusion event.
///
/// `salt` is secret to the user until reveal and `commit_block_hash` is
/// unknown to everyone at commit time, so neither side can steer the result.
pub fn fusion_seed(
    parent_a: TokenId,
    parent_b: TokenId,
    learning_root_a: &Hash,
    learning_root_b: &Hash,
    salt: &Hash,
    commit_block_hash: &Hash,
) -> Hash {
    Hash::digest_words(&[
        u64_word(parent_a),
        u64_word(parent_b),
        learning_root_a.0,
        learning_root_b.0,
        salt.0,
        commit_block_hash.0,
    ])
}

/// Commitment the user submits with `commitFusion`
pub fn commit_hash(
    parent_a: TokenId,
    parent_b: TokenId,
    salt: &Hash,
    block_number: u64,
    user: &Address,
    mode: FusionMode,
) -> Hash {
    Hash::digest_words(&[
        u64_word(parent_a),
        u64_word(parent_b),
        salt.0,
        u64_word(block_number),
        user.to_word(),
        u64_word(u64::from(mode.as_u8())),
    ])
}

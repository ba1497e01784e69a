//! Seeded hash-chain PRNG
//!
//! Every draw is `H(seed ‖ be_bytes32(offset))` followed by `offset += 1`.
//! There is no other entropy: two streams with the same seed and the same
//! sequence of calls produce the same values on every platform, which is
//! what lets a third party replay trait generation from an on-chain seed.
//!
//! Substreams created with [`SeededRng::derive`] are keyed only by the
//! parent seed and a label, so adding a draw in one trait category never
//! shifts the values produced for another.

use serde::{Deserialize, Serialize};

use crate::hash::{u64_word, Hash};

/// Errors raised by invalid draw arguments
///
/// These are configuration mistakes, never transient conditions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RngError {
    #[error("cannot draw from an empty input")]
    EmptyInput,

    #[error("invalid weight: {0}")]
    InvalidWeight(String),

    #[error("modulus must be non-zero")]
    ZeroModulus,
}

/// Deterministic random stream rooted at a 256-bit seed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeededRng {
    seed: Hash,
    offset: u32,
}

impl SeededRng {
    pub fn new(seed: Hash) -> Self {
        Self { seed, offset: 0 }
    }

    pub fn seed(&self) -> &Hash {
        &self.seed
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Rewind or fast-forward the stream (replay tooling)
    pub fn set_offset(&mut self, offset: u32) {
        self.offset = offset;
    }

    /// The single source of randomness for every other draw
    pub fn next_hash(&mut self) -> Hash {
        let hash = Hash::digest_words(&[self.seed.0, u64_word(u64::from(self.offset))]);
        self.offset = self.offset.wrapping_add(1);
        hash
    }

    /// Uniform-ish float in `[0, 1]`.
    ///
    /// Divides by `u32::MAX`, not `2^32`, to stay bit-compatible with
    /// historical outputs. The value `1.0` is reachable with probability
    /// `2^-32`; integer draws clamp it.
    pub fn random(&mut self) -> f64 {
        f64::from(self.next_hash().leading_u32()) / f64::from(u32::MAX)
    }

    /// Integer in `[min, max)`. Returns `min` when the range is empty.
    pub fn random_int(&mut self, min: i64, max: i64) -> i64 {
        let roll = self.random();
        if max <= min {
            return min;
        }
        let span = max as f64 - min as f64;
        let value = (roll * span).floor() as i64 + min;
        value.min(max - 1)
    }

    pub fn random_int_max(&mut self, max: i64) -> i64 {
        self.random_int(0, max)
    }

    /// Uniform choice from `items`
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Result<&'a T, RngError> {
        if items.is_empty() {
            return Err(RngError::EmptyInput);
        }
        let index = self.random_int_max(items.len() as i64) as usize;
        Ok(&items[index])
    }

    /// Weighted choice by subtractive walk over `(item, weight)` pairs.
    ///
    /// If floating-point rounding leaves the roll positive after the walk,
    /// the last item is returned.
    pub fn weighted_pick<'a, T>(&mut self, items: &'a [(T, f64)]) -> Result<&'a T, RngError> {
        if items.is_empty() {
            return Err(RngError::EmptyInput);
        }
        if let Some((_, w)) = items.iter().find(|(_, w)| !w.is_finite() || *w < 0.0) {
            return Err(RngError::InvalidWeight(format!(
                "weight {} is not a finite non-negative number",
                w
            )));
        }
        let total: f64 = items.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return Err(RngError::InvalidWeight(format!(
                "total weight {} must be positive",
                total
            )));
        }

        let mut roll = self.random() * total;
        for (item, weight) in items {
            roll -= weight;
            if roll <= 0.0 {
                return Ok(item);
            }
        }

        // Rounding fallback
        Ok(&items[items.len() - 1].0)
    }

    /// Fisher-Yates shuffle into a new vector; `items` is left untouched
    pub fn shuffle<T: Clone>(&mut self, items: &[T]) -> Vec<T> {
        let mut out = items.to_vec();
        for i in (1..out.len()).rev() {
            let j = self.random_int_max(i as i64 + 1) as usize;
            out.swap(i, j);
        }
        out
    }

    pub fn chance(&mut self, probability: f64) -> bool {
        self.random() < probability
    }

    /// Mythic-style trigger: `(u32(next_hash) % modulus) == expected`
    pub fn check_modulo(&mut self, modulus: u32, expected: u32) -> Result<bool, RngError> {
        if modulus == 0 {
            return Err(RngError::ZeroModulus);
        }
        Ok(self.next_hash().leading_u32() % modulus == expected)
    }

    /// Independent substream seeded by `H(seed ‖ pad32(label))`.
    ///
    /// Labels longer than 32 bytes are hashed first. The parent's offset
    /// is neither read nor advanced.
    pub fn derive(&self, label: &str) -> SeededRng {
        let child = Hash::digest_words(&[self.seed.0, pad32(label)]);
        tracing::trace!(parent = %self.seed, label, child = %child, "derived substream");
        SeededRng::new(child)
    }
}

fn pad32(label: &str) -> [u8; 32] {
    let bytes = label.as_bytes();
    if bytes.len() > 32 {
        return Hash::digest(bytes).0;
    }
    let mut word = [0u8; 32];
    word[..bytes.len()].copy_from_slice(bytes);
    word
}

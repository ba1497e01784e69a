//! Agent model: houses, rarity tiers, typed trait sets, parent context

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::hash::Hash;

/// On-chain token identifier
pub type TokenId = u64;

/// The seven houses an agent can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum House {
    Clear,
    Monsoon,
    Thunder,
    Frost,
    Aurora,
    Sand,
    Eclipse,
}

impl House {
    pub const ALL: [House; 7] = [
        House::Clear,
        House::Monsoon,
        House::Thunder,
        House::Frost,
        House::Aurora,
        House::Sand,
        House::Eclipse,
    ];

    /// On-chain house id (1-based)
    pub fn id(self) -> u8 {
        match self {
            House::Clear => 1,
            House::Monsoon => 2,
            House::Thunder => 3,
            House::Frost => 4,
            House::Aurora => 5,
            House::Sand => 6,
            House::Eclipse => 7,
        }
    }

    pub fn from_id(id: u8) -> Option<House> {
        House::ALL.into_iter().find(|h| h.id() == id)
    }

    /// Renderer-facing key, e.g. `"THUNDER"`
    pub fn key(self) -> &'static str {
        match self {
            House::Clear => "CLEAR",
            House::Monsoon => "MONSOON",
            House::Thunder => "THUNDER",
            House::Frost => "FROST",
            House::Aurora => "AURORA",
            House::Sand => "SAND",
            House::Eclipse => "ECLIPSE",
        }
    }
}

impl fmt::Display for House {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RarityTier {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Mythic,
}

impl RarityTier {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<RarityTier> {
        match value {
            0 => Some(RarityTier::Common),
            1 => Some(RarityTier::Uncommon),
            2 => Some(RarityTier::Rare),
            3 => Some(RarityTier::Epic),
            4 => Some(RarityTier::Legendary),
            5 => Some(RarityTier::Mythic),
            _ => None,
        }
    }

    /// Next tier up, capped at `Legendary` (mythic is only reached by trigger)
    pub fn promoted(self) -> RarityTier {
        match self {
            RarityTier::Common => RarityTier::Uncommon,
            RarityTier::Uncommon => RarityTier::Rare,
            RarityTier::Rare => RarityTier::Epic,
            RarityTier::Epic | RarityTier::Legendary => RarityTier::Legendary,
            RarityTier::Mythic => RarityTier::Mythic,
        }
    }
}

/// How the parents are treated when a fusion is revealed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FusionMode {
    /// Both parents are burned
    Burn,
    /// Both parents are sealed and kept
    Seal,
}

impl FusionMode {
    pub fn as_u8(self) -> u8 {
        match self {
            FusionMode::Burn => 0,
            FusionMode::Seal => 1,
        }
    }

    pub fn from_u8(value: u8) -> Option<FusionMode> {
        match value {
            0 => Some(FusionMode::Burn),
            1 => Some(FusionMode::Seal),
            _ => None,
        }
    }
}

/// Known trait categories. String keys exist only at the JSON boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TraitKey {
    FrameType,
    SurfaceAging,
    CoreMaterial,
    DioramaGeometry,
    LightSignature,
    Atmosphere,
    LensBloom,
    PaletteTemperature,
}

impl TraitKey {
    pub const ALL: [TraitKey; 8] = [
        TraitKey::FrameType,
        TraitKey::SurfaceAging,
        TraitKey::CoreMaterial,
        TraitKey::DioramaGeometry,
        TraitKey::LightSignature,
        TraitKey::Atmosphere,
        TraitKey::LensBloom,
        TraitKey::PaletteTemperature,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TraitKey::FrameType => "FrameType",
            TraitKey::SurfaceAging => "SurfaceAging",
            TraitKey::CoreMaterial => "CoreMaterial",
            TraitKey::DioramaGeometry => "DioramaGeometry",
            TraitKey::LightSignature => "LightSignature",
            TraitKey::Atmosphere => "Atmosphere",
            TraitKey::LensBloom => "LensBloom",
            TraitKey::PaletteTemperature => "PaletteTemperature",
        }
    }
}

/// A generated trait set: `TraitKey -> value`
///
/// Deserializing rejects unknown keys, so a vault record with a misspelled
/// trait fails loudly instead of hashing to a different commitment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraitSet(BTreeMap<TraitKey, String>);

impl TraitSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: TraitKey, value: impl Into<String>) -> Option<String> {
        self.0.insert(key, value.into())
    }

    pub fn get(&self, key: TraitKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TraitKey, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Validate a loosely-typed JSON object into a trait set
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

impl FromIterator<(TraitKey, String)> for TraitSet {
    fn from_iter<I: IntoIterator<Item = (TraitKey, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Everything fusion needs to know about one parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentInfo {
    pub token_id: TokenId,
    pub house: House,
    pub rarity_tier: RarityTier,
    pub generation: u32,
    pub traits: TraitSet,
    pub learning_root: Hash,
    /// Persona recorded in the parent's vault (`Null` if none)
    #[serde(default)]
    pub persona: serde_json::Value,
}

/// Output of the trait-generation contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMetadata {
    pub token_id: TokenId,
    pub traits: TraitSet,
    pub persona: serde_json::Value,
    pub generation: u32,
    pub rarity_tier: RarityTier,
    pub is_mythic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mythic_key: Option<String>,
}

//! Trait generation
//!
//! [`TraitGenerator`] is the contract the orchestrator consumes: a pure
//! function of the offspring id, both parents and the fusion seed.
//! [`SeededTraitGenerator`] is the reference implementation. Each trait key
//! draws from its own derived stream (`trait:<Key>`), as do rarity, the
//! mythic trigger and the persona, so the decisions never shift one another.

use forge_core::{
    GeneratedMetadata, Hash, House, ParentInfo, RarityTier, RngError, SeededRng, TokenId,
    TraitKey, TraitSet,
};
use serde_json::{json, Map, Value};

use crate::config::GeneratorConfig;

/// Deterministic trait generation contract
pub trait TraitGenerator: Send + Sync {
    /// Offspring metadata for a fusion; identical inputs give identical output
    fn generate_fusion_metadata(
        &self,
        offspring_token_id: TokenId,
        parent_a: &ParentInfo,
        parent_b: &ParentInfo,
        fusion_seed: &Hash,
    ) -> Result<GeneratedMetadata, RngError>;
}

const FRAME_TYPES: &[(&str, f64)] = &[
    ("BrushedSteel", 14.0),
    ("PolishedBrass", 12.0),
    ("AntiqueBronze", 12.0),
    ("WhiteGold", 8.0),
    ("BlackTitanium", 8.0),
    ("CopperVerde", 12.0),
    ("RoseGold", 10.0),
    ("PlatinumMatte", 10.0),
    ("MirrorChrome", 6.0),
    ("GunmetalBlue", 8.0),
];

const SURFACE_AGING: &[(&str, f64)] = &[
    ("Pristine", 30.0),
    ("SlightWear", 30.0),
    ("LightPatina", 20.0),
    ("WeatheredGrace", 15.0),
    ("AncientRelic", 5.0),
];

const CORE_MATERIALS: &[(&str, f64)] = &[
    ("ClearCrystal", 14.0),
    ("CloudGlass", 14.0),
    ("LiquidMercury", 10.0),
    ("MoltenAmber", 12.0),
    ("VoidObsidian", 8.0),
    ("FrozenPlasma", 10.0),
    ("StormEssence", 8.0),
    ("DesertQuartz", 12.0),
    ("AuroraSilk", 7.0),
    ("EclipseCore", 5.0),
];

const DIORAMA_GEOMETRY: &[(&str, f64)] = &[
    ("Sphere", 30.0),
    ("WaterDrop", 20.0),
    ("PlasmaOrb", 18.0),
    ("IceCrystal", 15.0),
    ("Pyramid", 12.0),
    ("BlackHole", 5.0),
];

const LIGHT_SIGNATURES: &[(&str, f64)] = &[
    ("Sunbeam", 9.0),
    ("PrismaticRay", 6.0),
    ("NeonRain", 8.0),
    ("WetGlow", 8.0),
    ("LightningFork", 7.0),
    ("IonBloom", 6.0),
    ("PolarGlow", 8.0),
    ("FrostScatter", 7.0),
    ("AuroraRibbon", 7.0),
    ("SpectrumVeil", 5.0),
    ("GoldenHaze", 8.0),
    ("DustHalo", 7.0),
    ("EclipseHalo", 5.0),
    ("RingRim", 5.0),
];

const ATMOSPHERES: &[(&str, f64)] = &[
    ("Clear", 25.0),
    ("MistVeil", 15.0),
    ("RainCurtain", 12.0),
    ("DustStorm", 10.0),
    ("SnowDrift", 12.0),
    ("ThunderCloud", 10.0),
    ("AuroraWisp", 9.0),
    ("EclipseShadow", 7.0),
];

const LENS_BLOOM: &[(&str, f64)] = &[
    ("None", 25.0),
    ("Subtle", 30.0),
    ("Moderate", 25.0),
    ("Intense", 15.0),
    ("Cinematic", 5.0),
];

const PALETTE_TEMPERATURE: &[(&str, f64)] = &[
    ("Warm", 25.0),
    ("Cool", 25.0),
    ("Neutral", 25.0),
    ("HighContrast", 15.0),
    ("Desaturated", 10.0),
];

const GENESIS_RARITY: &[(RarityTier, f64)] = &[
    (RarityTier::Common, 50.0),
    (RarityTier::Uncommon, 25.0),
    (RarityTier::Rare, 15.0),
    (RarityTier::Epic, 7.0),
    (RarityTier::Legendary, 3.0),
];

/// Mythic key and the trait it overrides
const MYTHIC_OVERRIDES: &[(&str, TraitKey, &str)] = &[
    ("Singularity", TraitKey::DioramaGeometry, "BlackHole"),
    ("Prismheart", TraitKey::LightSignature, "SpectrumVeil"),
    ("Stormcrown", TraitKey::CoreMaterial, "StormEssence"),
    ("EternalEclipse", TraitKey::CoreMaterial, "EclipseCore"),
    ("AuroraBorn", TraitKey::CoreMaterial, "AuroraSilk"),
    ("MirrorSaint", TraitKey::FrameType, "MirrorChrome"),
];

const TEMPERAMENTS: &[&str] = &["stoic", "curious", "volatile", "serene", "playful", "stern"];
const PERSONA_AXES: &[&str] = &["boldness", "curiosity", "focus", "warmth"];
const PERSONA_DRIFT: i64 = 10;

/// Probability a genesis agent carries its house's signature light
const HOUSE_LIGHT_AFFINITY: f64 = 0.6;

/// Weighted value catalogue for a trait key
pub fn catalogue(key: TraitKey) -> &'static [(&'static str, f64)] {
    match key {
        TraitKey::FrameType => FRAME_TYPES,
        TraitKey::SurfaceAging => SURFACE_AGING,
        TraitKey::CoreMaterial => CORE_MATERIALS,
        TraitKey::DioramaGeometry => DIORAMA_GEOMETRY,
        TraitKey::LightSignature => LIGHT_SIGNATURES,
        TraitKey::Atmosphere => ATMOSPHERES,
        TraitKey::LensBloom => LENS_BLOOM,
        TraitKey::PaletteTemperature => PALETTE_TEMPERATURE,
    }
}

/// Signature light of each house
pub fn house_light(house: House) -> &'static str {
    match house {
        House::Clear => "Sunbeam",
        House::Monsoon => "NeonRain",
        House::Thunder => "LightningFork",
        House::Frost => "PolarGlow",
        House::Aurora => "AuroraRibbon",
        House::Sand => "GoldenHaze",
        House::Eclipse => "EclipseHalo",
    }
}

fn trait_stream(root: &SeededRng, key: TraitKey) -> SeededRng {
    root.derive(&format!("trait:{}", key.as_str()))
}

/// Reference [`TraitGenerator`] over [`SeededRng`] substreams
#[derive(Debug, Clone, Default)]
pub struct SeededTraitGenerator {
    config: GeneratorConfig,
}

impl SeededTraitGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Metadata for a freshly minted (generation 0) agent
    pub fn generate_genesis(
        &self,
        token_id: TokenId,
        house: House,
        seed: &Hash,
    ) -> Result<GeneratedMetadata, RngError> {
        let root = SeededRng::new(*seed);

        let mut traits = TraitSet::new();
        for key in TraitKey::ALL {
            let mut rng = trait_stream(&root, key);
            let value = if key == TraitKey::LightSignature && rng.chance(HOUSE_LIGHT_AFFINITY) {
                house_light(house)
            } else {
                *rng.weighted_pick(catalogue(key))?
            };
            traits.insert(key, value);
        }

        let mut rarity = *root.derive("rarity").weighted_pick(GENESIS_RARITY)?;
        let mythic_key = self.roll_mythic(&root, &mut traits)?;
        if mythic_key.is_some() {
            rarity = RarityTier::Mythic;
        }
        let persona = self.persona(&root, [&Value::Null, &Value::Null])?;

        tracing::debug!(token_id, house = %house, rarity = ?rarity, "generated genesis traits");

        Ok(GeneratedMetadata {
            token_id,
            traits,
            persona,
            generation: 0,
            rarity_tier: rarity,
            is_mythic: mythic_key.is_some(),
            mythic_key,
        })
    }

    fn inherit_trait(
        &self,
        root: &SeededRng,
        key: TraitKey,
        parent_a: &ParentInfo,
        parent_b: &ParentInfo,
    ) -> Result<String, RngError> {
        let mut rng = trait_stream(root, key);
        let mutate = rng.chance(self.config.mutation_chance);
        let take_a = rng.chance(0.5);

        let from_a = parent_a.traits.get(key);
        let from_b = parent_b.traits.get(key);
        let inherited = if take_a {
            from_a.or(from_b)
        } else {
            from_b.or(from_a)
        };

        match inherited {
            Some(value) if !mutate => Ok(value.to_string()),
            _ => Ok(rng.weighted_pick(catalogue(key))?.to_string()),
        }
    }

    /// Mythic trigger on the `mythic` stream; applies the override trait
    fn roll_mythic(
        &self,
        root: &SeededRng,
        traits: &mut TraitSet,
    ) -> Result<Option<String>, RngError> {
        let mut rng = root.derive("mythic");
        if !rng.check_modulo(self.config.mythic_modulus, 0)? {
            return Ok(None);
        }
        let (mythic_key, key, value) = rng.pick(MYTHIC_OVERRIDES)?;
        traits.insert(*key, *value);
        Ok(Some(mythic_key.to_string()))
    }

    /// Temperament plus numeric axes in `[0, 100]`, blended from parents when present
    fn persona(&self, root: &SeededRng, parents: [&Value; 2]) -> Result<Value, RngError> {
        let mut rng = root.derive("persona");

        let inherited: Vec<&str> = parents
            .iter()
            .filter_map(|p| p.get("temperament").and_then(Value::as_str))
            .collect();
        let temperament = if !inherited.is_empty() && !rng.chance(self.config.mutation_chance) {
            rng.pick(&inherited)?.to_string()
        } else {
            rng.pick(TEMPERAMENTS)?.to_string()
        };

        let mut axes = Map::new();
        for axis in PERSONA_AXES {
            let values: Vec<i64> = parents
                .iter()
                .filter_map(|p| p.get("axes").and_then(|a| a.get(*axis)).and_then(Value::as_i64))
                .collect();
            let value = if values.is_empty() {
                rng.random_int(0, 101)
            } else {
                let mean = values.iter().sum::<i64>() / values.len() as i64;
                (mean + rng.random_int(-PERSONA_DRIFT, PERSONA_DRIFT + 1)).clamp(0, 100)
            };
            axes.insert(axis.to_string(), Value::from(value));
        }

        Ok(json!({ "temperament": temperament, "axes": axes }))
    }
}

impl TraitGenerator for SeededTraitGenerator {
    fn generate_fusion_metadata(
        &self,
        offspring_token_id: TokenId,
        parent_a: &ParentInfo,
        parent_b: &ParentInfo,
        fusion_seed: &Hash,
    ) -> Result<GeneratedMetadata, RngError> {
        let root = SeededRng::new(*fusion_seed);

        let mut traits = TraitSet::new();
        for key in TraitKey::ALL {
            traits.insert(key, self.inherit_trait(&root, key, parent_a, parent_b)?);
        }

        // Mythic parents pass on Legendary; Mythic itself needs a fresh trigger
        let base = parent_a
            .rarity_tier
            .max(parent_b.rarity_tier)
            .min(RarityTier::Legendary);
        let mut rarity = if root.derive("rarity").chance(self.config.promotion_chance) {
            base.promoted()
        } else {
            base
        };

        let mythic_key = self.roll_mythic(&root, &mut traits)?;
        if mythic_key.is_some() {
            rarity = RarityTier::Mythic;
        }

        let persona = self.persona(&root, [&parent_a.persona, &parent_b.persona])?;
        let generation = parent_a.generation.max(parent_b.generation).saturating_add(1);

        tracing::debug!(
            offspring_token_id,
            parent_a = parent_a.token_id,
            parent_b = parent_b.token_id,
            generation,
            mythic = mythic_key.is_some(),
            "generated fusion traits"
        );

        Ok(GeneratedMetadata {
            token_id: offspring_token_id,
            traits,
            persona,
            generation,
            rarity_tier: rarity,
            is_mythic: mythic_key.is_some(),
            mythic_key,
        })
    }
}

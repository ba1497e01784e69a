//! Render recipe handoff
//!
//! The JSON document an external renderer consumes. Data only; nothing here
//! renders.

use forge_core::{Hash, House, TokenId, TraitSet};
use forge_vault::VaultRecord;
use serde::{Deserialize, Serialize};

use crate::error::FusionError;
use crate::orchestrator::RevealResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSettings {
    pub engine: String,
    pub samples: u32,
    pub denoise: bool,
    pub adaptive_sampling: bool,
    pub max_bounces: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            engine: "CYCLES".to_string(),
            samples: 96,
            denoise: true,
            adaptive_sampling: true,
            max_bounces: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSettings {
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub quality: u8,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            format: "WEBP".to_string(),
            quality: 90,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRecipe {
    pub token_id: TokenId,
    pub house_key: String,
    /// Seed the renderer uses for its own jitter
    pub seed: Hash,
    pub traits: TraitSet,
    pub output: OutputSettings,
    pub render_settings: RenderSettings,
}

impl RenderRecipe {
    /// Recipe for a freshly revealed offspring
    pub fn from_reveal(reveal: &RevealResult) -> Result<Self, FusionError> {
        let house = House::from_id(reveal.offspring_house_id).ok_or_else(|| {
            FusionError::InvalidMetadata {
                token_id: reveal.offspring_token_id,
                reason: format!("unknown house id {}", reveal.offspring_house_id),
            }
        })?;
        Ok(Self {
            token_id: reveal.offspring_token_id,
            house_key: house.key().to_string(),
            seed: reveal.fusion_seed,
            traits: reveal.offspring_metadata.traits.clone(),
            output: OutputSettings::default(),
            render_settings: RenderSettings::default(),
        })
    }

    /// Recipe for `token_id` from its vault record; genesis agents use their
    /// vault hash as seed
    pub fn from_vault_record(token_id: TokenId, record: &VaultRecord) -> Self {
        let document = &record.document;
        Self {
            token_id,
            house_key: document.house.key().to_string(),
            seed: document.fusion_seed.unwrap_or(record.vault_hash),
            traits: document.traits.clone(),
            output: OutputSettings::default(),
            render_settings: RenderSettings::default(),
        }
    }

    pub fn with_output(mut self, output: OutputSettings) -> Self {
        self.output = output;
        self
    }

    pub fn with_render_settings(mut self, settings: RenderSettings) -> Self {
        self.render_settings = settings;
        self
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

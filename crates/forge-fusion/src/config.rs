//! Configuration management for HouseForge fusion
//!
//! Reveal timing, generator tuning, vault location and chain endpoint,
//! all loadable from `FORGE_*` environment variables.

use forge_chain::RpcChainConfig;
use forge_core::Address;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Tuning for [`SeededTraitGenerator`](crate::SeededTraitGenerator)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Probability that a trait ignores both parents (env: FORGE_MUTATION_CHANCE)
    pub mutation_chance: f64,
    /// Probability that rarity climbs one tier (env: FORGE_PROMOTION_CHANCE)
    pub promotion_chance: f64,
    /// Mythic fires when `u32 % mythic_modulus == 0` (env: FORGE_MYTHIC_MODULUS)
    pub mythic_modulus: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            mutation_chance: 0.15,
            promotion_chance: 0.1,
            mythic_modulus: 1000,
        }
    }
}

/// Full fusion configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Blocks that must pass after the commit before a reveal (env: FORGE_MIN_REVEAL_DELAY)
    pub min_reveal_delay: u64,
    /// Last block offset at which a reveal is accepted (env: FORGE_REVEAL_WINDOW)
    pub reveal_window: u64,
    pub generator: GeneratorConfig,
    /// Directory for the file vault (env: FORGE_VAULT_DIR)
    pub vault_dir: Option<PathBuf>,
    /// Prefix for vault URIs (env: FORGE_VAULT_URI_PREFIX)
    pub vault_uri_prefix: String,
    /// JSON-RPC endpoint (env: FORGE_RPC_URL)
    pub rpc_url: Option<String>,
    /// Fusion contract address (env: FORGE_CONTRACT_ADDRESS)
    pub contract_address: Option<Address>,
    /// JSON-RPC request timeout in seconds (env: FORGE_RPC_TIMEOUT_SECS)
    pub rpc_timeout_secs: u64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            min_reveal_delay: 1,
            reveal_window: 250,
            generator: GeneratorConfig::default(),
            vault_dir: None,
            vault_uri_prefix: "vault://houseforge".to_string(),
            rpc_url: None,
            contract_address: None,
            rpc_timeout_secs: 30,
        }
    }
}

impl FusionConfig {
    /// Load from environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            min_reveal_delay: parse_or(
                &lookup,
                "FORGE_MIN_REVEAL_DELAY",
                defaults.min_reveal_delay,
            )?,
            reveal_window: parse_or(&lookup, "FORGE_REVEAL_WINDOW", defaults.reveal_window)?,
            generator: GeneratorConfig {
                mutation_chance: parse_or(
                    &lookup,
                    "FORGE_MUTATION_CHANCE",
                    defaults.generator.mutation_chance,
                )?,
                promotion_chance: parse_or(
                    &lookup,
                    "FORGE_PROMOTION_CHANCE",
                    defaults.generator.promotion_chance,
                )?,
                mythic_modulus: parse_or(
                    &lookup,
                    "FORGE_MYTHIC_MODULUS",
                    defaults.generator.mythic_modulus,
                )?,
            },
            vault_dir: lookup("FORGE_VAULT_DIR").map(PathBuf::from),
            vault_uri_prefix: lookup("FORGE_VAULT_URI_PREFIX").unwrap_or(defaults.vault_uri_prefix),
            rpc_url: lookup("FORGE_RPC_URL"),
            contract_address: lookup("FORGE_CONTRACT_ADDRESS")
                .map(|raw| {
                    Address::from_hex(&raw).map_err(|e| {
                        ConfigError::Invalid(format!("FORGE_CONTRACT_ADDRESS: {}", e))
                    })
                })
                .transpose()?,
            rpc_timeout_secs: parse_or(
                &lookup,
                "FORGE_RPC_TIMEOUT_SECS",
                defaults.rpc_timeout_secs,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reveal_window < self.min_reveal_delay {
            return Err(ConfigError::Invalid(format!(
                "reveal window {} is shorter than the minimum reveal delay {}",
                self.reveal_window, self.min_reveal_delay
            )));
        }
        for (name, p) in [
            ("mutation chance", self.generator.mutation_chance),
            ("promotion chance", self.generator.promotion_chance),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::Invalid(format!("{} {} is not in [0, 1]", name, p)));
            }
        }
        if self.generator.mythic_modulus == 0 {
            return Err(ConfigError::Invalid("mythic modulus must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Settings for [`forge_chain::RpcChain`]; both endpoint and contract are required
    pub fn rpc_chain_config(&self) -> Result<RpcChainConfig, ConfigError> {
        let url = self
            .rpc_url
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar("FORGE_RPC_URL".to_string()))?;
        let contract = self
            .contract_address
            .ok_or_else(|| ConfigError::MissingEnvVar("FORGE_CONTRACT_ADDRESS".to_string()))?;
        Ok(RpcChainConfig::new(url, contract)
            .with_timeout(Duration::from_secs(self.rpc_timeout_secs)))
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("{}={:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}

//! # HouseForge Fusion
//!
//! Commit-reveal fusion of two parent agents into an offspring.
//!
//! 1. [`FusionOrchestrator::prepare_commit`] validates ownership and state
//!    and returns the commit hash the user submits on-chain.
//! 2. After the reveal delay, [`FusionOrchestrator::prepare_reveal`]
//!    rebuilds the fusion seed from chain data (parent learning roots,
//!    user salt, commit block hash), runs the [`TraitGenerator`] and writes
//!    the offspring's vault record, keyed by content only.
//! 3. [`FusionOrchestrator::encode_reveal_calldata`] produces the
//!    `revealFusion` calldata for the user's wallet.
//! 4. Once that transaction lands, [`FusionOrchestrator::confirm_reveal`]
//!    binds the minted token to its vault record.
//!
//! [`FusionAuditor`] lets anyone re-check the commitments afterwards.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use forge_chain::MemoryChain;
//! use forge_fusion::{FusionConfig, FusionOrchestrator, SeededTraitGenerator};
//! use forge_vault::MemoryVault;
//!
//! let orchestrator = FusionOrchestrator::new(
//!     Arc::new(MemoryChain::default()),
//!     Arc::new(MemoryVault::new()),
//!     Arc::new(SeededTraitGenerator::default()),
//!     FusionConfig::default(),
//! );
//! # let _ = orchestrator;
//! ```

pub mod audit;
pub mod config;
pub mod error;
pub mod generator;
pub mod orchestrator;
pub mod recipe;

pub use audit::{AuditReport, FusionAuditor, SeedAudit};
pub use config::{ConfigError, FusionConfig, GeneratorConfig};
pub use error::FusionError;
pub use generator::{SeededTraitGenerator, TraitGenerator};
pub use orchestrator::{experience_label, CommitResult, FusionOrchestrator, RevealResult};
pub use recipe::{OutputSettings, RenderRecipe, RenderSettings};

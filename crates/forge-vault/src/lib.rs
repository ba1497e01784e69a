//! # HouseForge Vault
//!
//! Content-addressed storage for agent vault records.
//!
//! Supports:
//! - In-memory (for testing)
//! - JSON files on disk (for single-node deployments)
//!
//! Records are keyed by `vault_hash`; token ids are bound to them
//! separately, so unconfirmed fusion offspring never hold a token slot.
//!
//! Only the hashing contract matters to the rest of HouseForge:
//! `vault_hash = H(canonical(document))` and
//! `learning_root = H(vault_hash ‖ H(summary))`.

pub mod backend;
pub mod file;
pub mod memory;

pub use backend::{VaultDocument, VaultError, VaultRecord, VaultResult, VaultService};
pub use file::FileVault;
pub use memory::MemoryVault;

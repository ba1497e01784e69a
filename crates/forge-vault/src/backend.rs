//! Vault service trait, record types and error types

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use forge_core::{
    learning_root, vault_hash, CanonicalError, Hash, House, RarityTier, TokenId, TraitSet,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Vault error types
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Stored content no longer matches its recorded hash
    #[error("Integrity check failed: {0}")]
    Integrity(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Canonical(#[from] CanonicalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The hashed content of a vault record.
///
/// Holds no timestamps, so the same agent always produces the same
/// `vault_hash`. Genesis documents name their token; fusion offspring leave
/// it empty because the chain assigns the id only when the reveal lands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultDocument {
    pub schema_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<TokenId>,
    pub house: House,
    pub rarity_tier: RarityTier,
    pub generation: u32,
    pub traits: TraitSet,
    pub persona: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parents: Option<[TokenId; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fusion_seed: Option<Hash>,
    pub is_mythic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mythic_key: Option<String>,
    /// Input to the learning root; `"genesis"` for freshly minted agents
    pub summary: String,
}

impl VaultDocument {
    pub const SCHEMA_VERSION: &'static str = "1.0";

    pub fn vault_hash(&self) -> Result<Hash, CanonicalError> {
        vault_hash(self)
    }
}

/// Commitments returned by [`VaultService::create`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultResult {
    pub vault_uri: String,
    pub vault_hash: Hash,
    pub learning_root: Hash,
}

/// A stored vault record, addressed by its `vault_hash`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRecord {
    pub document: VaultDocument,
    pub vault_uri: String,
    pub vault_hash: Hash,
    pub learning_root: Hash,
    pub created_at: DateTime<Utc>,
}

impl VaultRecord {
    /// Compute commitments for `document` and wrap it into a record
    pub fn seal(document: VaultDocument, uri_prefix: &str) -> Result<Self, VaultError> {
        let vault_hash = document.vault_hash()?;
        let learning_root = learning_root(&vault_hash, &document.summary);
        let vault_uri = format!("{}/{}", uri_prefix.trim_end_matches('/'), vault_hash.to_hex());

        Ok(Self {
            document,
            vault_uri,
            vault_hash,
            learning_root,
            created_at: Utc::now(),
        })
    }

    pub fn result(&self) -> VaultResult {
        VaultResult {
            vault_uri: self.vault_uri.clone(),
            vault_hash: self.vault_hash,
            learning_root: self.learning_root,
        }
    }

    /// Recompute both commitments from the document and compare in constant time
    pub fn verify_integrity(&self) -> Result<bool, VaultError> {
        let recomputed_hash = self.document.vault_hash()?;
        let recomputed_root = learning_root(&recomputed_hash, &self.document.summary);

        let hash_match = recomputed_hash.0[..].ct_eq(&self.vault_hash.0[..]);
        let root_match = recomputed_root.0[..].ct_eq(&self.learning_root.0[..]);
        Ok((hash_match & root_match).into())
    }
}

/// Vault collaborator contract
///
/// Records are content-addressed and immutable, so creating the same
/// document twice returns the stored result and different documents never
/// collide. A token id points at exactly one record once bound; rebinding it
/// to other content fails with [`VaultError::AlreadyExists`].
#[async_trait]
pub trait VaultService: Send + Sync {
    /// Persist a record and return its commitments.
    ///
    /// A document that names its token also binds that token.
    async fn create(&self, document: VaultDocument) -> Result<VaultResult, VaultError>;

    /// Fetch a record by content hash
    async fn get_by_hash(&self, vault_hash: &Hash) -> Result<Option<VaultRecord>, VaultError>;

    /// Point `token_id` at the stored record `vault_hash`
    async fn bind_token(&self, token_id: TokenId, vault_hash: &Hash) -> Result<(), VaultError>;

    /// Fetch the record bound to `token_id`, if any
    async fn get_by_token_id(&self, token_id: TokenId) -> Result<Option<VaultRecord>, VaultError>;

    /// Get the backend name
    fn name(&self) -> &str;

    /// Check if backend is healthy
    async fn is_healthy(&self) -> bool;
}

/// Shared rebinding rule: a token may only be bound again to the same hash
pub(crate) fn check_binding(
    token_id: TokenId,
    bound: &Hash,
    incoming: &Hash,
) -> Result<(), VaultError> {
    if bound == incoming {
        tracing::debug!(token_id, vault_hash = %bound, "token already bound to this record");
        return Ok(());
    }
    Err(VaultError::AlreadyExists(format!(
        "token {} already bound to vault {}",
        token_id, bound
    )))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_computes_commitments() {
        let record = VaultRecord::seal(fixtures::document(7), "vault://houseforge/").unwrap();
        let expected_hash = vault_hash(&record.document).unwrap();
        assert_eq!(record.vault_hash, expected_hash);
        assert_eq!(record.learning_root, learning_root(&expected_hash, "genesis"));
        assert_eq!(
            record.vault_uri,
            format!("vault://houseforge/{}", expected_hash.to_hex())
        );
        assert!(record.verify_integrity().unwrap());
    }

    #[test]
    fn test_tampering_is_detected() {
        let mut record = VaultRecord::seal(fixtures::document(7), "vault://x").unwrap();
        record.document.generation = 3;
        assert!(!record.verify_integrity().unwrap());
    }

    #[test]
    fn test_document_json_is_camel_case() {
        let json = serde_json::to_value(fixtures::document(1)).unwrap();
        assert!(json.get("tokenId").is_some());
        assert!(json.get("rarityTier").is_some());
        assert!(json.get("fusionSeed").is_none());
    }

    #[test]
    fn test_unbound_document_omits_token_id() {
        let mut document = fixtures::document(1);
        document.token_id = None;
        let json = serde_json::to_value(&document).unwrap();
        assert!(json.get("tokenId").is_none());
        assert_ne!(
            document.vault_hash().unwrap(),
            fixtures::document(1).vault_hash().unwrap()
        );
    }

    #[test]
    fn test_rebinding_rule() {
        let a = Hash::digest(b"a");
        let b = Hash::digest(b"b");
        assert!(check_binding(3, &a, &a).is_ok());
        assert!(matches!(
            check_binding(3, &a, &b),
            Err(VaultError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_hash_survives_json_roundtrip() {
        let record = VaultRecord::seal(fixtures::document(9), "vault://x").unwrap();
        let text = serde_json::to_string_pretty(&record).unwrap();
        let back: VaultRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back.document.vault_hash().unwrap(), record.vault_hash);
    }
}

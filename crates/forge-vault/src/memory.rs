//! In-memory vault (for testing)

use async_trait::async_trait;
use forge_core::{Hash, TokenId};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::backend::{
    check_binding, VaultDocument, VaultError, VaultRecord, VaultResult, VaultService,
};

#[derive(Debug, Default)]
struct Store {
    records: HashMap<Hash, VaultRecord>,
    tokens: HashMap<TokenId, Hash>,
}

#[derive(Debug)]
pub struct MemoryVault {
    uri_prefix: String,
    store: RwLock<Store>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::with_uri_prefix("memory://vault")
    }

    pub fn with_uri_prefix(prefix: impl Into<String>) -> Self {
        Self {
            uri_prefix: prefix.into(),
            store: RwLock::new(Store::default()),
        }
    }

    /// Number of stored records, bound or not
    pub async fn len(&self) -> usize {
        self.store.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.records.is_empty()
    }

    /// Overwrite a stored record without any checks (tamper simulation)
    pub async fn replace_unchecked(&self, record: VaultRecord) {
        self.store
            .write()
            .await
            .records
            .insert(record.vault_hash, record);
    }
}

impl Default for MemoryVault {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VaultService for MemoryVault {
    async fn create(&self, document: VaultDocument) -> Result<VaultResult, VaultError> {
        let token_id = document.token_id;
        let record = VaultRecord::seal(document, &self.uri_prefix)?;
        let mut store = self.store.write().await;

        // Binding is checked before anything is stored
        if let Some(token_id) = token_id {
            if let Some(bound) = store.tokens.get(&token_id) {
                check_binding(token_id, bound, &record.vault_hash)?;
            }
            store.tokens.insert(token_id, record.vault_hash);
        }

        if let Some(existing) = store.records.get(&record.vault_hash) {
            return Ok(existing.result());
        }

        let result = record.result();
        tracing::info!(?token_id, vault_hash = %record.vault_hash, "vault record created");
        store.records.insert(record.vault_hash, record);
        Ok(result)
    }

    async fn get_by_hash(&self, vault_hash: &Hash) -> Result<Option<VaultRecord>, VaultError> {
        Ok(self.store.read().await.records.get(vault_hash).cloned())
    }

    async fn bind_token(&self, token_id: TokenId, vault_hash: &Hash) -> Result<(), VaultError> {
        let mut store = self.store.write().await;
        if !store.records.contains_key(vault_hash) {
            return Err(VaultError::NotFound(format!("vault {}", vault_hash)));
        }
        if let Some(bound) = store.tokens.get(&token_id) {
            return check_binding(token_id, bound, vault_hash);
        }
        store.tokens.insert(token_id, *vault_hash);
        tracing::info!(token_id, vault_hash = %vault_hash, "token bound to vault record");
        Ok(())
    }

    async fn get_by_token_id(&self, token_id: TokenId) -> Result<Option<VaultRecord>, VaultError> {
        let store = self.store.read().await;
        Ok(store
            .tokens
            .get(&token_id)
            .and_then(|hash| store.records.get(hash))
            .cloned())
    }

    fn name(&self) -> &str {
        "memory"
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}

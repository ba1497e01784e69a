//! JSON-RPC chain client
//!
//! Reads the fusion contract with `eth_call` against `latest` and decodes the
//! ABI return data. Transport failures surface as [`ChainError::Network`] /
//! [`ChainError::Rpc`] without retries.

use async_trait::async_trait;
use forge_core::{Address, FusionMode, Hash, TokenId};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::abi::{self, selector, AbiReader, Token};
use crate::client::{ChainClient, CommitRecord, Lineage, TokenMetadata};
use crate::error::ChainError;

#[derive(Serialize)]
struct JsonRpcRequest<'a, T: Serialize> {
    jsonrpc: &'a str,
    method: &'a str,
    params: T,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Connection settings for [`RpcChain`]
#[derive(Debug, Clone)]
pub struct RpcChainConfig {
    pub rpc_url: String,
    pub contract: Address,
    pub timeout: Duration,
}

impl RpcChainConfig {
    pub fn new(rpc_url: impl Into<String>, contract: Address) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            contract,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Fusion contract reader over HTTP JSON-RPC
#[derive(Debug)]
pub struct RpcChain {
    config: RpcChainConfig,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcChain {
    pub fn new(config: RpcChainConfig) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("forge-chain/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChainError::Unavailable(e.to_string()))?;

        Ok(Self {
            config,
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn contract(&self) -> &Address {
        &self.config.contract
    }

    async fn request<P: Serialize + Send + Sync, T: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<T, ChainError> {
        let req = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        let resp = self
            .client
            .post(&self.config.rpc_url)
            .json(&req)
            .send()
            .await
            .map_err(|e| ChainError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ChainError::Network(format!(
                "RPC endpoint returned HTTP {}",
                resp.status()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ChainError::Network(e.to_string()))?;
        let parsed: JsonRpcResponse<T> = serde_json::from_slice(&bytes)?;

        if let Some(err) = parsed.error {
            return Err(ChainError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        parsed
            .result
            .ok_or_else(|| ChainError::Decode(format!("{} returned no result", method)))
    }

    async fn call(&self, selector: [u8; 4], args: &[Token]) -> Result<Vec<u8>, ChainError> {
        let data = abi::to_hex_data(&abi::encode_call(selector, args));
        tracing::debug!(
            contract = %self.config.contract,
            selector = %hex::encode(selector),
            "eth_call"
        );

        let result: String = self
            .request(
                "eth_call",
                serde_json::json!([{
                    "to": self.config.contract.to_prefixed_hex(),
                    "data": data
                }, "latest"]),
            )
            .await?;
        abi::from_hex_data(&result)
    }
}

fn commit_key(owner: &Address, parent_a: TokenId, parent_b: TokenId) -> [Token; 3] {
    [Token::Address(*owner), Token::Uint(parent_a), Token::Uint(parent_b)]
}

#[async_trait]
impl ChainClient for RpcChain {
    async fn owner_of(&self, token_id: TokenId) -> Result<Address, ChainError> {
        let out = self.call(selector::OWNER_OF, &[Token::Uint(token_id)]).await?;
        AbiReader::new(&out).address(0)
    }

    async fn is_sealed(&self, token_id: TokenId) -> Result<bool, ChainError> {
        let out = self.call(selector::IS_SEALED, &[Token::Uint(token_id)]).await?;
        AbiReader::new(&out).boolean(0)
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        let hex: String = self.request("eth_blockNumber", serde_json::json!([])).await?;
        u64::from_str_radix(hex.trim_start_matches("0x"), 16)
            .map_err(|e| ChainError::Decode(e.to_string()))
    }

    async fn get_commit(
        &self,
        owner: &Address,
        parent_a: TokenId,
        parent_b: TokenId,
    ) -> Result<CommitRecord, ChainError> {
        let out = self
            .call(selector::GET_COMMIT, &commit_key(owner, parent_a, parent_b))
            .await?;
        let reader = AbiReader::new(&out);
        let raw_mode = reader.uint(3)?;
        let mode = u8::try_from(raw_mode)
            .ok()
            .and_then(FusionMode::from_u8)
            .ok_or_else(|| ChainError::Decode(format!("unknown fusion mode {}", raw_mode)))?;

        Ok(CommitRecord {
            commit_hash: reader.bytes32(0)?,
            commit_block: reader.uint(1)?,
            revealed: reader.boolean(2)?,
            mode,
        })
    }

    async fn get_commit_block_hash(
        &self,
        owner: &Address,
        parent_a: TokenId,
        parent_b: TokenId,
    ) -> Result<Hash, ChainError> {
        let out = self
            .call(
                selector::GET_COMMIT_BLOCK_HASH,
                &commit_key(owner, parent_a, parent_b),
            )
            .await?;
        AbiReader::new(&out).bytes32(0)
    }

    async fn get_metadata(&self, token_id: TokenId) -> Result<TokenMetadata, ChainError> {
        let out = self.call(selector::GET_METADATA, &[Token::Uint(token_id)]).await?;
        let reader = AbiReader::new(&out);
        let small = |index: usize| -> Result<u8, ChainError> {
            let v = reader.uint(index)?;
            u8::try_from(v).map_err(|_| ChainError::Decode(format!("uint8 out of range: {}", v)))
        };

        Ok(TokenMetadata {
            house_id: small(0)?,
            rarity_tier: small(1)?,
            vault_hash: reader.bytes32(2)?,
            learning_root: reader.bytes32(3)?,
        })
    }

    async fn get_lineage(&self, token_id: TokenId) -> Result<Lineage, ChainError> {
        let out = self.call(selector::GET_LINEAGE, &[Token::Uint(token_id)]).await?;
        let reader = AbiReader::new(&out);
        let generation = reader.uint(2)?;

        Ok(Lineage {
            parent_a: reader.uint(0)?,
            parent_b: reader.uint(1)?,
            generation: u32::try_from(generation).map_err(|_| {
                ChainError::Decode(format!("generation out of range: {}", generation))
            })?,
            is_fusion: reader.boolean(3)?,
        })
    }

    async fn next_token_id(&self) -> Result<TokenId, ChainError> {
        let out = self.call(selector::NEXT_TOKEN_ID, &[]).await?;
        AbiReader::new(&out).uint(0)
    }

    fn name(&self) -> &str {
        "json-rpc"
    }

    async fn is_healthy(&self) -> bool {
        self.block_number().await.is_ok()
    }
}

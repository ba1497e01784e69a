//! # HouseForge Chain
//!
//! Read access to the HouseForge fusion contract.
//!
//! ## Clients
//!
//! - **RpcChain**: `eth_call` / `eth_blockNumber` over HTTP JSON-RPC
//! - **MemoryChain**: in-process contract simulator with a block clock
//!
//! The crate never signs or submits transactions; [`abi`] only encodes the
//! calldata a wallet will submit.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use forge_chain::{ChainClient, MemoryChain};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let chain = MemoryChain::new(1_000);
//!     println!("block: {}", chain.block_number().await?);
//!     Ok(())
//! }
//! ```

pub mod abi;
mod client;
mod error;
mod memory;

#[cfg(feature = "rpc")]
mod rpc;

pub use client::{ChainClient, CommitRecord, Lineage, TokenMetadata};
pub use error::ChainError;
pub use memory::{MemoryChain, MintRequest};

#[cfg(feature = "rpc")]
pub use rpc::{RpcChain, RpcChainConfig};

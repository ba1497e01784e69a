//! Minimal Solidity ABI codec for the fusion contract
//!
//! Only the shapes the contract uses are supported: `uint*` (up to 64 bits
//! of value), `address`, `bool`, `bytes32` and `string`.

use forge_core::{u64_word, Address, Hash};

use crate::error::ChainError;

/// 4-byte function selectors (`keccak256(signature)[..4]`)
pub mod selector {
    /// `ownerOf(uint256)`
    pub const OWNER_OF: [u8; 4] = [0x63, 0x52, 0x21, 0x1e];
    /// `isSealed(uint256)`
    pub const IS_SEALED: [u8; 4] = [0x2c, 0x17, 0x58, 0xc1];
    /// `getCommit(address,uint256,uint256)`
    pub const GET_COMMIT: [u8; 4] = [0x07, 0x29, 0x42, 0x54];
    /// `getCommitBlockHash(address,uint256,uint256)`
    pub const GET_COMMIT_BLOCK_HASH: [u8; 4] = [0xd4, 0xfd, 0xea, 0xf9];
    /// `getMetadata(uint256)`
    pub const GET_METADATA: [u8; 4] = [0xa5, 0x74, 0xce, 0xa4];
    /// `getLineage(uint256)`
    pub const GET_LINEAGE: [u8; 4] = [0x57, 0xc6, 0xcc, 0x39];
    /// `nextTokenId()`
    pub const NEXT_TOKEN_ID: [u8; 4] = [0x75, 0x79, 0x4a, 0x3c];
    /// `commitFusion(uint256,uint256,bytes32,uint8)`
    pub const COMMIT_FUSION: [u8; 4] = [0xc1, 0x60, 0x3c, 0x1f];
    /// `revealFusion(uint256,uint256,bytes32,string,bytes32,bytes32,string,string,uint8)`
    pub const REVEAL_FUSION: [u8; 4] = [0xf0, 0xaa, 0x8d, 0xeb];
}

/// A single ABI argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Uint(u64),
    Address(Address),
    Bool(bool),
    Bytes32(Hash),
    String(String),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        matches!(self, Token::String(_))
    }

    fn head_word(&self) -> [u8; 32] {
        match self {
            Token::Uint(v) => u64_word(*v),
            Token::Address(a) => a.to_word(),
            Token::Bool(b) => u64_word(u64::from(*b)),
            Token::Bytes32(h) => h.0,
            // Dynamic tokens get an offset word instead; see `encode`
            Token::String(_) => [0u8; 32],
        }
    }
}

/// `abi.encode(tokens...)`
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * 32;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&u64_word((head_len + tail.len()) as u64));
            if let Token::String(s) = token {
                let bytes = s.as_bytes();
                tail.extend_from_slice(&u64_word(bytes.len() as u64));
                tail.extend_from_slice(bytes);
                let padding = (32 - bytes.len() % 32) % 32;
                tail.extend(std::iter::repeat(0u8).take(padding));
            }
        } else {
            head.extend_from_slice(&token.head_word());
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Selector followed by `abi.encode(tokens...)`
pub fn encode_call(selector: [u8; 4], tokens: &[Token]) -> Vec<u8> {
    let mut out = selector.to_vec();
    out.extend_from_slice(&encode(tokens));
    out
}

/// `0x`-prefixed hex, as JSON-RPC expects
pub fn to_hex_data(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

pub fn from_hex_data(data: &str) -> Result<Vec<u8>, ChainError> {
    hex::decode(data.trim_start_matches("0x")).map_err(|e| ChainError::Decode(e.to_string()))
}

/// Positional reader over ABI-encoded return data
#[derive(Debug, Clone, Copy)]
pub struct AbiReader<'a> {
    data: &'a [u8],
}

impl<'a> AbiReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn slice(&self, start: usize, len: usize) -> Result<&'a [u8], ChainError> {
        let end = start
            .checked_add(len)
            .ok_or_else(|| ChainError::Decode("offset overflow".to_string()))?;
        self.data.get(start..end).ok_or_else(|| {
            ChainError::Decode(format!(
                "return data too short: need {} bytes, have {}",
                end,
                self.data.len()
            ))
        })
    }

    fn word_at(&self, byte_offset: usize) -> Result<[u8; 32], ChainError> {
        let mut word = [0u8; 32];
        word.copy_from_slice(self.slice(byte_offset, 32)?);
        Ok(word)
    }

    pub fn word(&self, index: usize) -> Result<[u8; 32], ChainError> {
        self.word_at(index * 32)
    }

    pub fn uint(&self, index: usize) -> Result<u64, ChainError> {
        word_to_u64(&self.word(index)?)
    }

    pub fn address(&self, index: usize) -> Result<Address, ChainError> {
        let word = self.word(index)?;
        if word[..12].iter().any(|b| *b != 0) {
            return Err(ChainError::Decode(format!("word {} is not an address", index)));
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&word[12..]);
        Ok(Address::from_bytes(bytes))
    }

    pub fn boolean(&self, index: usize) -> Result<bool, ChainError> {
        match self.uint(index)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ChainError::Decode(format!("invalid bool value {}", other))),
        }
    }

    pub fn bytes32(&self, index: usize) -> Result<Hash, ChainError> {
        Ok(Hash::from_bytes(self.word(index)?))
    }

    pub fn string(&self, index: usize) -> Result<String, ChainError> {
        let offset = usize::try_from(self.uint(index)?)
            .map_err(|e| ChainError::Decode(e.to_string()))?;
        let len = usize::try_from(word_to_u64(&self.word_at(offset)?)?)
            .map_err(|e| ChainError::Decode(e.to_string()))?;
        let bytes = self.slice(offset + 32, len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| ChainError::Decode(e.to_string()))
    }
}

fn word_to_u64(word: &[u8; 32]) -> Result<u64, ChainError> {
    if word[..24].iter().any(|b| *b != 0) {
        return Err(ChainError::Decode("integer does not fit in u64".to_string()));
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(bytes))
}

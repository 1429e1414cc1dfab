//! Just enough of the Solidity ABI to call a crowdfund contract and read its
//! contribution events: descriptor loading, selectors, topics, and encoding of
//! static `address`/`uint256`/`bool` words.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha3::{Digest, Keccak256};
use shared::domain::Address;
use thiserror::Error;

pub const WORD_LEN: usize = 32;

pub const CONTRIBUTE: &str = "contribute";
pub const CONTRIBUTE_TOKEN: &str = "contributeToken";
pub const ERC20_APPROVE: &str = "approve(address,uint256)";
pub const CONTRIBUTION_EVENT: &str = "Contribution(address,uint256)";
pub const TOKEN_CONTRIBUTION_EVENT: &str = "TokenContribution(address,address,uint256)";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("descriptor is neither an ABI array nor an artifact with an `abi` key")]
    UnrecognizedShape,
    #[error("malformed ABI entry: {0}")]
    MalformedEntry(String),
    #[error("malformed hex data: {0}")]
    MalformedData(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiEntry {
    #[serde(rename = "type", default = "default_entry_type")]
    pub entry_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    #[serde(default)]
    pub outputs: Vec<AbiParam>,
    #[serde(
        rename = "stateMutability",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub state_mutability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payable: Option<bool>,
}

fn default_entry_type() -> String {
    "function".to_string()
}

impl AbiEntry {
    /// Canonical signature, e.g. `contributeToken(address,uint256)`.
    pub fn signature(&self) -> String {
        let types: Vec<&str> = self.inputs.iter().map(|p| p.kind.as_str()).collect();
        format!(
            "{}({})",
            self.name.as_deref().unwrap_or_default(),
            types.join(",")
        )
    }

    pub fn selector(&self) -> [u8; 4] {
        selector(&self.signature())
    }

    pub fn is_payable(&self) -> bool {
        self.state_mutability.as_deref() == Some("payable") || self.payable == Some(true)
    }
}

/// A contract interface descriptor. Opaque to callers beyond name lookups.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContractAbi {
    entries: Vec<AbiEntry>,
}

impl ContractAbi {
    /// Accepts a bare ABI array or a compiler artifact `{ "abi": [...] }`.
    pub fn from_json(value: &Value) -> Result<Self, AbiError> {
        let array = match value {
            Value::Array(_) => value,
            Value::Object(map) => map
                .get("abi")
                .filter(|abi| abi.is_array())
                .ok_or(AbiError::UnrecognizedShape)?,
            _ => return Err(AbiError::UnrecognizedShape),
        };
        let entries: Vec<AbiEntry> = serde_json::from_value(array.clone())
            .map_err(|e| AbiError::MalformedEntry(e.to_string()))?;
        Ok(Self { entries })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, AbiError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| AbiError::MalformedEntry(e.to_string()))?;
        Self::from_json(&value)
    }

    pub fn entries(&self) -> &[AbiEntry] {
        &self.entries
    }

    pub fn function(&self, name: &str) -> Option<&AbiEntry> {
        self.find("function", name)
    }

    pub fn event(&self, name: &str) -> Option<&AbiEntry> {
        self.find("event", name)
    }

    fn find(&self, entry_type: &str, name: &str) -> Option<&AbiEntry> {
        self.entries
            .iter()
            .find(|e| e.entry_type == entry_type && e.name.as_deref() == Some(name))
    }
}

pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let digest = Keccak256::digest(bytes);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Topic-0 of an event, as the `0x`-prefixed hex string nodes report.
pub fn event_topic(signature: &str) -> String {
    format!("0x{}", hex::encode(keccak256(signature.as_bytes())))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Uint(u128),
    Bool(bool),
}

impl Token {
    fn word(&self) -> [u8; WORD_LEN] {
        let mut word = [0u8; WORD_LEN];
        match self {
            Token::Address(address) => word[WORD_LEN - Address::LEN..].copy_from_slice(&address.0),
            Token::Uint(value) => word[WORD_LEN - 16..].copy_from_slice(&value.to_be_bytes()),
            Token::Bool(value) => word[WORD_LEN - 1] = u8::from(*value),
        }
        word
    }
}

pub fn encode_call(selector: [u8; 4], args: &[Token]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + args.len() * WORD_LEN);
    out.extend_from_slice(&selector);
    for arg in args {
        out.extend_from_slice(&arg.word());
    }
    out
}

/// Splits `0x`-prefixed data into 32-byte words.
pub fn decode_words(data: &str) -> Result<Vec<[u8; WORD_LEN]>, AbiError> {
    let digits = data.strip_prefix("0x").unwrap_or(data);
    let bytes = hex::decode(digits).map_err(|e| AbiError::MalformedData(e.to_string()))?;
    if bytes.len() % WORD_LEN != 0 {
        return Err(AbiError::MalformedData(format!(
            "{} bytes is not a whole number of words",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(WORD_LEN)
        .map(|chunk| {
            let mut word = [0u8; WORD_LEN];
            word.copy_from_slice(chunk);
            word
        })
        .collect())
}

pub fn word_to_address(word: &[u8; WORD_LEN]) -> Option<Address> {
    let (padding, tail) = word.split_at(WORD_LEN - Address::LEN);
    if padding.iter().any(|b| *b != 0) {
        return None;
    }
    Address::from_slice(tail)
}

/// `None` when the value needs more than 128 bits.
pub fn word_to_uint(word: &[u8; WORD_LEN]) -> Option<u128> {
    let (high, low) = word.split_at(WORD_LEN - 16);
    if high.iter().any(|b| *b != 0) {
        return None;
    }
    let low: [u8; 16] = low.try_into().ok()?;
    Some(u128::from_be_bytes(low))
}

#[cfg(test)]
#[path = "tests/abi_tests.rs"]
mod tests;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::{Address, TxHash};

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

impl<'a> RpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcErrorObject {
    /// Wallets wrap the node's own error inside `data`; that inner text is
    /// the useful diagnostic when present.
    pub fn innermost_message(&self) -> &str {
        match &self.data {
            Some(Value::Object(map)) => map
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(&self.message),
            Some(Value::String(text)) if !text.is_empty() => text,
            _ => &self.message,
        }
    }
}

/// Parameters for `eth_sendTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub data: String,
}

impl TransactionRequest {
    pub fn call(from: Address, to: Address, calldata: &[u8]) -> Self {
        Self {
            from,
            to,
            value: None,
            data: format!("0x{}", hex::encode(calldata)),
        }
    }

    pub fn with_value(mut self, value: u128) -> Self {
        self.value = Some(to_quantity(value));
        self
    }

    pub fn value_base_units(&self) -> Option<u128> {
        self.value.as_deref().and_then(|v| parse_quantity(v).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl TransactionReceipt {
    pub fn block_number(&self) -> Option<u64> {
        self.block_number
            .as_deref()
            .and_then(|raw| parse_quantity(raw).ok())
            .and_then(|n| u64::try_from(n).ok())
    }

    /// Pre-Byzantium receipts carry no status; those count as executed.
    pub fn succeeded(&self) -> bool {
        match self.status.as_deref() {
            Some(raw) => parse_quantity(raw).map(|s| s == 1).unwrap_or(false),
            None => true,
        }
    }
}

/// Parameters for `eth_getLogs`. `topics[0]` is an OR-set of event topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    pub address: Address,
    pub from_block: String,
    pub to_block: String,
    pub topics: Vec<Vec<String>>,
}

impl LogFilter {
    pub fn new(address: Address, from_block: u64, to_block: u64, topics: Vec<String>) -> Self {
        Self {
            address,
            from_block: to_quantity(u128::from(from_block)),
            to_block: to_quantity(u128::from(to_block)),
            topics: vec![topics],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: String,
    pub transaction_hash: TxHash,
    #[serde(default)]
    pub log_index: Option<String>,
}

impl LogEntry {
    pub fn block(&self) -> Option<u64> {
        parse_quantity(&self.block_number)
            .ok()
            .and_then(|n| u64::try_from(n).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("quantity {0:?} is missing the 0x prefix")]
    MissingPrefix(String),
    #[error("quantity {0:?} is not valid hex or exceeds 128 bits")]
    Invalid(String),
}

pub fn to_quantity(value: u128) -> String {
    format!("{value:#x}")
}

pub fn parse_quantity(raw: &str) -> Result<u128, QuantityError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| QuantityError::MissingPrefix(raw.to_string()))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).map_err(|_| QuantityError::Invalid(raw.to_string()))
}

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shared::{
    domain::{Address, ChainId, TxHash},
    protocol::{
        parse_quantity, LogEntry, LogFilter, RpcRequest, RpcResponse, TransactionReceipt,
        TransactionRequest,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::{WalletError, WalletProvider};

const METHOD_NOT_FOUND: i64 = -32601;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Wallet provider backed by a node or wallet daemon speaking HTTP JSON-RPC.
pub struct JsonRpcWallet {
    http: Client,
    endpoint: Url,
    next_id: AtomicU64,
}

impl JsonRpcWallet {
    pub fn new(endpoint: Url) -> Result<Self, WalletError> {
        Self::with_timeout(endpoint, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(endpoint: Url, timeout: Duration) -> Result<Self, WalletError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WalletError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            endpoint,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, WalletError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "rpc: request");

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&RpcRequest::new(id, method, params))
            .send()
            .await
            .map_err(transport_error)?
            .error_for_status()
            .map_err(transport_error)?;
        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| WalletError::Decode(format!("{method}: {e}")))?;

        if let Some(err) = body.error {
            return Err(WalletError::Rpc {
                code: err.code,
                message: err.innermost_message().to_string(),
            });
        }

        serde_json::from_value(body.result.unwrap_or(Value::Null))
            .map_err(|e| WalletError::Decode(format!("{method}: {e}")))
    }

    async fn quantity(&self, method: &str, params: Value) -> Result<u128, WalletError> {
        let raw: String = self.call(method, params).await?;
        parse_quantity(&raw).map_err(|e| WalletError::Decode(format!("{method}: {e}")))
    }
}

fn transport_error(err: reqwest::Error) -> WalletError {
    if err.is_timeout() {
        WalletError::Timeout(err.to_string())
    } else {
        WalletError::Transport(err.to_string())
    }
}

fn narrow_u64(method: &str, value: u128) -> Result<u64, WalletError> {
    u64::try_from(value).map_err(|_| WalletError::Decode(format!("{method}: {value} exceeds u64")))
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        match self.call("eth_requestAccounts", json!([])).await {
            Err(WalletError::Rpc { code, .. }) if code == METHOD_NOT_FOUND => {
                warn!(
                    endpoint = %self.endpoint,
                    "rpc: eth_requestAccounts unsupported, falling back to eth_accounts"
                );
                self.call("eth_accounts", json!([])).await
            }
            other => other,
        }
    }

    async fn chain_id(&self) -> Result<ChainId, WalletError> {
        let value = self.quantity("eth_chainId", json!([])).await?;
        Ok(ChainId(narrow_u64("eth_chainId", value)?))
    }

    async fn balance(&self, account: Address) -> Result<u128, WalletError> {
        self.quantity("eth_getBalance", json!([account, "latest"]))
            .await
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<TxHash, WalletError> {
        self.call("eth_sendTransaction", json!([tx])).await
    }

    async fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<TransactionReceipt>, WalletError> {
        self.call("eth_getTransactionReceipt", json!([hash])).await
    }

    async fn block_number(&self) -> Result<u64, WalletError> {
        let value = self.quantity("eth_blockNumber", json!([])).await?;
        narrow_u64("eth_blockNumber", value)
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, WalletError> {
        self.call("eth_getLogs", json!([filter])).await
    }
}

#[cfg(test)]
#[path = "tests/rpc_tests.rs"]
mod tests;

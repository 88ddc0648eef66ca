//! JSON-RPC 2.0 wallet client.
//!
//! Methods used:
//! - eth_chainId, wallet_switchEthereumChain, eth_accounts, eth_sendTransaction (wallet endpoint)
//! - eth_getTransactionReceipt (per-chain read endpoint, wallet endpoint as fallback)

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use alloy_primitives::{Address, B256, U64};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use uncensored_types::{Result, TxReceipt, TxRequest, UncensoredError};

use crate::WalletProvider;

/// Endpoints and polling behavior for [`JsonRpcWallet`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Wallet endpoint that holds the keys (e.g. a local Frame instance).
    pub wallet_url: String,
    /// Read endpoints keyed by chain id, used for receipt polling.
    pub chain_rpcs: HashMap<u64, String>,
    pub receipt_poll_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            wallet_url: "http://127.0.0.1:1248".into(),
            chain_rpcs: HashMap::new(),
            receipt_poll_ms: 4_000,
            request_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// Extract `result` from a JSON-RPC response body, mapping the error object.
fn into_result(body: RpcResponse) -> Result<Value> {
    if let Some(err) = body.error {
        return Err(UncensoredError::Rpc { code: err.code, message: err.message });
    }
    Ok(body.result.unwrap_or(Value::Null))
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| UncensoredError::Other(format!("failed to parse {}: {}", what, e)))
}

/// Wallet provider over HTTP JSON-RPC.
pub struct JsonRpcWallet {
    config: RpcConfig,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcWallet {
    pub fn new(config: RpcConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .unwrap_or_default();
        Self { config, client, next_id: AtomicU64::new(1) }
    }

    fn read_url(&self, chain_id: u64) -> &str {
        self.config
            .chain_rpcs
            .get(&chain_id)
            .map(String::as_str)
            .unwrap_or(&self.config.wallet_url)
    }

    async fn call(&self, url: &str, method: &str, params: Value) -> Result<Value> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        tracing::debug!(method, url, "json-rpc call");

        let resp = self.client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| UncensoredError::Other(format!("{} request failed: {}", method, e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(UncensoredError::Other(format!(
                "{} returned status {}: {}",
                method, status, body
            )));
        }

        let body: RpcResponse = resp.json().await.map_err(|e| {
            UncensoredError::Other(format!("failed to parse {} response: {}", method, e))
        })?;

        into_result(body)
    }

    async fn default_account(&self) -> Result<Address> {
        let accounts: Vec<Address> = decode(
            self.call(&self.config.wallet_url, "eth_accounts", json!([])).await?,
            "accounts",
        )?;
        accounts
            .first()
            .copied()
            .ok_or_else(|| UncensoredError::Other("wallet exposes no accounts".into()))
    }

    /// Single receipt lookup. `None` while the transaction is pending.
    pub async fn get_receipt(&self, chain_id: u64, tx_hash: B256) -> Result<Option<TxReceipt>> {
        let value = self
            .call(self.read_url(chain_id), "eth_getTransactionReceipt", json!([tx_hash]))
            .await?;
        decode(value, "receipt")
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    async fn chain_id(&self) -> Result<u64> {
        let id: U64 = decode(
            self.call(&self.config.wallet_url, "eth_chainId", json!([])).await?,
            "chain id",
        )?;
        Ok(id.to::<u64>())
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        tracing::info!(chain_id, "requesting chain switch");
        self.call(
            &self.config.wallet_url,
            "wallet_switchEthereumChain",
            json!([{ "chainId": U64::from(chain_id) }]),
        )
        .await?;
        Ok(())
    }

    async fn send_transaction(&self, request: &TxRequest) -> Result<B256> {
        let mut request = request.clone();
        if request.from.is_none() {
            request.from = Some(self.default_account().await?);
        }
        let hash: B256 = decode(
            self.call(&self.config.wallet_url, "eth_sendTransaction", json!([request])).await?,
            "transaction hash",
        )?;
        tracing::info!(%hash, to = %request.to, "transaction broadcast");
        Ok(hash)
    }

    async fn wait_for_receipt(&self, chain_id: u64, tx_hash: B256) -> Result<TxReceipt> {
        let poll = Duration::from_millis(self.config.receipt_poll_ms);
        loop {
            if let Some(receipt) = self.get_receipt(chain_id, tx_hash).await? {
                tracing::debug!(
                    %tx_hash,
                    chain_id,
                    block = %receipt.block_number,
                    "receipt available"
                );
                return Ok(receipt);
            }
            tokio::time::sleep(poll).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> RpcResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_error_object_maps_to_rpc_error() {
        let body = response(r#"{"jsonrpc":"2.0","id":1,"error":{"code":4001,"message":"User rejected the request."}}"#);
        match into_result(body) {
            Err(UncensoredError::Rpc { code, message }) => {
                assert_eq!(code, 4001);
                assert!(message.contains("rejected"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_pending_receipt_is_none() {
        let body = response(r#"{"jsonrpc":"2.0","id":7,"result":null}"#);
        let receipt: Option<TxReceipt> = decode(into_result(body).unwrap(), "receipt").unwrap();
        assert!(receipt.is_none());
    }

    #[test]
    fn test_chain_id_quantity() {
        let body = response(r#"{"jsonrpc":"2.0","id":2,"result":"0xaa36a7"}"#);
        let id: U64 = decode(into_result(body).unwrap(), "chain id").unwrap();
        assert_eq!(id.to::<u64>(), 11_155_111);
    }

    #[test]
    fn test_read_url_falls_back_to_wallet() {
        let mut config = RpcConfig::default();
        config.chain_rpcs.insert(10, "https://mainnet.optimism.io".into());
        let wallet = JsonRpcWallet::new(config);
        assert_eq!(wallet.read_url(10), "https://mainnet.optimism.io");
        assert_eq!(wallet.read_url(1), "http://127.0.0.1:1248");
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: RpcConfig =
            serde_json::from_str(r#"{"chain_rpcs":{"42161":"https://arb1.arbitrum.io/rpc"}}"#).unwrap();
        assert_eq!(config.wallet_url, "http://127.0.0.1:1248");
        assert_eq!(
            config.chain_rpcs.get(&42161).map(String::as_str),
            Some("https://arb1.arbitrum.io/rpc")
        );
    }
}

//! HTTP client for Etherscan-family contract APIs.
//!
//! Endpoints:
//! - GET ?module=contract&action=getabi&address=<addr>&apikey=<key>
//! - GET ?module=contract&action=getsourcecode&address=<addr>&apikey=<key>

use std::time::Duration;

use alloy_json_abi::JsonAbi;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uncensored_types::{L2Chain, Network, Result, UncensoredError};

/// Explorer API response wrapper.
///
/// `result` is the payload on `status == "1"` and an error message otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerResponse {
    pub status: String,
    #[serde(default)]
    pub message: String,
    pub result: Value,
}

impl ExplorerResponse {
    fn into_result(self) -> Result<Value> {
        if self.status == "1" {
            return Ok(self.result);
        }
        let reason = match self.result {
            Value::String(s) if !s.is_empty() => s,
            _ => self.message,
        };
        Err(UncensoredError::Explorer(reason))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SourceCodeEntry {
    #[serde(default)]
    contract_name: String,
    #[serde(default)]
    proxy: String,
    #[serde(default)]
    implementation: String,
}

/// Verified-source metadata relevant to ABI resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub contract_name: String,
    pub is_proxy: bool,
    pub implementation: Option<Address>,
}

fn parse_abi(envelope: ExplorerResponse) -> Result<JsonAbi> {
    match envelope.into_result()? {
        Value::String(raw) => serde_json::from_str(&raw)
            .map_err(|e| UncensoredError::Explorer(format!("malformed abi: {}", e))),
        other => serde_json::from_value(other)
            .map_err(|e| UncensoredError::Explorer(format!("malformed abi: {}", e))),
    }
}

fn parse_source_info(envelope: ExplorerResponse) -> Result<SourceInfo> {
    let entries: Vec<SourceCodeEntry> = serde_json::from_value(envelope.into_result()?)
        .map_err(|e| UncensoredError::Explorer(format!("malformed source info: {}", e)))?;
    let entry = entries
        .into_iter()
        .next()
        .ok_or_else(|| UncensoredError::Explorer("empty source info".into()))?;

    let implementation = match entry.implementation.trim() {
        "" => None,
        addr => Some(
            addr.parse::<Address>()
                .map_err(|e| {
                    UncensoredError::Explorer(format!("bad implementation address: {}", e))
                })?,
        ),
    };

    Ok(SourceInfo {
        contract_name: entry.contract_name,
        is_proxy: entry.proxy == "1" && implementation.is_some(),
        implementation,
    })
}

/// Explorer API client.
pub struct ExplorerClient {
    api_url: String,
    api_key: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl ExplorerClient {
    pub fn new(api_url: &str, api_key: &str, timeout_ms: Option<u64>) -> Self {
        let timeout_ms = timeout_ms.unwrap_or(20_000);
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .build()
                .unwrap_or_default(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Client for the explorer of `chain` on `network`.
    pub fn for_chain(chain: L2Chain, network: Network, api_key: &str) -> Self {
        Self::new(chain.explorer_api_url(network), api_key, None)
    }

    async fn contract_query(&self, action: &str, address: Address) -> Result<ExplorerResponse> {
        let url = format!(
            "{}?module=contract&action={}&address={}&apikey={}",
            self.api_url, action, address, self.api_key
        );

        let resp = self.client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| UncensoredError::Explorer(format!("request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(UncensoredError::Explorer(format!(
                "explorer returned status {}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| UncensoredError::Explorer(format!("failed to parse response: {}", e)))
    }

    /// Fetch the verified ABI of `address`.
    pub async fn get_abi(&self, address: Address) -> Result<JsonAbi> {
        tracing::debug!(%address, "fetching abi");
        parse_abi(self.contract_query("getabi", address).await?)
    }

    /// Fetch verified-source metadata, used to detect proxies.
    pub async fn get_source_info(&self, address: Address) -> Result<SourceInfo> {
        parse_source_info(self.contract_query("getsourcecode", address).await?)
    }

    /// ABI to compose calls to `address` with.
    ///
    /// An explicit implementation address wins; otherwise a detected proxy is
    /// followed to its implementation.
    pub async fn resolve_abi(
        &self,
        address: Address,
        implementation_override: Option<Address>,
    ) -> Result<JsonAbi> {
        if let Some(implementation) = implementation_override {
            return self.get_abi(implementation).await;
        }
        let info = self.get_source_info(address).await?;
        match info.implementation.filter(|_| info.is_proxy) {
            Some(implementation) => {
                tracing::info!(%address, %implementation, "following proxy implementation");
                self.get_abi(implementation).await
            }
            None => self.get_abi(address).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(json: &str) -> ExplorerResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_abi_envelope_ok() {
        let env = envelope(
            r#"{"status":"1","message":"OK","result":"[{\"type\":\"function\",\"name\":\"ping\",\"inputs\":[],\"outputs\":[],\"stateMutability\":\"nonpayable\"}]"}"#,
        );
        let abi = parse_abi(env).unwrap();
        assert!(abi.function("ping").is_some());
    }

    #[test]
    fn test_abi_envelope_error_message() {
        let env = envelope(r#"{"status":"0","message":"NOTOK","result":"Contract source code not verified"}"#);
        match parse_abi(env) {
            Err(UncensoredError::Explorer(reason)) => {
                assert_eq!(reason, "Contract source code not verified")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_abi_envelope_malformed_result() {
        let env = envelope(r#"{"status":"1","message":"OK","result":"not json"}"#);
        assert!(parse_abi(env).is_err());
    }

    #[test]
    fn test_source_info_proxy() {
        let env = envelope(
            r#"{"status":"1","message":"OK","result":[{"SourceCode":"","ABI":"[]","ContractName":"TransparentUpgradeableProxy","Proxy":"1","Implementation":"0x00000000000000000000000000000000000000cc"}]}"#,
        );
        let info = parse_source_info(env).unwrap();
        assert!(info.is_proxy);
        assert_eq!(info.implementation, Some(Address::with_last_byte(0xcc)));
        assert_eq!(info.contract_name, "TransparentUpgradeableProxy");
    }

    #[test]
    fn test_source_info_plain_contract() {
        let env = envelope(
            r#"{"status":"1","message":"OK","result":[{"ContractName":"WETH9","Proxy":"0","Implementation":""}]}"#,
        );
        let info = parse_source_info(env).unwrap();
        assert!(!info.is_proxy);
        assert_eq!(info.implementation, None);
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = ExplorerClient::new("https://api.arbiscan.io/api/", "KEY", None);
        assert_eq!(client.api_url, "https://api.arbiscan.io/api");
        let op = ExplorerClient::for_chain(L2Chain::Optimism, Network::Sepolia, "KEY");
        assert_eq!(op.api_url, "https://api-sepolia-optimistic.etherscan.io/api");
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};
use uncensored_ops::ClientConfig;
use uncensored_sdk::ArbitrumInboxConfig;
use uncensored_types::{L2Chain, Result, UncensoredError};
use uncensored_wallet::RpcConfig;

/// On-disk settings. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub rpc: RpcConfig,
    pub arbitrum: ArbitrumInboxConfig,
}

impl AppConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| UncensoredError::Other(format!("invalid config: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| UncensoredError::Other(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }
}

/// Explorer API key for `chain`, empty when unset.
pub fn explorer_api_key(chain: L2Chain) -> String {
    std::env::var(chain.api_key_env()).unwrap_or_default()
}

/// Split a `name=value` argument on the first `=`.
pub fn parse_named_arg(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(UncensoredError::Other(format!("expected name=value, got '{}'", raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use uncensored_types::Network;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = AppConfig::from_json("{}").unwrap();
        assert_eq!(cfg.client.network, Network::Mainnet);
        assert_eq!(cfg.rpc.receipt_poll_ms, 4000);
        assert_eq!(cfg.arbitrum.max_fee_per_gas, U256::from(100_000_000u64));
    }

    #[test]
    fn test_partial_config() {
        let cfg = AppConfig::from_json(
            r#"{"client":{"network":"sepolia"},"rpc":{"wallet_url":"http://localhost:8545"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.client.network, Network::Sepolia);
        assert_eq!(cfg.rpc.wallet_url, "http://localhost:8545");
    }

    #[test]
    fn test_parse_named_arg() {
        assert_eq!(parse_named_arg("to=0xabc").unwrap(), ("to".into(), "0xabc".into()));
        assert_eq!(parse_named_arg("data=a=b").unwrap(), ("data".into(), "a=b".into()));
        assert_eq!(parse_named_arg("0=").unwrap(), ("0".into(), String::new()));
        assert!(parse_named_arg("novalue").is_err());
        assert!(parse_named_arg("=1").is_err());
    }
}

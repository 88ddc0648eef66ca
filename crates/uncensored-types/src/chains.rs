//! Supported networks and block-explorer endpoints.
//!
//! | network | L1       | Optimism | Arbitrum |
//! |---------|----------|----------|----------|
//! | mainnet | 1        | 10       | 42161    |
//! | sepolia | 11155111 | 11155420 | 421614   |

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};

use crate::{Result, UncensoredError};

pub const MAINNET_ID: u64 = 1;
pub const OPTIMISM_ID: u64 = 10;
pub const ARBITRUM_ID: u64 = 42161;
pub const SEPOLIA_ID: u64 = 11_155_111;
pub const OPTIMISM_SEPOLIA_ID: u64 = 11_155_420;
pub const ARBITRUM_SEPOLIA_ID: u64 = 421_614;

/// OptimismPortal proxy on Ethereum mainnet.
pub const OPTIMISM_PORTAL: Address = address!("bEb5Fc579115071764c7423A4f12eDde41f106Ed");
/// OptimismPortal proxy on Sepolia.
pub const OPTIMISM_SEPOLIA_PORTAL: Address = address!("16Fc5058F25648194471939df75CF27A2e401668");
/// Arbitrum One delayed inbox on Ethereum mainnet.
pub const ARBITRUM_INBOX: Address = address!("4Dbd4fc535Ac27206064B68FfCf827b0A60BAB3f");
/// Arbitrum Sepolia delayed inbox on Sepolia.
pub const ARBITRUM_SEPOLIA_INBOX: Address = address!("aAe29B0366299461418F5324a79Afc425BE5ae21");

/// Which settlement network the client operates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Sepolia,
}

impl Network {
    /// The designated L1 chain force-inclusion transactions are sent on.
    pub fn l1_chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => MAINNET_ID,
            Network::Sepolia => SEPOLIA_ID,
        }
    }
}

impl FromStr for Network {
    type Err = UncensoredError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "sepolia" => Ok(Network::Sepolia),
            other => Err(UncensoredError::Other(format!("unknown network: {}", other))),
        }
    }
}

/// Target rollup of a transaction draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum L2Chain {
    #[default]
    Optimism,
    Arbitrum,
}

impl L2Chain {
    pub const ALL: [L2Chain; 2] = [L2Chain::Optimism, L2Chain::Arbitrum];

    pub fn name(&self) -> &'static str {
        match self {
            L2Chain::Optimism => "Optimism",
            L2Chain::Arbitrum => "Arbitrum",
        }
    }

    pub fn chain_id(&self, network: Network) -> u64 {
        match (self, network) {
            (L2Chain::Optimism, Network::Mainnet) => OPTIMISM_ID,
            (L2Chain::Optimism, Network::Sepolia) => OPTIMISM_SEPOLIA_ID,
            (L2Chain::Arbitrum, Network::Mainnet) => ARBITRUM_ID,
            (L2Chain::Arbitrum, Network::Sepolia) => ARBITRUM_SEPOLIA_ID,
        }
    }

    /// Resolve an L2 chain id back to its rollup and network.
    pub fn from_chain_id(chain_id: u64) -> Option<(L2Chain, Network)> {
        match chain_id {
            OPTIMISM_ID => Some((L2Chain::Optimism, Network::Mainnet)),
            OPTIMISM_SEPOLIA_ID => Some((L2Chain::Optimism, Network::Sepolia)),
            ARBITRUM_ID => Some((L2Chain::Arbitrum, Network::Mainnet)),
            ARBITRUM_SEPOLIA_ID => Some((L2Chain::Arbitrum, Network::Sepolia)),
            _ => None,
        }
    }

    /// L1 contract that accepts force-included transactions for this rollup.
    pub fn inclusion_contract(&self, network: Network) -> Address {
        match (self, network) {
            (L2Chain::Optimism, Network::Mainnet) => OPTIMISM_PORTAL,
            (L2Chain::Optimism, Network::Sepolia) => OPTIMISM_SEPOLIA_PORTAL,
            (L2Chain::Arbitrum, Network::Mainnet) => ARBITRUM_INBOX,
            (L2Chain::Arbitrum, Network::Sepolia) => ARBITRUM_SEPOLIA_INBOX,
        }
    }

    /// Etherscan-family API endpoint used to fetch contract ABIs.
    pub fn explorer_api_url(&self, network: Network) -> &'static str {
        match (self, network) {
            (L2Chain::Optimism, Network::Mainnet) => "https://api-optimistic.etherscan.io/api",
            (L2Chain::Optimism, Network::Sepolia) => "https://api-sepolia-optimistic.etherscan.io/api",
            (L2Chain::Arbitrum, Network::Mainnet) => "https://api.arbiscan.io/api",
            (L2Chain::Arbitrum, Network::Sepolia) => "https://api-sepolia.arbiscan.io/api",
        }
    }

    /// Environment variable holding the explorer API key for this rollup.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            L2Chain::Optimism => "OPTIMISM_ETHERSCAN_API_KEY",
            L2Chain::Arbitrum => "ARBITRUM_ETHERSCAN_API_KEY",
        }
    }
}

impl fmt::Display for L2Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for L2Chain {
    type Err = UncensoredError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "optimism" | "op" => Ok(L2Chain::Optimism),
            "arbitrum" | "arb" => Ok(L2Chain::Arbitrum),
            other => Err(UncensoredError::Other(format!("unknown chain: {}", other))),
        }
    }
}

fn explorer_base(chain_id: Option<u64>) -> &'static str {
    match chain_id.unwrap_or(MAINNET_ID) {
        OPTIMISM_ID => "https://optimistic.etherscan.io",
        ARBITRUM_ID => "https://arbiscan.io",
        SEPOLIA_ID => "https://sepolia.etherscan.io",
        ARBITRUM_SEPOLIA_ID => "https://sepolia.arbiscan.io",
        OPTIMISM_SEPOLIA_ID => "https://sepolia-optimism.etherscan.io",
        _ => "https://etherscan.io",
    }
}

/// Public explorer page for a transaction. Unknown chains use the mainnet explorer.
pub fn tx_url(chain_id: Option<u64>, tx_hash: &str) -> String {
    format!("{}/tx/{}", explorer_base(chain_id), tx_hash)
}

/// Public explorer page for an account or contract.
pub fn address_url(chain_id: Option<u64>, address: &str) -> String {
    format!("{}/address/{}", explorer_base(chain_id), address)
}

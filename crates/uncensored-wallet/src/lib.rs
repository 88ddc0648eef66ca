//! Wallet provider abstraction.
//!
//! Defines the `WalletProvider` trait the submission coordinator talks to.
//! Provides a `JsonRpcWallet` that drives a wallet's JSON-RPC endpoint.

use async_trait::async_trait;
use alloy_primitives::B256;
use uncensored_types::{Result, TxReceipt, TxRequest};

pub mod json_rpc;

pub use json_rpc::{JsonRpcWallet, RpcConfig};

/// Connection, signing and receipt watching, as exposed by a wallet.
///
/// All methods are async; signing happens inside the wallet.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Chain the wallet is currently connected to.
    async fn chain_id(&self) -> Result<u64>;

    /// Ask the wallet to switch chains. Completion is observed through `chain_id`.
    async fn switch_chain(&self, chain_id: u64) -> Result<()>;

    /// Sign and broadcast on the connected chain. Returns the transaction hash.
    async fn send_transaction(&self, request: &TxRequest) -> Result<B256>;

    /// Resolve once the receipt of `tx_hash` on `chain_id` is available.
    ///
    /// There is no overall deadline; transport failures are returned as errors.
    async fn wait_for_receipt(&self, chain_id: u64, tx_hash: B256) -> Result<TxReceipt>;
}

//! Force-inclusion transformations.
//!
//! Turns an L2 transaction into the L1 call that enqueues it through the
//! rollup's inbox, and recovers the resulting L2 transaction hashes from the
//! L1 receipt.
//!
//! - `OpStackPortal`: OptimismPortal `depositTransaction`
//! - `ArbitrumInbox`: delayed inbox `sendContractTransaction`
//! - `InclusionRouter`: dispatch by L2 chain id

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use uncensored_types::{L2Chain, Network, Result, TxReceipt, TxRequest, UncensoredError};

pub mod arbitrum;
pub mod op_stack;

pub use arbitrum::{ArbitrumInbox, ArbitrumInboxConfig};
pub use op_stack::OpStackPortal;

/// L1 transaction produced by a transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct L1Transaction {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

impl From<L1Transaction> for TxRequest {
    fn from(tx: L1Transaction) -> Self {
        TxRequest { from: None, to: tx.to, value: tx.value, data: tx.data, gas: None }
    }
}

/// The cross-layer transformation the submission coordinator delegates to.
pub trait InclusionSdk: Send + Sync {
    /// Re-encode an L2 transaction for submission on L1.
    fn transform_transaction(
        &self,
        to: Address,
        value: U256,
        data: &Bytes,
        gas_limit: u64,
        l2_chain_id: u64,
    ) -> Result<L1Transaction>;

    /// L2 transaction hashes created by a confirmed L1 transaction, in log order.
    fn l2_tx_hashes(&self, l1_receipt: &TxReceipt, l2_chain_id: u64) -> Result<Vec<B256>>;
}

/// Routes each call to the implementation for the rollup behind `l2_chain_id`.
pub struct InclusionRouter {
    op_stack: OpStackPortal,
    arbitrum: ArbitrumInbox,
}

impl InclusionRouter {
    pub fn new(op_stack: OpStackPortal, arbitrum: ArbitrumInbox) -> Self {
        Self { op_stack, arbitrum }
    }

    /// Router using the canonical contracts of `network` with default settings.
    pub fn for_network(network: Network) -> Self {
        Self::new(
            OpStackPortal::for_network(network),
            ArbitrumInbox::for_network(network, ArbitrumInboxConfig::default()),
        )
    }

    fn route(&self, l2_chain_id: u64) -> Result<&dyn InclusionSdk> {
        match L2Chain::from_chain_id(l2_chain_id) {
            Some((L2Chain::Optimism, _)) => Ok(&self.op_stack),
            Some((L2Chain::Arbitrum, _)) => Ok(&self.arbitrum),
            None => Err(UncensoredError::UnsupportedChain(l2_chain_id)),
        }
    }
}

impl InclusionSdk for InclusionRouter {
    fn transform_transaction(
        &self,
        to: Address,
        value: U256,
        data: &Bytes,
        gas_limit: u64,
        l2_chain_id: u64,
    ) -> Result<L1Transaction> {
        self.route(l2_chain_id)?
            .transform_transaction(to, value, data, gas_limit, l2_chain_id)
    }

    fn l2_tx_hashes(&self, l1_receipt: &TxReceipt, l2_chain_id: u64) -> Result<Vec<B256>> {
        self.route(l2_chain_id)?.l2_tx_hashes(l1_receipt, l2_chain_id)
    }
}

/// Fail unless `l2_chain_id` is `chain` on `network`.
pub(crate) fn expect_chain(chain: L2Chain, network: Network, l2_chain_id: u64) -> Result<()> {
    if chain.chain_id(network) == l2_chain_id {
        Ok(())
    } else {
        Err(UncensoredError::UnsupportedChain(l2_chain_id))
    }
}

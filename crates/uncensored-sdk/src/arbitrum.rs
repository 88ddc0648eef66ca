//! Arbitrum delayed-inbox inclusion.
//!
//! L1 call: `Inbox.sendContractTransaction(gasLimit, maxFeePerGas, to, value, data)`.
//! The L2 transaction is sent from the aliased L1 sender and pays gas and
//! value from that aliased account's L2 balance.
//!
//! L2 hash: `keccak256(0x66 ‖ rlp([chainId, requestId, from, gasFeeCap, gas, to, value, data]))`
//! with `requestId = u256(messageNum)` from `InboxMessageDelivered`.

use alloy_primitives::{aliases::U160, keccak256, Address, Bytes, B256, U256};
use alloy_rlp::{Encodable, RlpEncodable};
use alloy_sol_types::{sol, SolCall, SolEvent};
use serde::{Deserialize, Serialize};
use uncensored_types::{L2Chain, Network, ReceiptLog, Result, TxReceipt, UncensoredError};

use crate::{expect_chain, InclusionSdk, L1Transaction};

/// EIP-2718 type of Arbitrum contract transactions.
pub const CONTRACT_TX_TYPE: u8 = 0x66;

/// Offset added to L1 senders of delayed-inbox messages.
pub const L1_TO_L2_ALIAS_OFFSET: Address =
    alloy_primitives::address!("1111000000000000000000000000000000001111");

/// L2 message kind of `sendContractTransaction` payloads.
const L2_MSG_UNSIGNED_CONTRACT_TX: u8 = 1;

/// kind(1) ‖ gasLimit(32) ‖ maxFeePerGas(32) ‖ to(32) ‖ value(32)
const MESSAGE_HEADER_LEN: usize = 129;

sol! {
    interface IInbox {
        event InboxMessageDelivered(uint256 indexed messageNum, bytes data);

        function sendContractTransaction(
            uint256 gasLimit,
            uint256 maxFeePerGas,
            address to,
            uint256 value,
            bytes data
        ) external returns (uint256);
    }
}

/// Settings for delayed-inbox submissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitrumInboxConfig {
    /// Fee cap of the L2 execution, in wei. Must cover the L2 base fee at inclusion time.
    pub max_fee_per_gas: U256,
}

impl Default for ArbitrumInboxConfig {
    fn default() -> Self {
        Self { max_fee_per_gas: U256::from(100_000_000u64) }
    }
}

/// Arbitrum contract transaction fields in RLP order.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable)]
pub struct ContractTx {
    pub chain_id: U256,
    pub request_id: B256,
    pub from: Address,
    pub gas_fee_cap: U256,
    pub gas: u64,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

impl ContractTx {
    pub fn tx_hash(&self) -> B256 {
        let mut buf = Vec::with_capacity(1 + self.length());
        buf.push(CONTRACT_TX_TYPE);
        self.encode(&mut buf);
        keccak256(&buf)
    }
}

/// Address an L1 account acts as on L2 when sending through the delayed inbox.
pub fn apply_l1_to_l2_alias(l1_address: Address) -> Address {
    let sum = U160::from_be_bytes(l1_address.0 .0)
        .wrapping_add(U160::from_be_bytes(L1_TO_L2_ALIAS_OFFSET.0 .0));
    Address::from(sum.to_be_bytes::<20>())
}

/// Rebuild the contract transaction behind an `InboxMessageDelivered` log.
pub fn contract_tx_from_log(
    log: &ReceiptLog,
    l1_sender: Address,
    l2_chain_id: u64,
) -> Result<ContractTx> {
    let event = IInbox::InboxMessageDelivered::decode_raw_log(log.topics.iter().copied(), &log.data)
        .map_err(|e| UncensoredError::Other(format!("bad InboxMessageDelivered log: {}", e)))?;

    let msg = event.data.as_ref();
    if msg.len() < MESSAGE_HEADER_LEN {
        return Err(UncensoredError::Other(format!("inbox message too short: {} bytes", msg.len())));
    }
    if msg[0] != L2_MSG_UNSIGNED_CONTRACT_TX {
        return Err(UncensoredError::Other(format!("unexpected inbox message kind {}", msg[0])));
    }

    let gas = U256::from_be_slice(&msg[1..33]);
    let gas = u64::try_from(gas)
        .map_err(|_| UncensoredError::Other(format!("gas limit out of range: {}", gas)))?;

    Ok(ContractTx {
        chain_id: U256::from(l2_chain_id),
        request_id: B256::from(event.messageNum.to_be_bytes::<32>()),
        from: apply_l1_to_l2_alias(l1_sender),
        gas_fee_cap: U256::from_be_slice(&msg[33..65]),
        gas,
        to: Address::from_slice(&msg[77..97]),
        value: U256::from_be_slice(&msg[97..129]),
        data: Bytes::copy_from_slice(&msg[MESSAGE_HEADER_LEN..]),
    })
}

/// Delayed-inbox-backed inclusion for one Arbitrum chain.
#[derive(Debug, Clone)]
pub struct ArbitrumInbox {
    network: Network,
    inbox: Address,
    config: ArbitrumInboxConfig,
}

impl ArbitrumInbox {
    pub fn new(network: Network, inbox: Address, config: ArbitrumInboxConfig) -> Self {
        Self { network, inbox, config }
    }

    pub fn for_network(network: Network, config: ArbitrumInboxConfig) -> Self {
        Self::new(network, L2Chain::Arbitrum.inclusion_contract(network), config)
    }

    pub fn inbox(&self) -> Address {
        self.inbox
    }
}

impl InclusionSdk for ArbitrumInbox {
    fn transform_transaction(
        &self,
        to: Address,
        value: U256,
        data: &Bytes,
        gas_limit: u64,
        l2_chain_id: u64,
    ) -> Result<L1Transaction> {
        expect_chain(L2Chain::Arbitrum, self.network, l2_chain_id)?;

        let call = IInbox::sendContractTransactionCall {
            gasLimit: U256::from(gas_limit),
            maxFeePerGas: self.config.max_fee_per_gas,
            to,
            value,
            data: data.clone(),
        };
        tracing::debug!(inbox = %self.inbox, %to, gas_limit, "encoded inbox contract transaction");

        Ok(L1Transaction {
            to: self.inbox,
            value: U256::ZERO,
            data: call.abi_encode().into(),
        })
    }

    fn l2_tx_hashes(&self, l1_receipt: &TxReceipt, l2_chain_id: u64) -> Result<Vec<B256>> {
        expect_chain(L2Chain::Arbitrum, self.network, l2_chain_id)?;

        l1_receipt
            .logs_from(self.inbox)
            .filter(|log| {
                log.topics.first() == Some(&IInbox::InboxMessageDelivered::SIGNATURE_HASH)
            })
            .map(|log| {
                contract_tx_from_log(log, l1_receipt.from, l2_chain_id).map(|tx| tx.tx_hash())
            })
            .collect()
    }
}

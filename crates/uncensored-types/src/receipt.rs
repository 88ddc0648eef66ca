//! Transaction requests and receipts in their JSON-RPC shape.

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use serde::{Deserialize, Serialize};

/// Payload handed to a wallet for signing and broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<U64>,
}

/// A log entry of a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    #[serde(default)]
    pub block_hash: Option<B256>,
    #[serde(default)]
    pub log_index: Option<U64>,
}

/// Transaction receipt as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_hash: B256,
    pub block_number: U64,
    pub from: Address,
    #[serde(default)]
    pub to: Option<Address>,
    /// `0x1` on success, `0x0` when reverted. Missing on pre-Byzantium receipts.
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub logs: Vec<ReceiptLog>,
}

impl TxReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.map_or(true, |s| s == U64::from(1))
    }

    /// Logs emitted by `address`.
    pub fn logs_from(&self, address: Address) -> impl Iterator<Item = &ReceiptLog> {
        self.logs.iter().filter(move |l| l.address == address)
    }
}

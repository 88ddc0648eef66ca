//! Shared types for the Uncensored force-inclusion client.
//!
//! - Error taxonomy and `Result` alias
//! - Supported networks, chain ids and explorer URLs
//! - Transaction drafts and their validation
//! - Transaction requests and receipts as seen over JSON-RPC

use thiserror::Error;

pub mod chains;
pub mod draft;
pub mod receipt;

pub use chains::{L2Chain, Network};
pub use draft::{parse_value, FieldError, TransactionDraft, ValidatedDraft};
pub use receipt::{ReceiptLog, TxReceipt, TxRequest};

/// 0x-prefixed hex string (e.g. "0x1234...").
pub type Hex = String;

/// Uncensored client error types.
#[derive(Debug, Error)]
pub enum UncensoredError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("unsupported chain id: {0}")]
    UnsupportedChain(u64),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("explorer error: {0}")]
    Explorer(String),

    #[error("abi error: {0}")]
    Abi(String),

    #[error("cannot {event} while {stage}")]
    InvalidTransition { stage: String, event: &'static str },

    #[error("transaction {0} reverted")]
    ReceiptReverted(Hex),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, UncensoredError>;

/// Parse a hex string (with or without 0x prefix) into bytes.
pub fn hex_to_bytes(hex_str: &str) -> Result<Vec<u8>> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    hex::decode(hex_str).map_err(|e| UncensoredError::InvalidHex(e.to_string()))
}

/// Convert bytes to a 0x-prefixed hex string.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Whether `s` is a `0x`-prefixed string of whole hex bytes.
///
/// `"0x"` is accepted (empty byte string).
pub fn is_hex_bytes(s: &str) -> bool {
    match s.strip_prefix("0x") {
        Some(body) => body.len() % 2 == 0 && body.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

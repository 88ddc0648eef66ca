//! User-entered transaction fields and their validation.

use alloy_primitives::{utils::parse_ether, Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::{hex_to_bytes, is_hex_bytes, L2Chain, Result, UncensoredError};

/// A transaction as typed into the form. Fields stay raw strings so a
/// half-typed draft can be held and reported on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub recipient: String,
    /// Decimal ether amount, e.g. "0.01". Empty means zero.
    pub value: String,
    /// 0x-prefixed call data. Empty means no call data.
    pub data: String,
    /// Decimal gas limit for the L2 execution.
    pub gas_limit: String,
    pub target: L2Chain,
}

/// Inline error for a single draft field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

impl From<FieldError> for UncensoredError {
    fn from(e: FieldError) -> Self {
        UncensoredError::Validation { field: e.field, reason: e.reason }
    }
}

/// A draft that passed form validation.
///
/// The ether amount stays raw; it is parsed at submission time so a bad
/// amount is reported as a failed submission rather than a field error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDraft {
    pub to: Address,
    pub value_ether: String,
    pub data: Bytes,
    pub gas_limit: u64,
    pub target: L2Chain,
}

impl ValidatedDraft {
    /// Amount in wei.
    pub fn value(&self) -> Result<U256> {
        parse_value(&self.value_ether)
    }
}

/// Most fractional digits an ether amount can carry.
const ETHER_DECIMALS: usize = 18;

/// Parse a decimal ether amount into wei. Empty means zero.
pub fn parse_value(raw: &str) -> Result<U256> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(U256::ZERO);
    }
    if value.starts_with('-') {
        return Err(field("value", "must not be negative").into());
    }
    if value.split_once('.').is_some_and(|(_, frac)| frac.len() > ETHER_DECIMALS) {
        return Err(field("value", "more than 18 decimals").into());
    }
    parse_ether(value).map_err(|e| field("value", &e.to_string()).into())
}

impl TransactionDraft {
    pub fn new(target: L2Chain) -> Self {
        Self { target, ..Default::default() }
    }

    /// Per-field problems of the address, data and gas limit, in form order.
    /// Empty when the draft can be submitted.
    pub fn field_errors(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Err(e) = self.parse_recipient() {
            errors.push(e);
        }
        if let Err(e) = self.parse_data() {
            errors.push(e);
        }
        if let Err(e) = self.parse_gas_limit() {
            errors.push(e);
        }
        errors
    }

    /// Whether the submit actions should be enabled.
    pub fn is_submittable(&self) -> bool {
        self.field_errors().is_empty()
    }

    /// Check the form fields, failing on the first invalid one.
    pub fn validate(&self) -> Result<ValidatedDraft> {
        Ok(ValidatedDraft {
            to: self.parse_recipient()?,
            value_ether: self.value.trim().to_string(),
            data: self.parse_data()?,
            gas_limit: self.parse_gas_limit()?,
            target: self.target,
        })
    }

    fn parse_recipient(&self) -> std::result::Result<Address, FieldError> {
        let recipient = self.recipient.trim();
        if !is_hex_bytes(recipient) {
            return Err(field("recipient", "expected a 0x-prefixed hex address"));
        }
        recipient
            .parse::<Address>()
            .map_err(|e| field("recipient", &e.to_string()))
    }

    fn parse_data(&self) -> std::result::Result<Bytes, FieldError> {
        let data = self.data.trim();
        if data.is_empty() {
            return Ok(Bytes::new());
        }
        if !is_hex_bytes(data) {
            return Err(field("data", "expected 0x-prefixed hex bytes"));
        }
        hex_to_bytes(data)
            .map(Bytes::from)
            .map_err(|e| field("data", &e.to_string()))
    }

    fn parse_gas_limit(&self) -> std::result::Result<u64, FieldError> {
        let gas = self.gas_limit.trim();
        if gas.is_empty() {
            return Err(field("gas_limit", "required"));
        }
        match gas.parse::<u64>() {
            Ok(0) => Err(field("gas_limit", "must be greater than zero")),
            Ok(g) => Ok(g),
            Err(e) => Err(field("gas_limit", &e.to_string())),
        }
    }
}

fn field(field: &'static str, reason: &str) -> FieldError {
    FieldError { field, reason: reason.to_string() }
}

//! OP Stack deposits through the OptimismPortal.
//!
//! L1 call: `depositTransaction(to, value, gasLimit, false, data)` with no L1
//! value attached, so the L2 value is paid from the sender's L2 balance.
//!
//! L2 hash: `keccak256(0x7e ‖ rlp([sourceHash, from, to, mint, value, gas, false, data]))`
//! where `sourceHash = keccak256(u256(0) ‖ keccak256(l1BlockHash ‖ u256(logIndex)))`.

use alloy_primitives::{keccak256, Address, Bytes, TxKind, B256, U256};
use alloy_rlp::{Encodable, RlpEncodable};
use alloy_sol_types::{sol, SolCall, SolEvent};
use uncensored_types::{L2Chain, Network, ReceiptLog, Result, TxReceipt, UncensoredError};

use crate::{expect_chain, InclusionSdk, L1Transaction};

/// EIP-2718 type of deposit transactions.
pub const DEPOSIT_TX_TYPE: u8 = 0x7e;

/// Source-hash domain of user deposits.
const USER_DEPOSIT_DOMAIN: u64 = 0;

/// mint(32) ‖ value(32) ‖ gasLimit(8) ‖ isCreation(1)
const OPAQUE_HEADER_LEN: usize = 73;

sol! {
    interface IOptimismPortal {
        event TransactionDeposited(
            address indexed from,
            address indexed to,
            uint256 indexed version,
            bytes opaqueData
        );

        function depositTransaction(
            address _to,
            uint256 _value,
            uint64 _gasLimit,
            bool _isCreation,
            bytes _data
        ) external payable;
    }
}

/// Deposit transaction fields in RLP order.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable)]
pub struct DepositTx {
    pub source_hash: B256,
    pub from: Address,
    pub to: TxKind,
    pub mint: U256,
    pub value: U256,
    pub gas_limit: u64,
    pub is_system_transaction: bool,
    pub input: Bytes,
}

impl DepositTx {
    pub fn tx_hash(&self) -> B256 {
        let mut buf = Vec::with_capacity(1 + self.length());
        buf.push(DEPOSIT_TX_TYPE);
        self.encode(&mut buf);
        keccak256(&buf)
    }
}

/// Deposit source hash: `keccak256(u256(domain) ‖ inner)`.
pub fn deposit_source_hash(domain: u64, inner: B256) -> B256 {
    let mut input = [0u8; 64];
    input[..32].copy_from_slice(&U256::from(domain).to_be_bytes::<32>());
    input[32..].copy_from_slice(inner.as_slice());
    keccak256(input)
}

/// Source hash of the user deposit emitted at `log_index` of `l1_block_hash`.
pub fn user_deposit_source_hash(l1_block_hash: B256, log_index: u64) -> B256 {
    let mut deposit_id = [0u8; 64];
    deposit_id[..32].copy_from_slice(l1_block_hash.as_slice());
    deposit_id[32..].copy_from_slice(&U256::from(log_index).to_be_bytes::<32>());
    deposit_source_hash(USER_DEPOSIT_DOMAIN, keccak256(deposit_id))
}

/// Rebuild the deposit transaction behind a `TransactionDeposited` log.
pub fn deposit_from_log(log: &ReceiptLog, receipt_block_hash: B256) -> Result<DepositTx> {
    let event = IOptimismPortal::TransactionDeposited::decode_raw_log(
        log.topics.iter().copied(),
        &log.data,
    )
    .map_err(|e| UncensoredError::Other(format!("bad TransactionDeposited log: {}", e)))?;

    let opaque = event.opaqueData.as_ref();
    if opaque.len() < OPAQUE_HEADER_LEN {
        return Err(UncensoredError::Other(format!(
            "opaque deposit data too short: {} bytes",
            opaque.len()
        )));
    }
    let mint = U256::from_be_slice(&opaque[0..32]);
    let value = U256::from_be_slice(&opaque[32..64]);
    let mut gas = [0u8; 8];
    gas.copy_from_slice(&opaque[64..72]);
    let is_creation = opaque[72] != 0;
    let input = Bytes::copy_from_slice(&opaque[OPAQUE_HEADER_LEN..]);

    let log_index = log
        .log_index
        .ok_or_else(|| UncensoredError::Other("deposit log has no index".into()))?;
    let block_hash = log.block_hash.unwrap_or(receipt_block_hash);

    Ok(DepositTx {
        source_hash: user_deposit_source_hash(block_hash, log_index.to::<u64>()),
        from: event.from,
        to: if is_creation { TxKind::Create } else { TxKind::Call(event.to) },
        mint,
        value,
        gas_limit: u64::from_be_bytes(gas),
        is_system_transaction: false,
        input,
    })
}

/// OptimismPortal-backed inclusion for one OP Stack chain.
#[derive(Debug, Clone)]
pub struct OpStackPortal {
    network: Network,
    portal: Address,
}

impl OpStackPortal {
    pub fn new(network: Network, portal: Address) -> Self {
        Self { network, portal }
    }

    pub fn for_network(network: Network) -> Self {
        Self::new(network, L2Chain::Optimism.inclusion_contract(network))
    }

    pub fn portal(&self) -> Address {
        self.portal
    }
}

impl InclusionSdk for OpStackPortal {
    fn transform_transaction(
        &self,
        to: Address,
        value: U256,
        data: &Bytes,
        gas_limit: u64,
        l2_chain_id: u64,
    ) -> Result<L1Transaction> {
        expect_chain(L2Chain::Optimism, self.network, l2_chain_id)?;

        let call = IOptimismPortal::depositTransactionCall {
            _to: to,
            _value: value,
            _gasLimit: gas_limit,
            _isCreation: false,
            _data: data.clone(),
        };
        tracing::debug!(portal = %self.portal, %to, gas_limit, "encoded portal deposit");

        Ok(L1Transaction {
            to: self.portal,
            value: U256::ZERO,
            data: call.abi_encode().into(),
        })
    }

    fn l2_tx_hashes(&self, l1_receipt: &TxReceipt, l2_chain_id: u64) -> Result<Vec<B256>> {
        expect_chain(L2Chain::Optimism, self.network, l2_chain_id)?;

        l1_receipt
            .logs_from(self.portal)
            .filter(|log| {
                log.topics.first() == Some(&IOptimismPortal::TransactionDeposited::SIGNATURE_HASH)
            })
            .map(|log| deposit_from_log(log, l1_receipt.block_hash).map(|tx| tx.tx_hash()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256, U64};
    use alloy_rlp::Header;
    use alloy_sol_types::SolValue;

    fn deposit_log(
        portal: Address,
        from: Address,
        to: Address,
        opaque: Vec<u8>,
        log_index: u64,
    ) -> ReceiptLog {
        ReceiptLog {
            address: portal,
            topics: vec![
                IOptimismPortal::TransactionDeposited::SIGNATURE_HASH,
                from.into_word(),
                to.into_word(),
                B256::ZERO,
            ],
            data: (Bytes::from(opaque),).abi_encode_params().into(),
            block_hash: Some(B256::repeat_byte(0x42)),
            log_index: Some(U64::from(log_index)),
        }
    }

    fn opaque(mint: u64, value: u64, gas: u64, creation: bool, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&U256::from(mint).to_be_bytes::<32>());
        out.extend_from_slice(&U256::from(value).to_be_bytes::<32>());
        out.extend_from_slice(&gas.to_be_bytes());
        out.push(creation as u8);
        out.extend_from_slice(data);
        out
    }

    fn receipt(logs: Vec<ReceiptLog>) -> TxReceipt {
        TxReceipt {
            transaction_hash: B256::repeat_byte(0x01),
            block_hash: B256::repeat_byte(0x42),
            block_number: U64::from(100),
            from: Address::with_last_byte(0xaa),
            to: Some(OpStackPortal::for_network(Network::Mainnet).portal()),
            status: Some(U64::from(1)),
            logs,
        }
    }

    #[test]
    fn test_transform_encodes_deposit_call() {
        let portal = OpStackPortal::for_network(Network::Mainnet);
        let to = Address::with_last_byte(0xbb);
        let tx = portal
            .transform_transaction(
                to,
                U256::from(7),
                &Bytes::from_static(&[0xde, 0xad]),
                150_000,
                10,
            )
            .unwrap();

        assert_eq!(tx.to, portal.portal());
        assert_eq!(tx.value, U256::ZERO);
        assert_eq!(&tx.data[..4], IOptimismPortal::depositTransactionCall::SELECTOR.as_slice());

        let decoded = IOptimismPortal::depositTransactionCall::abi_decode(&tx.data).unwrap();
        assert_eq!(decoded._to, to);
        assert_eq!(decoded._value, U256::from(7));
        assert_eq!(decoded._gasLimit, 150_000);
        assert!(!decoded._isCreation);
        assert_eq!(decoded._data.as_ref(), &[0xde, 0xad]);
    }

    #[test]
    fn test_transform_rejects_other_chain() {
        let portal = OpStackPortal::for_network(Network::Mainnet);
        assert!(portal
            .transform_transaction(Address::ZERO, U256::ZERO, &Bytes::new(), 1, 42161)
            .is_err());
    }

    #[test]
    fn test_deposit_fields_from_log() {
        let portal = OpStackPortal::for_network(Network::Mainnet);
        let from = Address::with_last_byte(0xaa);
        let to = Address::with_last_byte(0xbb);
        let opaque_data = opaque(0, 5, 21_000, false, &[1, 2, 3]);
        let log = deposit_log(portal.portal(), from, to, opaque_data, 3);

        let tx = deposit_from_log(&log, B256::ZERO).unwrap();
        assert_eq!(tx.from, from);
        assert_eq!(tx.to, TxKind::Call(to));
        assert_eq!(tx.mint, U256::ZERO);
        assert_eq!(tx.value, U256::from(5));
        assert_eq!(tx.gas_limit, 21_000);
        assert_eq!(tx.input.as_ref(), &[1, 2, 3]);
        assert_eq!(tx.source_hash, user_deposit_source_hash(B256::repeat_byte(0x42), 3));
    }

    #[test]
    fn test_source_hash_domain_layout() {
        // Published source hash of the Ecotone "L1 Block Deployment" upgrade deposit (domain 2).
        let intent = keccak256("Ecotone: L1 Block Deployment");
        assert_eq!(
            deposit_source_hash(2, intent),
            b256!("877a6077205782ea15a6dc8699fa5ebcec5e0f4389f09cb8eda09488231346f8")
        );
        let block = B256::repeat_byte(0x42);
        let mut id = [0u8; 64];
        id[..32].copy_from_slice(block.as_slice());
        id[63] = 3;
        assert_eq!(user_deposit_source_hash(block, 3), deposit_source_hash(0, keccak256(id)));
    }

    #[test]
    fn test_mainnet_deposit_from_log() {
        // OP Mainnet deposit 0x2bf9119d4faa19593ca1b3cda4b4ac03c0ced487454a50fbdcd09aebe21210e3,
        // an L1CrossDomainMessenger relay to the L2 messenger.
        let input: Bytes = "0xd764ad0b000100000000000000000000000000000000000000000000000000000000af8600000000000000000000000099c9fc46f92e8a1c0dec1b1747d010903e884be10000000000000000000000004200000000000000000000000000000000000010000000000000000000000000000000000000000000000000030d98d59a9600000000000000000000000000000000000000000000000000000000000000030d4000000000000000000000000000000000000000000000000000000000000000c000000000000000000000000000000000000000000000000000000000000000a41635f5fd000000000000000000000000ab12275f2d91f87b301a4f01c9af4e83b3f45baa000000000000000000000000ab12275f2d91f87b301a4f01c9af4e83b3f45baa000000000000000000000000000000000000000000000000030d98d59a9600000000000000000000000000000000000000000000000000000000000000000080000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000"
            .parse()
            .unwrap();
        let from = address!("36bde71c97b33cc4729cf772ae268934f7ab70b2");
        let to = address!("4200000000000000000000000000000000000007");
        let amount = 0x030d98d59a960000u64;
        let portal = OpStackPortal::for_network(Network::Mainnet);
        let opaque_data = opaque(amount, amount, 0x077d2e, false, &input);
        let log = deposit_log(portal.portal(), from, to, opaque_data, 0);

        let mut tx = deposit_from_log(&log, B256::ZERO).unwrap();
        assert_eq!(tx.from, from);
        assert_eq!(tx.to, TxKind::Call(to));
        assert_eq!(tx.mint, U256::from(amount));
        assert_eq!(tx.value, U256::from(amount));
        assert_eq!(tx.gas_limit, 0x077d2e);
        assert!(!tx.is_system_transaction);
        assert_eq!(tx.input, input);

        tx.source_hash = b256!("20b925f36904e1e62099920d902925817c4357e9f674b8b14d13363196139010");
        assert_eq!(
            tx.tx_hash(),
            b256!("2bf9119d4faa19593ca1b3cda4b4ac03c0ced487454a50fbdcd09aebe21210e3")
        );
    }

    #[test]
    fn test_deposit_hash_matches_manual_encoding() {
        let tx = DepositTx {
            source_hash: B256::repeat_byte(0x11),
            from: Address::with_last_byte(0xaa),
            to: TxKind::Call(Address::with_last_byte(0xbb)),
            mint: U256::ZERO,
            value: U256::from(5),
            gas_limit: 21_000,
            is_system_transaction: false,
            input: Bytes::from_static(&[1, 2, 3]),
        };

        let mut payload = Vec::new();
        tx.source_hash.encode(&mut payload);
        tx.from.encode(&mut payload);
        Address::with_last_byte(0xbb).encode(&mut payload);
        U256::ZERO.encode(&mut payload);
        U256::from(5).encode(&mut payload);
        21_000u64.encode(&mut payload);
        false.encode(&mut payload);
        tx.input.encode(&mut payload);

        let mut expected = vec![DEPOSIT_TX_TYPE];
        Header { list: true, payload_length: payload.len() }.encode(&mut expected);
        expected.extend_from_slice(&payload);

        assert_eq!(tx.tx_hash(), keccak256(&expected));
    }

    #[test]
    fn test_hashes_follow_log_order_and_skip_foreign_logs() {
        let portal = OpStackPortal::for_network(Network::Mainnet);
        let from = Address::with_last_byte(0xaa);
        let to = Address::with_last_byte(0xbb);

        let foreign_portal = Address::with_last_byte(0x99);
        let mut foreign = deposit_log(foreign_portal, from, to, opaque(0, 0, 1, false, &[]), 0);
        foreign.topics[0] = B256::repeat_byte(0x77);
        let first = deposit_log(portal.portal(), from, to, opaque(0, 0, 50_000, false, &[]), 1);
        let second = deposit_log(portal.portal(), from, to, opaque(0, 0, 50_000, false, &[]), 2);

        let hashes = portal
            .l2_tx_hashes(&receipt(vec![foreign, first.clone(), second.clone()]), 10)
            .unwrap();
        assert_eq!(hashes.len(), 2);
        assert_eq!(hashes[0], deposit_from_log(&first, B256::ZERO).unwrap().tx_hash());
        assert_ne!(hashes[0], hashes[1]);
    }

    #[test]
    fn test_no_deposit_logs_yields_no_hashes() {
        let portal = OpStackPortal::for_network(Network::Mainnet);
        assert!(portal.l2_tx_hashes(&receipt(vec![]), 10).unwrap().is_empty());
    }

    #[test]
    fn test_short_opaque_data_rejected() {
        let portal = OpStackPortal::for_network(Network::Mainnet);
        let log = deposit_log(portal.portal(), Address::ZERO, Address::ZERO, vec![0u8; 10], 0);
        assert!(deposit_from_log(&log, B256::ZERO).is_err());
    }
}

//! Contract call-data composition from block-explorer ABIs.
//!
//! - Fetch a contract ABI (following proxies) from an Etherscan-family API
//! - List the functions a transaction can call
//! - Encode call data from per-argument strings

use std::collections::HashMap;

use alloy_dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier};
use alloy_json_abi::{Function, JsonAbi, StateMutability};
use alloy_primitives::Bytes;
use uncensored_types::{Result, UncensoredError};

pub mod explorer_client;

pub use explorer_client::{ExplorerClient, SourceInfo};

/// Functions that change state (neither `view` nor `pure`).
pub fn writable_functions(abi: &JsonAbi) -> Vec<&Function> {
    abi.functions()
        .filter(|f| !matches!(f.state_mutability, StateMutability::View | StateMutability::Pure))
        .collect()
}

/// Encode a call to the first function named `function_name`.
///
/// `args` maps input names to their string form (`"0xabc..."`, `"1000"`,
/// `"[1,2]"`, `"true"`). Unnamed inputs are addressed by position (`"0"`, `"1"`, ...).
pub fn encode_call(
    abi: &JsonAbi,
    function_name: &str,
    args: &HashMap<String, String>,
) -> Result<Bytes> {
    let function = abi
        .function(function_name)
        .and_then(|overloads| overloads.first())
        .ok_or_else(|| UncensoredError::Abi(format!("function not found: {}", function_name)))?;

    let values = function
        .inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            let key = if input.name.is_empty() { i.to_string() } else { input.name.clone() };
            let raw = args
                .get(&key)
                .ok_or_else(|| UncensoredError::Abi(format!("missing argument: {}", key)))?;
            let ty: DynSolType = input
                .resolve()
                .map_err(|e| UncensoredError::Abi(format!("unsupported type for {}: {}", key, e)))?;
            ty.coerce_str(raw)
                .map_err(|e| UncensoredError::Abi(format!("invalid {} for {}: {}", ty, key, e)))
        })
        .collect::<Result<Vec<DynSolValue>>>()?;

    let data = function
        .abi_encode_input(&values)
        .map_err(|e| UncensoredError::Abi(e.to_string()))?;

    tracing::debug!(function = %function.signature(), len = data.len(), "encoded call data");
    Ok(Bytes::from(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ERC20_ABI: &str = r#"[
        {"type":"function","name":"transfer","stateMutability":"nonpayable",
         "inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],
         "outputs":[{"name":"","type":"bool"}]},
        {"type":"function","name":"balanceOf","stateMutability":"view",
         "inputs":[{"name":"owner","type":"address"}],
         "outputs":[{"name":"","type":"uint256"}]},
        {"type":"function","name":"decimals","stateMutability":"pure",
         "inputs":[],"outputs":[{"name":"","type":"uint8"}]},
        {"type":"function","name":"deposit","stateMutability":"payable",
         "inputs":[],"outputs":[]},
        {"type":"event","name":"Transfer","anonymous":false,
         "inputs":[{"name":"from","type":"address","indexed":true},
                   {"name":"to","type":"address","indexed":true},
                   {"name":"value","type":"uint256","indexed":false}]}
    ]"#;

    fn abi() -> JsonAbi {
        serde_json::from_str(ERC20_ABI).unwrap()
    }

    #[test]
    fn test_writable_functions_skip_view_and_pure() {
        let abi = abi();
        let mut names: Vec<_> = writable_functions(&abi).iter().map(|f| f.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["deposit", "transfer"]);
    }

    #[test]
    fn test_encode_transfer() {
        let mut args = HashMap::new();
        args.insert("to".to_string(), "0x00000000000000000000000000000000000000aa".to_string());
        args.insert("amount".to_string(), "1000".to_string());

        let data = encode_call(&abi(), "transfer", &args).unwrap();
        assert_eq!(data.len(), 4 + 32 + 32);
        assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(data[35], 0xaa);
        assert_eq!(&data[66..], &[0x03, 0xe8]);
    }

    #[test]
    fn test_encode_no_args() {
        let data = encode_call(&abi(), "deposit", &HashMap::new()).unwrap();
        // keccak256("deposit()")[..4]
        assert_eq!(data.as_ref(), &[0xd0, 0xe3, 0x0d, 0xb0]);
    }

    #[test]
    fn test_missing_and_invalid_arguments() {
        let mut args = HashMap::new();
        args.insert("to".to_string(), "0x00000000000000000000000000000000000000aa".to_string());
        assert!(matches!(encode_call(&abi(), "transfer", &args), Err(UncensoredError::Abi(_))));

        args.insert("amount".to_string(), "not-a-number".to_string());
        assert!(matches!(encode_call(&abi(), "transfer", &args), Err(UncensoredError::Abi(_))));

        assert!(encode_call(&abi(), "mint", &HashMap::new()).is_err());
    }
}

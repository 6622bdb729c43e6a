//! Transaction- and call-related types.

use std::fmt;
use std::str::FromStr;

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, Bytes, U256},
};
use serde::{Deserialize, Serialize, Serializer};

use crate::abi::codec::{encode_quantity, format_address, format_data, parse_quantity};
use crate::error::AppError;

/// Caller-supplied transaction options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxOptions {
    /// Sender account (managed by the remote node).
    pub from: Option<Address>,
    /// Gas limit.
    pub gas: Option<u64>,
    /// Gas price in wei.
    pub gas_price: Option<u128>,
    /// Value in wei.
    pub value: Option<U256>,
    /// Explicit nonce.
    pub nonce: Option<u64>,
}

impl TxOptions {
    /// Options with sender and gas limit set, the two fields every transaction needs.
    pub fn new(from: Address, gas: u64) -> Self {
        Self { from: Some(from), gas: Some(gas), ..Default::default() }
    }
}

/// Call/transaction object as sent on the wire.
///
/// Every numeric field is an individually hex-encoded quantity; absent fields
/// are omitted entirely rather than sent as null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl TransactionPayload {
    /// Payload carrying only call data, optionally addressed.
    pub fn new(to: Option<&Address>, data: &[u8]) -> Self {
        Self { to: to.map(format_address), data: format_data(data), ..Default::default() }
    }

    /// Merge caller options into the payload.
    pub fn with_options(mut self, options: &TxOptions) -> Self {
        self.from = options.from.as_ref().map(format_address);
        self.gas = encode_quantity(options.gas);
        self.gas_price = encode_quantity(options.gas_price);
        self.value = encode_quantity(options.value);
        self.nonce = encode_quantity(options.nonce);
        self
    }
}

/// Block reference for calls and filter bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockTag {
    #[default]
    Latest,
    Earliest,
    Pending,
    Number(u64),
}

impl BlockTag {
    /// Wire form: symbolic tags verbatim, numbers as hex quantities.
    pub fn to_param(&self) -> String {
        match self {
            BlockTag::Latest => "latest".to_string(),
            BlockTag::Earliest => "earliest".to_string(),
            BlockTag::Pending => "pending".to_string(),
            BlockTag::Number(n) => format!("0x{:x}", n),
        }
    }
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_param())
    }
}

impl FromStr for BlockTag {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed {
            "latest" => Ok(BlockTag::Latest),
            "earliest" => Ok(BlockTag::Earliest),
            "pending" => Ok(BlockTag::Pending),
            hex if hex.starts_with("0x") || hex.starts_with("0X") => {
                Ok(BlockTag::Number(parse_quantity(hex)?))
            }
            decimal => decimal
                .parse::<u64>()
                .map(BlockTag::Number)
                .map_err(|_| AppError::InvalidArgument(format!("Invalid block tag: '{}'", s))),
        }
    }
}

impl From<u64> for BlockTag {
    fn from(number: u64) -> Self {
        BlockTag::Number(number)
    }
}

impl Serialize for BlockTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_param())
    }
}

/// Result of a read-only contract call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutput {
    /// The node returned no data (e.g. the address holds no code).
    Empty,
    /// Decoded return values in declaration order.
    Values(Vec<DynSolValue>),
}

impl CallOutput {
    /// Decoded values; empty for [`CallOutput::Empty`].
    pub fn values(&self) -> &[DynSolValue] {
        match self {
            CallOutput::Empty => &[],
            CallOutput::Values(values) => values,
        }
    }

    /// First return value, the common case for single-output functions.
    pub fn first(&self) -> Option<&DynSolValue> {
        self.values().first()
    }
}

/// Request to deploy a registered contract.
#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    pub options: TxOptions,
    /// Constructor arguments in declaration order.
    pub args: Vec<DynSolValue>,
    /// Overrides any bytecode stored at registration.
    pub bytecode: Option<Bytes>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use serde_json::json;

    #[test]
    fn test_payload_omits_absent_fields() {
        let to = address!("742d35cc6634c0532925a3b844bc454e4438f44e");
        let payload = TransactionPayload::new(Some(&to), &[0xa9, 0x05]);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            json!({"to": "0x742d35cc6634c0532925a3b844bc454e4438f44e", "data": "0xa905"})
        );
    }

    #[test]
    fn test_payload_with_options_encodes_quantities() {
        let from = address!("00000000000000000000000000000000000000aa");
        let options = TxOptions {
            from: Some(from),
            gas: Some(1_440_002),
            gas_price: None,
            value: Some(U256::ZERO),
            nonce: Some(7),
        };
        let payload = TransactionPayload::new(None, &[]).with_options(&options);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            json!({
                "from": "0x00000000000000000000000000000000000000aa",
                "data": "0x",
                "gas": "0x15f902",
                "value": "0x0",
                "nonce": "0x7"
            })
        );
        assert!(json.get("gasPrice").is_none());
    }

    #[test]
    fn test_block_tag_params() {
        assert_eq!(BlockTag::Latest.to_param(), "latest");
        assert_eq!(BlockTag::Pending.to_param(), "pending");
        assert_eq!(BlockTag::Earliest.to_param(), "earliest");
        assert_eq!(BlockTag::Number(0).to_param(), "0x0");
        assert_eq!(BlockTag::Number(1_440_002).to_param(), "0x15f902");
    }

    #[test]
    fn test_block_tag_from_str() {
        assert_eq!("latest".parse::<BlockTag>().unwrap(), BlockTag::Latest);
        assert_eq!("0x10".parse::<BlockTag>().unwrap(), BlockTag::Number(16));
        assert_eq!("100".parse::<BlockTag>().unwrap(), BlockTag::Number(100));
        assert!("tomorrow".parse::<BlockTag>().is_err());
    }

    #[test]
    fn test_call_output_accessors() {
        let output = CallOutput::Values(vec![DynSolValue::Bool(true)]);
        assert_eq!(output.first(), Some(&DynSolValue::Bool(true)));
        assert!(CallOutput::Empty.values().is_empty());
        assert!(CallOutput::Empty.first().is_none());
    }
}

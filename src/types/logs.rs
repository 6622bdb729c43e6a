//! Raw and decoded event logs.

use std::collections::BTreeMap;

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, Bytes, B256},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::value;
use crate::abi::codec::{format_address, format_data};

/// A log object as returned by `eth_getFilterLogs` / `eth_getFilterChanges`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    #[serde(default)]
    pub address: Option<Address>,
    pub topics: Vec<B256>,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub block_hash: Option<B256>,
    #[serde(default)]
    pub transaction_hash: Option<B256>,
    #[serde(default)]
    pub transaction_index: Option<String>,
    #[serde(default)]
    pub log_index: Option<String>,
    #[serde(default)]
    pub transaction_log_index: Option<String>,
    #[serde(default)]
    pub removed: bool,
}

/// A log rehydrated against its event metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedLog {
    /// Event name.
    pub event: String,
    pub address: Option<Address>,
    pub block_number: Option<u64>,
    pub block_hash: Option<B256>,
    pub transaction_hash: Option<B256>,
    pub transaction_index: Option<u64>,
    pub log_index: Option<u64>,
    pub transaction_log_index: Option<u64>,
    pub removed: bool,
    /// Indexed and non-indexed fields by name.
    pub fields: BTreeMap<String, DynSolValue>,
}

impl DecodedLog {
    /// Decoded value of a named field.
    pub fn get(&self, field: &str) -> Option<&DynSolValue> {
        self.fields.get(field)
    }

    /// Flat JSON object: event fields plus log metadata. Event fields take
    /// precedence over metadata keys of the same name.
    pub fn to_json(&self) -> Value {
        let mut object: Map<String, Value> =
            self.fields.iter().map(|(name, v)| (name.clone(), value::to_json(v))).collect();

        let mut meta = |key: &str, v: Value| {
            object.entry(key.to_string()).or_insert(v);
        };
        meta("event", Value::String(self.event.clone()));
        if let Some(address) = &self.address {
            meta("address", Value::String(format_address(address)));
        }
        if let Some(n) = self.block_number {
            meta("blockNumber", Value::from(n));
        }
        if let Some(hash) = &self.block_hash {
            meta("blockHash", Value::String(format_data(hash.as_slice())));
        }
        if let Some(hash) = &self.transaction_hash {
            meta("transactionHash", Value::String(format_data(hash.as_slice())));
        }
        if let Some(n) = self.transaction_index {
            meta("transactionIndex", Value::from(n));
        }
        if let Some(n) = self.log_index {
            meta("logIndex", Value::from(n));
        }
        if let Some(n) = self.transaction_log_index {
            meta("transactionLogIndex", Value::from(n));
        }
        if self.removed {
            meta("removed", Value::Bool(true));
        }

        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, U256};
    use serde_json::json;

    #[test]
    fn test_raw_log_deserializes_node_json() {
        let log: RawLog = serde_json::from_value(json!({
            "address": "0x742d35cc6634c0532925a3b844bc454e4438f44e",
            "topics": ["0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"],
            "data": "0x00000000000000000000000000000000000000000000000000000000000003e8",
            "blockNumber": "0x1b4",
            "blockHash": null,
            "transactionIndex": "0x0",
            "logIndex": "0x2"
        }))
        .unwrap();
        assert_eq!(log.topics.len(), 1);
        assert_eq!(log.data.len(), 32);
        assert_eq!(log.block_number.as_deref(), Some("0x1b4"));
        assert!(log.block_hash.is_none());
        assert!(log.transaction_log_index.is_none());
        assert!(!log.removed);
    }

    #[test]
    fn test_decoded_log_to_json_merges_metadata() {
        let mut fields = BTreeMap::new();
        fields.insert("value".to_string(), DynSolValue::Uint(U256::from(1000u64), 256));
        fields.insert(
            "from".to_string(),
            DynSolValue::Address(address!("00000000000000000000000000000000000000aa")),
        );
        let log = DecodedLog {
            event: "Transfer".to_string(),
            block_number: Some(436),
            log_index: Some(2),
            fields,
            ..Default::default()
        };

        assert_eq!(
            log.to_json(),
            json!({
                "event": "Transfer",
                "from": "0x00000000000000000000000000000000000000aa",
                "value": "1000",
                "blockNumber": 436,
                "logIndex": 2
            })
        );
    }

    #[test]
    fn test_decoded_log_field_wins_over_metadata_key() {
        let mut fields = BTreeMap::new();
        fields.insert("event".to_string(), DynSolValue::String("custom".to_string()));
        let log = DecodedLog { event: "Ping".to_string(), fields, ..Default::default() };
        assert_eq!(log.to_json()["event"], json!("custom"));
    }
}

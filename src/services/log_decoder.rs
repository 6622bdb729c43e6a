//! Event log decoder.
//!
//! Rebuilds a name→value map from a raw log: non-indexed fields come from
//! the data blob, indexed fields from the topics after topic-0.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256},
};

use crate::{
    abi::{codec, EventMetadata},
    error::{AppError, Result},
    types::{DecodedLog, RawLog},
};

/// Post-processing applied to one decoded field.
pub type FieldHook = Arc<dyn Fn(DynSolValue) -> Result<DynSolValue> + Send + Sync>;

/// Named field hooks, applied after decoding to fields with a matching name.
#[derive(Clone, Default)]
pub struct FieldHooks {
    hooks: HashMap<String, FieldHook>,
}

impl FieldHooks {
    /// Register `hook` for every decoded field called `field`, replacing any
    /// previous hook for that name.
    pub fn register(&mut self, field: impl Into<String>, hook: FieldHook) {
        self.hooks.insert(field.into(), hook);
    }

    /// Run matching hooks over the fields of `log`.
    pub fn apply(&self, log: &mut DecodedLog) -> Result<()> {
        for (field, hook) in &self.hooks {
            if let Some(value) = log.fields.remove(field) {
                log.fields.insert(field.clone(), hook(value)?);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FieldHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldHooks").field("fields", &self.hooks.keys().collect::<Vec<_>>()).finish()
    }
}

/// Hook that reinterprets a 32-byte word (as bytes32 or uint256) as an address.
pub fn address_word_hook() -> FieldHook {
    Arc::new(|value| match value {
        DynSolValue::Address(address) => Ok(DynSolValue::Address(address)),
        DynSolValue::FixedBytes(word, 32) => word_to_address(&word),
        DynSolValue::Uint(n, 256) => word_to_address(&B256::from(n.to_be_bytes::<32>())),
        other => Err(AppError::TypeMismatch(format!("address (got {:?})", other))),
    })
}

fn word_to_address(word: &B256) -> Result<DynSolValue> {
    let address: Address = codec::decode_address(&codec::format_data(word.as_slice()))?;
    Ok(DynSolValue::Address(address))
}

fn quantity(field: &str, raw: &Option<String>) -> Result<Option<u64>> {
    raw.as_deref()
        .map(|text| {
            codec::parse_quantity(text)
                .map_err(|e| AppError::LogDecode(format!("invalid {} '{}': {}", field, text, e)))
        })
        .transpose()
}

/// Decode `raw` against `metadata`.
pub fn decode_log(raw: &RawLog, metadata: &EventMetadata) -> Result<DecodedLog> {
    let indexed_topics = if metadata.anonymous {
        raw.topics.as_slice()
    } else {
        match raw.topics.split_first() {
            Some((topic0, rest)) if *topic0 == metadata.topic => rest,
            Some((topic0, _)) => {
                return Err(AppError::LogDecode(format!(
                    "topic0 {} does not match event {}",
                    codec::format_data(topic0.as_slice()),
                    metadata.signature
                )))
            }
            None => {
                return Err(AppError::LogDecode(format!(
                    "log has no topics, expected event {}",
                    metadata.signature
                )))
            }
        }
    };

    if indexed_topics.len() != metadata.indexed_types.len() {
        return Err(AppError::LogDecode(format!(
            "{} expects {} indexed topics, log has {}",
            metadata.signature,
            metadata.indexed_types.len(),
            indexed_topics.len()
        )));
    }

    let data_values = codec::decode_values(&metadata.data_types, &raw.data)
        .map_err(|e| AppError::LogDecode(format!("{} data: {}", metadata.signature, e)))?;

    let mut fields = BTreeMap::new();
    for (name, value) in metadata.data_names.iter().zip(data_values) {
        fields.insert(name.clone(), value);
    }

    let indexed = metadata.indexed_names.iter().zip(&metadata.indexed_types).zip(indexed_topics);
    for ((name, ty), topic) in indexed {
        let value = codec::decode_topic(ty, topic)
            .map_err(|e| AppError::LogDecode(format!("{} topic '{}': {}", metadata.name, name, e)))?;
        match fields.entry(name.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(_) => {
                tracing::warn!(event = %metadata.name, field = %name, "Indexed field shadows data field");
            }
        }
    }

    Ok(DecodedLog {
        event: metadata.name.clone(),
        address: raw.address,
        block_number: quantity("blockNumber", &raw.block_number)?,
        block_hash: raw.block_hash,
        transaction_hash: raw.transaction_hash,
        transaction_index: quantity("transactionIndex", &raw.transaction_index)?,
        log_index: quantity("logIndex", &raw.log_index)?,
        transaction_log_index: quantity("transactionLogIndex", &raw.transaction_log_index)?,
        removed: raw.removed,
        fields,
    })
}

/// Decode a batch of logs and apply `hooks` to each.
pub fn decode_logs(
    raw_logs: &[RawLog],
    metadata: &EventMetadata,
    hooks: &FieldHooks,
) -> Result<Vec<DecodedLog>> {
    raw_logs
        .iter()
        .map(|raw| {
            let mut log = decode_log(raw, metadata)?;
            hooks.apply(&mut log)?;
            Ok(log)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::ContractAbi;
    use alloy::primitives::{address, Bytes, U256};
    use serde_json::json;

    fn transfer_metadata() -> Arc<EventMetadata> {
        let abi = ContractAbi::from_json(&json!([{
            "type": "event",
            "name": "Transfer",
            "inputs": [
                {"name": "from", "type": "address", "indexed": true},
                {"name": "to", "type": "address", "indexed": true},
                {"name": "value", "type": "uint256", "indexed": false}
            ]
        }]))
        .unwrap();
        abi.event("Transfer").unwrap().clone()
    }

    fn address_topic(address: Address) -> B256 {
        codec::encode_topic(&alloy::dyn_abi::DynSolType::Address, &DynSolValue::Address(address))
            .unwrap()
    }

    fn transfer_log(metadata: &EventMetadata, from: Address, to: Address, value: u64) -> RawLog {
        let data = codec::encode_tuple("(uint256)", &[DynSolValue::Uint(U256::from(value), 256)])
            .unwrap();
        RawLog {
            topics: vec![metadata.topic, address_topic(from), address_topic(to)],
            data,
            block_number: Some("0x1b4".to_string()),
            log_index: Some("0x2".to_string()),
            transaction_index: Some("0x0".to_string()),
            transaction_log_index: Some("0x1".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_transfer_log() {
        let metadata = transfer_metadata();
        let from = address!("00000000000000000000000000000000000000aa");
        let to = address!("00000000000000000000000000000000000000bb");
        let log = decode_log(&transfer_log(&metadata, from, to, 1000), &metadata).unwrap();

        assert_eq!(log.event, "Transfer");
        assert_eq!(log.get("from"), Some(&DynSolValue::Address(from)));
        assert_eq!(log.get("to"), Some(&DynSolValue::Address(to)));
        assert_eq!(log.get("value"), Some(&DynSolValue::Uint(U256::from(1000u64), 256)));
        assert_eq!(log.fields.len(), 3);
        assert_eq!(log.block_number, Some(436));
        assert_eq!(log.log_index, Some(2));
        assert_eq!(log.transaction_index, Some(0));
        assert_eq!(log.transaction_log_index, Some(1));
    }

    #[test]
    fn test_decode_rejects_wrong_topic0() {
        let metadata = transfer_metadata();
        let mut raw = transfer_log(&metadata, Address::ZERO, Address::ZERO, 1);
        raw.topics[0] = B256::ZERO;
        assert!(matches!(decode_log(&raw, &metadata), Err(AppError::LogDecode(_))));
    }

    #[test]
    fn test_decode_rejects_missing_indexed_topic() {
        let metadata = transfer_metadata();
        let mut raw = transfer_log(&metadata, Address::ZERO, Address::ZERO, 1);
        raw.topics.pop();
        assert!(matches!(decode_log(&raw, &metadata), Err(AppError::LogDecode(_))));
    }

    #[test]
    fn test_decode_rejects_short_data() {
        let metadata = transfer_metadata();
        let mut raw = transfer_log(&metadata, Address::ZERO, Address::ZERO, 1);
        raw.data = Bytes::from(vec![0u8; 4]);
        assert!(matches!(decode_log(&raw, &metadata), Err(AppError::LogDecode(_))));
    }

    #[test]
    fn test_decode_rejects_bad_metadata_quantity() {
        let metadata = transfer_metadata();
        let mut raw = transfer_log(&metadata, Address::ZERO, Address::ZERO, 1);
        raw.block_number = Some("0xnope".to_string());
        assert!(matches!(decode_log(&raw, &metadata), Err(AppError::LogDecode(_))));
    }

    #[test]
    fn test_decode_anonymous_event_uses_all_topics() {
        let abi = ContractAbi::from_json(&json!([{
            "type": "event",
            "name": "Signal",
            "anonymous": true,
            "inputs": [{"name": "who", "type": "address", "indexed": true}]
        }]))
        .unwrap();
        let metadata = abi.event("Signal").unwrap();
        let who = address!("00000000000000000000000000000000000000cc");
        let raw = RawLog { topics: vec![address_topic(who)], ..Default::default() };

        let log = decode_log(&raw, metadata).unwrap();
        assert_eq!(log.get("who"), Some(&DynSolValue::Address(who)));
    }

    #[test]
    fn test_address_word_hook_reformats_word_fields() {
        let abi = ContractAbi::from_json(&json!([{
            "type": "event",
            "name": "Registered",
            "inputs": [{"name": "owner", "type": "bytes32", "indexed": false}]
        }]))
        .unwrap();
        let metadata = abi.event("Registered").unwrap();
        let owner = address!("00000000000000000000000000000000000000dd");
        let data = codec::encode_tuple(
            "(bytes32)",
            &[DynSolValue::FixedBytes(B256::left_padding_from(owner.as_slice()), 32)],
        )
        .unwrap();
        let raw = RawLog { topics: vec![metadata.topic], data, ..Default::default() };

        let mut hooks = FieldHooks::default();
        hooks.register("owner", address_word_hook());
        let logs = decode_logs(&[raw], metadata, &hooks).unwrap();

        assert_eq!(logs[0].get("owner"), Some(&DynSolValue::Address(owner)));
    }

    #[test]
    fn test_address_word_hook_rejects_non_word() {
        let hook = address_word_hook();
        assert!(hook(DynSolValue::Bool(true)).is_err());
        assert!(hook(DynSolValue::Uint(U256::from(0xeeu64), 256)).is_ok());
    }
}

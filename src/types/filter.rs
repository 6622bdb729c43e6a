//! Log filter types.

use std::collections::HashMap;

use alloy::dyn_abi::DynSolValue;
use serde::{Deserialize, Serialize};

use super::BlockTag;

/// Caller-supplied value for one indexed event parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum TopicValue {
    /// Match exactly this value.
    One(DynSolValue),
    /// Match any of these values.
    AnyOf(Vec<DynSolValue>),
}

/// Criteria for installing an event filter.
///
/// Indexed parameters not present in `topics` match anything.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    pub from_block: Option<BlockTag>,
    pub to_block: Option<BlockTag>,
    /// Indexed parameter name to the value(s) it must match.
    pub topics: HashMap<String, TopicValue>,
}

impl FilterCriteria {
    /// Require `field` to equal `value`.
    pub fn topic(mut self, field: impl Into<String>, value: DynSolValue) -> Self {
        self.topics.insert(field.into(), TopicValue::One(value));
        self
    }

    /// Require `field` to equal any of `values`.
    pub fn topic_any(mut self, field: impl Into<String>, values: Vec<DynSolValue>) -> Self {
        self.topics.insert(field.into(), TopicValue::AnyOf(values));
        self
    }

    /// Set the block range.
    pub fn blocks(mut self, from_block: Option<BlockTag>, to_block: Option<BlockTag>) -> Self {
        self.from_block = from_block;
        self.to_block = to_block;
        self
    }
}

/// One position of the wire topic array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopicSlot {
    Single(String),
    Any(Vec<String>),
}

/// `eth_newFilter` parameter object. `None` topic slots serialize as `null`
/// wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_block: Option<String>,
    pub topics: Vec<Option<TopicSlot>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_payload_serializes_wildcards_as_null() {
        let payload = FilterPayload {
            address: None,
            from_block: Some("0x1".to_string()),
            to_block: Some("latest".to_string()),
            topics: vec![
                Some(TopicSlot::Single("0xaa".to_string())),
                Some(TopicSlot::Any(vec!["0xbb".to_string(), "0xcc".to_string()])),
                None,
            ],
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "fromBlock": "0x1",
                "toBlock": "latest",
                "topics": ["0xaa", ["0xbb", "0xcc"], null]
            })
        );
    }

    #[test]
    fn test_filter_criteria_builder() {
        let criteria = FilterCriteria::default()
            .topic("from", DynSolValue::Bool(true))
            .topic_any("to", vec![DynSolValue::Bool(false)])
            .blocks(Some(BlockTag::Earliest), None);
        assert_eq!(criteria.topics.len(), 2);
        assert_eq!(criteria.from_block, Some(BlockTag::Earliest));
        assert!(matches!(criteria.topics.get("to"), Some(TopicValue::AnyOf(v)) if v.len() == 1));
    }
}

//! Filter registry.
//!
//! Remembers which contract event each node-assigned filter id decodes
//! against, and builds the `eth_newFilter` parameter object from an event's
//! metadata.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::Address;

use crate::{
    abi::{codec, EventMetadata},
    error::{AppError, Result},
    types::{FilterCriteria, FilterPayload, TopicSlot, TopicValue},
};

/// A filter installed through the session.
#[derive(Debug, Clone)]
pub struct FilterRecord {
    pub filter_id: String,
    pub contract_name: String,
    pub event_name: String,
    /// Event metadata captured when the filter was installed.
    pub metadata: Arc<EventMetadata>,
}

/// Filter id → record.
#[derive(Debug, Default)]
pub struct FilterRegistry {
    filters: HashMap<String, FilterRecord>,
}

impl FilterRegistry {
    pub fn insert(&mut self, record: FilterRecord) {
        self.filters.insert(record.filter_id.clone(), record);
    }

    pub fn get(&self, filter_id: &str) -> Result<&FilterRecord> {
        self.filters.get(filter_id).ok_or_else(|| AppError::UnknownFilter(filter_id.to_string()))
    }

    pub fn remove(&mut self, filter_id: &str) -> Option<FilterRecord> {
        self.filters.remove(filter_id)
    }

    pub fn contains(&self, filter_id: &str) -> bool {
        self.filters.contains_key(filter_id)
    }

    /// Installed filter ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.filters.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// Build the topic array for `metadata`: topic-0 (unless anonymous), then one
/// slot per indexed parameter in declaration order. Parameters missing from
/// `topics` become `null` wildcards.
pub fn build_topics(
    metadata: &EventMetadata,
    topics: &HashMap<String, TopicValue>,
) -> Result<Vec<Option<TopicSlot>>> {
    if let Some(unknown) = topics.keys().find(|name| metadata.indexed_position(name).is_none()) {
        return Err(AppError::InvalidArgument(format!(
            "'{}' is not an indexed parameter of {}",
            unknown, metadata.signature
        )));
    }

    let mut slots = Vec::with_capacity(metadata.indexed_types.len() + 1);
    if !metadata.anonymous {
        slots.push(Some(TopicSlot::Single(codec::format_data(metadata.topic.as_slice()))));
    }

    for (name, ty) in metadata.indexed_names.iter().zip(&metadata.indexed_types) {
        let slot = match topics.get(name) {
            None => None,
            Some(TopicValue::One(value)) => {
                let topic = codec::encode_topic(ty, value)?;
                Some(TopicSlot::Single(codec::format_data(topic.as_slice())))
            }
            Some(TopicValue::AnyOf(values)) => {
                if values.is_empty() {
                    return Err(AppError::InvalidArgument(format!(
                        "empty candidate list for topic '{}'",
                        name
                    )));
                }
                let encoded = values
                    .iter()
                    .map(|value| {
                        codec::encode_topic(ty, value).map(|t| codec::format_data(t.as_slice()))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Some(TopicSlot::Any(encoded))
            }
        };
        slots.push(slot);
    }

    Ok(slots)
}

/// Build the full `eth_newFilter` parameter object.
pub fn build_filter(
    address: Option<&Address>,
    metadata: &EventMetadata,
    criteria: &FilterCriteria,
) -> Result<FilterPayload> {
    Ok(FilterPayload {
        address: address.map(codec::format_address),
        from_block: criteria.from_block.map(|b| b.to_param()),
        to_block: criteria.to_block.map(|b| b.to_param()),
        topics: build_topics(metadata, &criteria.topics)?,
    })
}

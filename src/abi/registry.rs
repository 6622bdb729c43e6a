//! ABI registry.
//!
//! Parses a JSON ABI description into an indexed [`ContractAbi`]: entries are
//! discriminated into [`AbiEntry`] variants exactly once, parameter types are
//! validated, and per-event [`EventMetadata`] is derived up front.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use alloy::{
    dyn_abi::DynSolType,
    primitives::{Selector, B256},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::codec;
use crate::error::{AppError, Result};

/// A single input/output parameter as it appears in the JSON ABI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiParam {
    /// Parameter name (may be empty).
    #[serde(default)]
    pub name: String,
    /// Solidity type as written in the ABI (`uint256`, `tuple[]`, ...).
    #[serde(rename = "type")]
    pub ty: String,
    /// Event parameters only: stored in a topic rather than the data blob.
    #[serde(default)]
    pub indexed: bool,
    /// Members of a `tuple` type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<AbiParam>,
}

impl AbiParam {
    /// Type text with `tuple` expanded from its components, e.g. `(uint256,address)[]`.
    pub fn canonical_type(&self) -> String {
        match self.ty.strip_prefix("tuple") {
            Some(suffix) => {
                let members: Vec<String> =
                    self.components.iter().map(AbiParam::canonical_type).collect();
                format!("({}){}", members.join(","), suffix)
            }
            None => self.ty.clone(),
        }
    }

    /// Parsed type of this parameter.
    pub fn sol_type(&self) -> Result<DynSolType> {
        codec::parse_type(&self.canonical_type())
    }
}

/// Function state mutability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    /// Reads no state.
    Pure,
    /// Reads but does not modify state.
    View,
    /// Modifies state, rejects value.
    NonPayable,
    /// Modifies state, accepts value.
    Payable,
}

impl StateMutability {
    /// Whether the function can be served by `eth_call` alone.
    pub fn is_read_only(self) -> bool {
        matches!(self, StateMutability::Pure | StateMutability::View)
    }
}

/// A callable function.
#[derive(Debug, Clone)]
pub struct FunctionEntry {
    pub name: String,
    pub inputs: Vec<AbiParam>,
    pub outputs: Vec<AbiParam>,
    pub state_mutability: StateMutability,
    pub input_types: Vec<DynSolType>,
    pub output_types: Vec<DynSolType>,
    pub selector: Selector,
}

impl FunctionEntry {
    /// Canonical `name(types)` text.
    pub fn signature(&self) -> String {
        codec::signature(&self.name, &self.input_types)
    }

    /// Tuple signature of the outputs, e.g. `(uint256)`.
    pub fn output_signature(&self) -> String {
        codec::tuple_signature(&self.output_types)
    }
}

/// The constructor slot.
#[derive(Debug, Clone)]
pub struct ConstructorEntry {
    pub inputs: Vec<AbiParam>,
    pub input_types: Vec<DynSolType>,
    pub payable: bool,
}

/// Derived, immutable description of an event used to build filters and
/// decode logs.
#[derive(Debug, Clone, PartialEq)]
pub struct EventMetadata {
    pub name: String,
    /// Canonical signature text over all inputs, e.g. `Transfer(address,address,uint256)`.
    pub signature: String,
    /// Topic-0 value (`keccak256(signature)`).
    pub topic: B256,
    /// Anonymous events do not emit topic-0.
    pub anonymous: bool,
    pub data_names: Vec<String>,
    pub data_types: Vec<DynSolType>,
    pub indexed_names: Vec<String>,
    pub indexed_types: Vec<DynSolType>,
}

impl EventMetadata {
    fn from_inputs(name: &str, inputs: &[AbiParam], anonymous: bool) -> Result<Self> {
        let mut all_types = Vec::with_capacity(inputs.len());
        let mut data_names = Vec::new();
        let mut data_types = Vec::new();
        let mut indexed_names = Vec::new();
        let mut indexed_types = Vec::new();

        for (position, param) in inputs.iter().enumerate() {
            let ty = param.sol_type()?;
            let field = if param.name.trim().is_empty() {
                format!("arg{}", position)
            } else {
                param.name.clone()
            };
            if param.indexed {
                indexed_names.push(field);
                indexed_types.push(ty.clone());
            } else {
                data_names.push(field);
                data_types.push(ty.clone());
            }
            all_types.push(ty);
        }

        let signature = codec::signature(name, &all_types);
        let topic = codec::topic_hash(&signature);

        Ok(Self {
            name: name.to_string(),
            signature,
            topic,
            anonymous,
            data_names,
            data_types,
            indexed_names,
            indexed_types,
        })
    }

    /// Tuple signature of the non-indexed fields carried in the log data.
    pub fn data_signature(&self) -> String {
        codec::tuple_signature(&self.data_types)
    }

    /// Position of an indexed field among the indexed parameters.
    pub fn indexed_position(&self, field: &str) -> Option<usize> {
        self.indexed_names.iter().position(|n| n == field)
    }
}

/// One ABI entry, discriminated at parse time.
#[derive(Debug, Clone)]
pub enum AbiEntry {
    Function(FunctionEntry),
    Constructor(ConstructorEntry),
    Fallback { payable: bool },
    Receive,
    Event(Arc<EventMetadata>),
}

/// Lookup key: singleton slots are keyed apart from named entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbiKey {
    Constructor,
    Fallback,
    Receive,
    Named(String),
}

impl fmt::Display for AbiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiKey::Constructor => f.write_str("constructor"),
            AbiKey::Fallback => f.write_str("fallback"),
            AbiKey::Receive => f.write_str("receive"),
            AbiKey::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAbiEntry {
    #[serde(rename = "type", default = "default_entry_type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    inputs: Vec<AbiParam>,
    #[serde(default)]
    outputs: Vec<AbiParam>,
    #[serde(default)]
    anonymous: bool,
    #[serde(default)]
    state_mutability: Option<StateMutability>,
    #[serde(default)]
    constant: Option<bool>,
    #[serde(default)]
    payable: Option<bool>,
}

fn default_entry_type() -> String {
    "function".to_string()
}

impl RawAbiEntry {
    fn mutability(&self) -> StateMutability {
        match (self.state_mutability, self.constant, self.payable) {
            (Some(m), _, _) => m,
            (None, Some(true), _) => StateMutability::View,
            (None, _, Some(true)) => StateMutability::Payable,
            _ => StateMutability::NonPayable,
        }
    }

    fn required_name(&self) -> Result<String> {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            _ => Err(AppError::InvalidAbi(format!("{} entry without a name", self.kind))),
        }
    }
}

fn param_types(params: &[AbiParam]) -> Result<Vec<DynSolType>> {
    params.iter().map(AbiParam::sol_type).collect()
}

/// Indexed form of one contract's ABI.
#[derive(Debug, Clone, Default)]
pub struct ContractAbi {
    entries: HashMap<AbiKey, AbiEntry>,
    events: HashMap<B256, Arc<EventMetadata>>,
    event_names: HashMap<String, B256>,
}

impl ContractAbi {
    /// Parse a JSON ABI: an array of entries, a string containing one, or an
    /// artifact object carrying it under `abi`.
    pub fn from_json(value: &Value) -> Result<Self> {
        let raw: Vec<RawAbiEntry> = match value {
            Value::String(text) => serde_json::from_str(text),
            Value::Object(artifact) => match artifact.get("abi") {
                Some(abi) => return Self::from_json(abi),
                None => {
                    return Err(AppError::InvalidAbi("object without an 'abi' key".to_string()))
                }
            },
            other => serde_json::from_value(other.clone()),
        }
        .map_err(|e| AppError::InvalidAbi(e.to_string()))?;

        let mut abi = Self::default();
        for entry in raw {
            abi.add(entry)?;
        }
        Ok(abi)
    }

    fn add(&mut self, raw: RawAbiEntry) -> Result<()> {
        match raw.kind.as_str() {
            "function" => {
                let name = raw.required_name()?;
                let input_types = param_types(&raw.inputs)?;
                let output_types = param_types(&raw.outputs)?;
                let selector = codec::selector_for(&name, &input_types);
                let state_mutability = raw.mutability();
                let entry = FunctionEntry {
                    name: name.clone(),
                    inputs: raw.inputs,
                    outputs: raw.outputs,
                    state_mutability,
                    input_types,
                    output_types,
                    selector,
                };
                self.insert(AbiKey::Named(name), AbiEntry::Function(entry))
            }
            "constructor" => {
                let input_types = param_types(&raw.inputs)?;
                let payable = raw.mutability() == StateMutability::Payable;
                let entry = ConstructorEntry { inputs: raw.inputs, input_types, payable };
                self.insert(AbiKey::Constructor, AbiEntry::Constructor(entry))
            }
            "fallback" => {
                let payable = raw.mutability() == StateMutability::Payable;
                self.insert(AbiKey::Fallback, AbiEntry::Fallback { payable })
            }
            "receive" => self.insert(AbiKey::Receive, AbiEntry::Receive),
            "event" => {
                let name = raw.required_name()?;
                let metadata =
                    Arc::new(EventMetadata::from_inputs(&name, &raw.inputs, raw.anonymous)?);
                self.insert(AbiKey::Named(name.clone()), AbiEntry::Event(metadata.clone()))?;
                self.event_names.insert(name, metadata.topic);
                self.events.insert(metadata.topic, metadata);
                Ok(())
            }
            "error" => {
                tracing::debug!(name = ?raw.name, "Skipping custom error ABI entry");
                Ok(())
            }
            other => Err(AppError::InvalidAbi(format!("unknown entry type '{}'", other))),
        }
    }

    fn insert(&mut self, key: AbiKey, entry: AbiEntry) -> Result<()> {
        if self.entries.contains_key(&key) {
            return Err(AppError::DuplicateAbiEntry(key.to_string()));
        }
        self.entries.insert(key, entry);
        Ok(())
    }

    /// Look up any entry by key.
    pub fn entry(&self, key: &AbiKey) -> Option<&AbiEntry> {
        self.entries.get(key)
    }

    /// Look up a function by name.
    pub fn function(&self, name: &str) -> Option<&FunctionEntry> {
        match self.entries.get(&AbiKey::Named(name.to_string())) {
            Some(AbiEntry::Function(function)) => Some(function),
            _ => None,
        }
    }

    /// The constructor, if the ABI declares one.
    pub fn constructor(&self) -> Option<&ConstructorEntry> {
        match self.entries.get(&AbiKey::Constructor) {
            Some(AbiEntry::Constructor(constructor)) => Some(constructor),
            _ => None,
        }
    }

    /// Event metadata by event name.
    pub fn event(&self, name: &str) -> Option<&Arc<EventMetadata>> {
        self.event_names.get(name).and_then(|topic| self.events.get(topic))
    }

    /// Event metadata by topic-0 hash.
    pub fn event_by_topic(&self, topic: &B256) -> Option<&Arc<EventMetadata>> {
        self.events.get(topic)
    }

    /// All functions, in no particular order.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionEntry> {
        self.entries.values().filter_map(|entry| match entry {
            AbiEntry::Function(function) => Some(function),
            _ => None,
        })
    }

    /// All event metadata, in no particular order.
    pub fn events(&self) -> impl Iterator<Item = &Arc<EventMetadata>> {
        self.events.values()
    }

    /// Number of entries, singleton slots included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ABI declared nothing usable.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

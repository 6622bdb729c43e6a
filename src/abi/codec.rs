//! ABI type codec.
//!
//! Conversion between typed values and the 32-byte-word ABI wire format, plus
//! the signature hashing used for selectors and event topics. Value-level
//! encoding is delegated to `alloy::dyn_abi`; this module owns the signature
//! text conventions, argument validation and the hex helpers used on the wire.

use alloy::{
    dyn_abi::{DynSolType, DynSolValue},
    hex,
    primitives::{keccak256, Address, Bytes, Selector, B256, U256},
};

use crate::error::{AppError, Result};

const ADDRESS_LEN: usize = 20;
const WORD_LEN: usize = 32;

/// Parse a single Solidity type string (e.g. `uint256`, `address[]`, `(bool,bytes)`).
pub fn parse_type(ty: &str) -> Result<DynSolType> {
    DynSolType::parse(ty.trim())
        .map_err(|e| AppError::InvalidType { ty: ty.to_string(), reason: e.to_string() })
}

/// Parse a parenthesised tuple signature into its member types.
pub fn parse_tuple_signature(signature: &str) -> Result<Vec<DynSolType>> {
    let trimmed = signature.trim();
    if trimmed == "()" {
        return Ok(Vec::new());
    }
    match parse_type(trimmed)? {
        DynSolType::Tuple(types) => Ok(types),
        _ => Err(AppError::InvalidType {
            ty: signature.to_string(),
            reason: "expected a parenthesised tuple signature".to_string(),
        }),
    }
}

/// Render member types as a canonical tuple signature, e.g. `(uint256,address)`.
pub fn tuple_signature(types: &[DynSolType]) -> String {
    let names: Vec<String> = types.iter().map(|t| t.sol_type_name().into_owned()).collect();
    format!("({})", names.join(","))
}

/// Canonical `name(type,...)` text for a function or event.
pub fn signature(name: &str, types: &[DynSolType]) -> String {
    format!("{}{}", name, tuple_signature(types))
}

/// 4-byte method selector: first 4 bytes of `keccak256(name(types))`.
pub fn selector<S: AsRef<str>>(name: &str, input_types: &[S]) -> Result<Selector> {
    let types = input_types.iter().map(|t| parse_type(t.as_ref())).collect::<Result<Vec<_>>>()?;
    Ok(selector_for(name, &types))
}

/// Selector for already-parsed input types.
pub fn selector_for(name: &str, types: &[DynSolType]) -> Selector {
    let hash = keccak256(signature(name, types).as_bytes());
    Selector::from_slice(&hash[..4])
}

/// 32-byte topic hash of an event signature text.
pub fn topic_hash(signature_text: &str) -> B256 {
    keccak256(signature_text.as_bytes())
}

/// Encode `values` against a tuple signature such as `(uint256,address)`.
pub fn encode_tuple(type_signature: &str, values: &[DynSolValue]) -> Result<Bytes> {
    let types = parse_tuple_signature(type_signature)?;
    encode_values(&types, values)
}

/// Encode `values` against already-parsed member types using head/tail layout.
pub fn encode_values(types: &[DynSolType], values: &[DynSolValue]) -> Result<Bytes> {
    if types.len() != values.len() {
        return Err(AppError::ArgumentCount { expected: types.len(), actual: values.len() });
    }
    for (ty, value) in types.iter().zip(values) {
        if !ty.matches(value) {
            return Err(AppError::TypeMismatch(ty.sol_type_name().into_owned()));
        }
    }
    if values.is_empty() {
        return Ok(Bytes::new());
    }
    Ok(DynSolValue::Tuple(values.to_vec()).abi_encode_params().into())
}

/// Selector followed by the encoded arguments.
pub fn encode_call(
    selector: Selector,
    types: &[DynSolType],
    values: &[DynSolValue],
) -> Result<Bytes> {
    let args = encode_values(types, values)?;
    let mut data = Vec::with_capacity(4 + args.len());
    data.extend_from_slice(selector.as_slice());
    data.extend_from_slice(&args);
    Ok(data.into())
}

/// Decode `data` against a tuple signature.
///
/// Legacy: a `(address)` signature given a bare 20-byte payload (rather than
/// a padded word) decodes to that address directly.
pub fn decode_tuple(type_signature: &str, data: &[u8]) -> Result<Vec<DynSolValue>> {
    let types = parse_tuple_signature(type_signature)?;
    if data.len() == ADDRESS_LEN && matches!(types.as_slice(), [DynSolType::Address]) {
        return Ok(vec![DynSolValue::Address(Address::from_slice(data))]);
    }
    decode_values(&types, data)
}

/// Decode `data` against already-parsed member types.
pub fn decode_values(types: &[DynSolType], data: &[u8]) -> Result<Vec<DynSolValue>> {
    if types.is_empty() {
        return Ok(Vec::new());
    }
    match DynSolType::Tuple(types.to_vec()).abi_decode_params(data)? {
        DynSolValue::Tuple(values) => Ok(values),
        other => Ok(vec![other]),
    }
}

/// Decode an address from either its 32-byte padded word or its 20-byte form.
pub fn decode_address(text: &str) -> Result<Address> {
    let bytes = hex::decode(text.trim())
        .map_err(|e| AppError::InvalidAddress(format!("{}: {}", text, e)))?;
    match bytes.len() {
        ADDRESS_LEN => Ok(Address::from_slice(&bytes)),
        WORD_LEN if bytes[..WORD_LEN - ADDRESS_LEN].iter().all(|b| *b == 0) => {
            Ok(Address::from_slice(&bytes[WORD_LEN - ADDRESS_LEN..]))
        }
        WORD_LEN => {
            Err(AppError::InvalidAddress(format!("{}: word has non-zero upper 12 bytes", text)))
        }
        n => Err(AppError::InvalidAddress(format!("{}: expected 20 or 32 bytes, got {}", text, n))),
    }
}

/// Lowercase `0x`-prefixed hex of an address.
pub fn format_address(address: &Address) -> String {
    hex::encode_prefixed(address.as_slice())
}

/// Lowercase `0x`-prefixed hex of arbitrary data (hashes, call data).
pub fn format_data(data: &[u8]) -> String {
    hex::encode_prefixed(data)
}

/// Hex quantity with no leading zero nibble; `0x0` for zero, `None` when absent.
pub fn encode_quantity<T>(value: Option<T>) -> Option<String>
where
    U256: alloy::primitives::ruint::UintTryFrom<T>,
{
    value.map(|v| format!("0x{:x}", U256::from(v)))
}

/// Parse a hex quantity (`0x1a`) into an integer.
pub fn parse_quantity(text: &str) -> Result<u64> {
    let digits = text.trim().trim_start_matches("0x").trim_start_matches("0X");
    if digits.is_empty() {
        return Err(AppError::Parse(format!("Empty hex quantity: '{}'", text)));
    }
    Ok(u64::from_str_radix(digits, 16)?)
}

/// Whether an indexed parameter of this type is stored as a hash in its topic.
pub fn is_hashed_topic(ty: &DynSolType) -> bool {
    matches!(
        ty,
        DynSolType::String
            | DynSolType::Bytes
            | DynSolType::Array(_)
            | DynSolType::FixedArray(..)
            | DynSolType::Tuple(_)
            | DynSolType::CustomStruct { .. }
    )
}

/// Encode a value into the 32-byte topic word used for an indexed parameter.
pub fn encode_topic(ty: &DynSolType, value: &DynSolValue) -> Result<B256> {
    if !ty.matches(value) {
        return Err(AppError::TypeMismatch(ty.sol_type_name().into_owned()));
    }
    match value {
        DynSolValue::String(text) => return Ok(keccak256(text.as_bytes())),
        DynSolValue::Bytes(bytes) => return Ok(keccak256(bytes)),
        _ if is_hashed_topic(ty) => {
            let mut preimage = Vec::new();
            topic_preimage(value, &mut preimage);
            return Ok(keccak256(preimage));
        }
        _ => {}
    }
    let word = value.abi_encode();
    if word.len() != WORD_LEN {
        return Err(AppError::TypeMismatch(ty.sol_type_name().into_owned()));
    }
    Ok(B256::from_slice(&word))
}

/// In-place encoding hashed for indexed arrays and tuples.
///
/// Every element occupies whole words: value types as their ABI word, nested
/// `string`/`bytes` right-padded to a word boundary without a length prefix.
fn topic_preimage(value: &DynSolValue, out: &mut Vec<u8>) {
    match value {
        DynSolValue::String(text) => pad_right(text.as_bytes(), out),
        DynSolValue::Bytes(bytes) => pad_right(bytes, out),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            items.iter().for_each(|item| topic_preimage(item, out))
        }
        DynSolValue::CustomStruct { tuple, .. } => {
            tuple.iter().for_each(|item| topic_preimage(item, out))
        }
        other => out.extend_from_slice(&other.abi_encode()),
    }
}

fn pad_right(bytes: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(bytes);
    let rem = bytes.len() % WORD_LEN;
    if rem != 0 {
        out.resize(out.len() + WORD_LEN - rem, 0);
    }
}

/// Decode an indexed parameter from its topic word.
///
/// Hashed types cannot be recovered and surface as the raw 32-byte hash.
pub fn decode_topic(ty: &DynSolType, topic: &B256) -> Result<DynSolValue> {
    if is_hashed_topic(ty) {
        return Ok(DynSolValue::FixedBytes(*topic, WORD_LEN));
    }
    Ok(ty.abi_decode(topic.as_slice())?)
}

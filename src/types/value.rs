//! Conversion between JSON values and ABI values.
//!
//! Inbound JSON is coerced against the declared Solidity type; outbound
//! values render integers as decimal strings so that 256-bit quantities
//! survive JSON number limits.

use alloy::dyn_abi::{DynSolType, DynSolValue};
use serde_json::Value;

use crate::abi::codec::{format_address, format_data};
use crate::error::{AppError, Result};

/// Coerce a JSON value into an ABI value of type `ty`.
pub fn from_json(ty: &DynSolType, value: &Value) -> Result<DynSolValue> {
    match (ty, value) {
        (DynSolType::Array(inner), Value::Array(items)) => {
            let values = items.iter().map(|item| from_json(inner, item)).collect::<Result<_>>()?;
            Ok(DynSolValue::Array(values))
        }
        (DynSolType::FixedArray(inner, len), Value::Array(items)) => {
            if items.len() != *len {
                return Err(AppError::InvalidArgument(format!(
                    "expected {} elements for {}, got {}",
                    len,
                    ty.sol_type_name(),
                    items.len()
                )));
            }
            let values = items.iter().map(|item| from_json(inner, item)).collect::<Result<_>>()?;
            Ok(DynSolValue::FixedArray(values))
        }
        (DynSolType::Tuple(types), Value::Array(items)) => {
            Ok(DynSolValue::Tuple(from_json_args(types, items)?))
        }
        (DynSolType::Bool, Value::Bool(b)) => Ok(DynSolValue::Bool(*b)),
        (_, Value::String(text)) => coerce(ty, text),
        (_, Value::Number(number)) => coerce(ty, &number.to_string()),
        _ => Err(AppError::InvalidArgument(format!(
            "cannot convert {} to {}",
            value,
            ty.sol_type_name()
        ))),
    }
}

/// Coerce positional JSON arguments against declared parameter types.
pub fn from_json_args(types: &[DynSolType], args: &[Value]) -> Result<Vec<DynSolValue>> {
    if types.len() != args.len() {
        return Err(AppError::ArgumentCount { expected: types.len(), actual: args.len() });
    }
    types.iter().zip(args).map(|(ty, arg)| from_json(ty, arg)).collect()
}

fn coerce(ty: &DynSolType, text: &str) -> Result<DynSolValue> {
    ty.coerce_str(text).map_err(|e| {
        AppError::InvalidArgument(format!("'{}' is not a valid {}: {}", text, ty.sol_type_name(), e))
    })
}

/// Render an ABI value as JSON.
pub fn to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Address(address) => Value::String(format_address(address)),
        DynSolValue::Uint(n, _) => Value::String(n.to_string()),
        DynSolValue::Int(n, _) => Value::String(n.to_string()),
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Bytes(bytes) => Value::String(format_data(bytes)),
        DynSolValue::FixedBytes(word, size) => {
            Value::String(format_data(&word.as_slice()[..(*size).min(32)]))
        }
        DynSolValue::Function(function) => Value::String(format_data(function.as_slice())),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(to_json).collect())
        }
        DynSolValue::CustomStruct { tuple, .. } => Value::Array(tuple.iter().map(to_json).collect()),
    }
}

/// Render a sequence of return values: a single value unwrapped, several as an array.
pub fn values_to_json(values: &[DynSolValue]) -> Value {
    match values {
        [single] => to_json(single),
        many => Value::Array(many.iter().map(to_json).collect()),
    }
}

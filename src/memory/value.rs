//! Value representation for replayed variables
//!
//! This module defines the [`Value`] enum, the closed set of shapes a traced
//! variable can hold. Traces carry loosely typed JSON; everything is folded
//! into one of four variants when it enters the memory model.
//!
//! # Value Types
//!
//! - [`Value::Int`]: integer (also used for pointers written by `malloc`)
//! - [`Value::Text`]: a string as reported by the trace
//! - [`Value::Chars`]: a character array, e.g. a `char[]` filled by a store
//! - [`Value::Bytes`]: opaque raw bytes

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Memory address type (64-bit)
pub type Address = u64;

/// Render an address the way every description and view shows it
pub fn format_address(addr: Address) -> String {
    format!("0x{:08x}", addr)
}

/// Runtime values held by stack variables
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Text(String),
    Chars(Vec<char>),
    Bytes(Vec<u8>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Int(0)
    }
}

impl Value {
    /// Fold an untyped JSON value into a [`Value`]
    ///
    /// Numbers become `Int`, strings `Text`, arrays of one-character strings
    /// `Chars` and arrays of numbers `Bytes`. Integers above `i64::MAX`
    /// saturate. A number array holding anything outside `0..=255` is an
    /// error. Any other shape falls back to the default `Int(0)`.
    pub fn from_json(raw: &serde_json::Value) -> Result<Self, String> {
        use serde_json::Value as Json;

        let value = match raw {
            Json::Number(n) => n
                .as_i64()
                .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(Value::Int)
                .unwrap_or_default(),
            Json::Bool(b) => Value::Int(i64::from(*b)),
            Json::String(s) => Value::Text(s.clone()),
            Json::Array(items) if items.is_empty() => Value::Bytes(Vec::new()),
            Json::Array(items) => {
                let chars: Option<Vec<char>> = items
                    .iter()
                    .map(|item| {
                        let s = item.as_str()?;
                        let mut it = s.chars();
                        match (it.next(), it.next()) {
                            (Some(c), None) => Some(c),
                            _ => None,
                        }
                    })
                    .collect();
                if let Some(chars) = chars {
                    return Ok(Value::Chars(chars));
                }
                if !items.iter().all(Json::is_number) {
                    return Ok(Value::default());
                }
                let bytes = items
                    .iter()
                    .map(|item| {
                        item.as_u64()
                            .and_then(|n| u8::try_from(n).ok())
                            .ok_or_else(|| format!("byte value {} out of range", item))
                    })
                    .collect::<Result<Vec<u8>, String>>()?;
                Value::Bytes(bytes)
            }
            Json::Null | Json::Object(_) => Value::default(),
        };
        Ok(value)
    }

    /// Interpret bytes stored into a character variable: text up to the first NUL
    pub fn chars_from_bytes(bytes: &[u8]) -> Self {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Value::Chars(bytes[..end].iter().map(|&b| b as char).collect())
    }

    /// Interpret exactly four bytes as a little-endian unsigned integer
    pub fn from_le_word(bytes: [u8; 4]) -> Self {
        Value::Int(i64::from(u32::from_le_bytes(bytes)))
    }

    /// Collect a character array into a `String`, returns None for other variants
    pub fn as_char_string(&self) -> Option<String> {
        match self {
            Value::Chars(chars) => Some(chars.iter().collect()),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Value::from_json(&raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Chars(chars) => {
                let s: String = chars.iter().collect();
                write!(f, "{{{:?}}}", s)
            }
            Value::Bytes(bytes) => {
                write!(f, "[")?;
                for (i, b) in bytes.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{:02x}", b)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_shapes() {
        assert_eq!(Value::from_json(&json!(42)), Ok(Value::Int(42)));
        assert_eq!(Value::from_json(&json!("hi")), Ok(Value::Text("hi".into())));
        assert_eq!(
            Value::from_json(&json!(["h", "i"])),
            Ok(Value::Chars(vec!['h', 'i']))
        );
        assert_eq!(Value::from_json(&json!([1, 2, 255])), Ok(Value::Bytes(vec![1, 2, 255])));
        assert_eq!(Value::from_json(&json!([1, "x"])), Ok(Value::Int(0)));
        assert_eq!(Value::from_json(&json!(null)), Ok(Value::Int(0)));
        assert_eq!(Value::from_json(&json!(true)), Ok(Value::Int(1)));
    }

    #[test]
    fn test_from_json_out_of_range() {
        assert_eq!(Value::from_json(&json!(u64::MAX)), Ok(Value::Int(i64::MAX)));
        assert_eq!(Value::from_json(&json!(i64::MIN)), Ok(Value::Int(i64::MIN)));
        assert!(Value::from_json(&json!([1, 300])).is_err());
        assert!(Value::from_json(&json!([-1])).is_err());
        assert!(serde_json::from_value::<Value>(json!([256])).is_err());
    }

    #[test]
    fn test_chars_truncate_at_nul() {
        let v = Value::chars_from_bytes(&[b'o', b'k', 0, b'x']);
        assert_eq!(v.as_char_string().as_deref(), Some("ok"));
    }

    #[test]
    fn test_le_word() {
        assert_eq!(Value::from_le_word([99, 0, 0, 0]), Value::Int(99));
        assert_eq!(Value::from_le_word([0, 0, 0, 0x80]), Value::Int(0x8000_0000));
    }

    #[test]
    fn test_display() {
        assert_eq!(format_address(0x10), "0x00000010");
        assert_eq!(Value::Bytes(vec![1, 0xff]).to_string(), "[01 ff]");
        assert_eq!(Value::Chars(vec!['a']).to_string(), "{\"a\"}");
    }
}

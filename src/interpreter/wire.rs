// Shared JSON helpers for the event-log formats

use crate::interpreter::constants::MAX_BLOCK_SIZE;
use crate::interpreter::errors::TraceError;
use crate::memory::value::Address;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value as Json;

/// Accept an address as a JSON number or a `0x`-prefixed / decimal string
pub(crate) fn address<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
    match Json::deserialize(deserializer)? {
        Json::Number(n) => n
            .as_u64()
            .ok_or_else(|| de::Error::custom(format!("address {} is not an unsigned integer", n))),
        Json::String(s) => parse_address(&s)
            .ok_or_else(|| de::Error::custom(format!("cannot parse address '{}'", s))),
        other => Err(de::Error::custom(format!(
            "expected an address, got {}",
            other
        ))),
    }
}

fn parse_address(s: &str) -> Option<Address> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

/// Accept a local or heap block size no larger than [`MAX_BLOCK_SIZE`]
pub(crate) fn block_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    checked_block_size(u64::deserialize(deserializer)?)
}

/// [`block_size`] for fields that may be absent or null
pub(crate) fn optional_block_size<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<usize>, D::Error> {
    Option::<u64>::deserialize(deserializer)?
        .map(checked_block_size::<D::Error>)
        .transpose()
}

fn checked_block_size<E: de::Error>(size: u64) -> Result<usize, E> {
    usize::try_from(size)
        .ok()
        .filter(|&size| size <= MAX_BLOCK_SIZE)
        .ok_or_else(|| {
            E::custom(format!(
                "size {} exceeds the {} byte limit",
                size, MAX_BLOCK_SIZE
            ))
        })
}

/// The discriminant of an event object, if it has a string one
pub(crate) fn tag<'a>(raw: &'a Json, field: &str) -> Option<&'a str> {
    raw.get(field).and_then(Json::as_str)
}

/// Printable discriminant for events that failed to decode
pub(crate) fn kind_name(raw: &Json, field: &str) -> String {
    match raw.get(field) {
        Some(Json::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "<untagged>".to_string(),
    }
}

/// The source line an event refers to
pub(crate) fn line(raw: &Json) -> Option<u32> {
    raw.get("line")
        .and_then(Json::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

/// The event list of a payload: a bare array or an object with `events`
pub(crate) fn events(payload: &Json) -> Option<&[Json]> {
    match payload {
        Json::Array(items) => Some(items),
        Json::Object(map) => map.get("events").and_then(Json::as_array).map(Vec::as_slice),
        _ => None,
    }
}

/// Whether `payload` is a syntax-tree dump rather than an event log
pub(crate) fn is_structural(payload: &Json, kinds: &[&str]) -> bool {
    payload.is_object() && tag(payload, "kind").is_some_and(|k| kinds.contains(&k))
}

/// Short description of a payload's shape for error messages
pub(crate) fn shape_of(payload: &Json) -> &'static str {
    match payload {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}

pub(crate) fn not_an_event_log(payload: &Json) -> TraceError {
    TraceError::unrecognized(format!(
        "expected an event array or an object with `events`, got {}",
        shape_of(payload)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(deserialize_with = "address")]
        addr: Address,
    }

    #[test]
    fn test_address_forms() {
        let hex: Holder = serde_json::from_value(json!({"addr": "0x10000000"})).unwrap();
        let num: Holder = serde_json::from_value(json!({"addr": 268435456u64})).unwrap();
        let dec: Holder = serde_json::from_value(json!({"addr": "16"})).unwrap();
        assert_eq!(hex.addr, 0x1000_0000);
        assert_eq!(num.addr, 0x1000_0000);
        assert_eq!(dec.addr, 16);
        assert!(serde_json::from_value::<Holder>(json!({"addr": -1})).is_err());
        assert!(serde_json::from_value::<Holder>(json!({"addr": "zz"})).is_err());
    }

    #[derive(Deserialize)]
    struct SizeHolder {
        #[serde(deserialize_with = "block_size")]
        size: usize,
        #[serde(default, deserialize_with = "optional_block_size")]
        hint: Option<usize>,
    }

    #[test]
    fn test_block_size_limit() {
        let ok: SizeHolder = serde_json::from_value(json!({"size": MAX_BLOCK_SIZE})).unwrap();
        assert_eq!(ok.size, MAX_BLOCK_SIZE);
        assert_eq!(ok.hint, None);
        let hinted: SizeHolder = serde_json::from_value(json!({"size": 1, "hint": null})).unwrap();
        assert_eq!(hinted.hint, None);

        assert!(serde_json::from_value::<SizeHolder>(json!({"size": MAX_BLOCK_SIZE + 1})).is_err());
        assert!(serde_json::from_value::<SizeHolder>(json!({"size": u64::MAX})).is_err());
        assert!(serde_json::from_value::<SizeHolder>(json!({"size": 1, "hint": 1u64 << 40})).is_err());
    }

    #[test]
    fn test_events_extraction() {
        assert_eq!(events(&json!([1, 2])).map(<[Json]>::len), Some(2));
        assert_eq!(events(&json!({"events": [1]})).map(<[Json]>::len), Some(1));
        assert!(events(&json!({"kind": "TranslationUnit"})).is_none());
        assert!(events(&json!("x")).is_none());
    }

    #[test]
    fn test_line() {
        assert_eq!(line(&json!({"line": 7})), Some(7));
        assert_eq!(line(&json!({"line": "7"})), None);
        assert_eq!(line(&json!({})), None);
    }
}

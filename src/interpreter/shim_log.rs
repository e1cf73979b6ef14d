//! Shim event-log format
//!
//! Emitted by a runtime shim around a Rust program. Events are discriminated
//! by `op` and use their own field names:
//!
//! ```json
//! [
//!   { "op": "call", "fn": "main", "line": 1 },
//!   { "op": "alloc_local", "var": "n", "ty": "i32", "init": 7, "line": 2 },
//!   { "op": "print", "out": "7\n", "line": 3 },
//!   { "op": "ret", "fn": "main", "line": 4 }
//! ]
//! ```

use crate::interpreter::constants::DEFAULT_LOCAL_SIZE;
use crate::interpreter::engine::{Dialect, Interpreter, Operation};
use crate::interpreter::errors::TraceError;
use crate::interpreter::wire;
use crate::memory::value::{Address, Value};
use crate::snapshot::StepHistory;
use serde::Deserialize;
use serde_json::Value as Json;

/// Field carrying the event discriminant
pub const TAG_FIELD: &str = "op";

/// Type assumed for locals declared without one
pub const DEFAULT_TYPE: &str = "i32";

const OPS: &[&str] = &[
    "call",
    "ret",
    "alloc_local",
    "set_local",
    "malloc",
    "free",
    "store_mem",
    "print",
    "note",
];

/// One event of the shim format
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ShimEvent {
    Call {
        #[serde(rename = "fn")]
        function: String,
    },
    Ret {
        #[serde(rename = "fn", default)]
        function: Option<String>,
    },
    AllocLocal {
        var: String,
        #[serde(default)]
        ty: Option<String>,
        #[serde(default, deserialize_with = "wire::optional_block_size")]
        size: Option<usize>,
        #[serde(default)]
        init: Option<Value>,
    },
    SetLocal {
        var: String,
        #[serde(default)]
        val: Value,
    },
    Malloc {
        #[serde(deserialize_with = "wire::block_size")]
        size: usize,
        #[serde(default)]
        bind: Option<String>,
        #[serde(default)]
        data: Vec<u8>,
        #[serde(default)]
        label: Option<String>,
    },
    Free {
        #[serde(deserialize_with = "wire::address")]
        ptr: Address,
    },
    StoreMem {
        #[serde(deserialize_with = "wire::address")]
        ptr: Address,
        #[serde(default)]
        data: Vec<u8>,
    },
    Print {
        #[serde(default)]
        out: String,
    },
    Note {
        #[serde(default)]
        msg: String,
    },
    #[serde(skip)]
    Unrecognized { tag: String },
    #[serde(skip)]
    Malformed { tag: String, reason: String },
}

impl ShimEvent {
    /// Decode one raw event; never fails
    pub fn decode(raw: &Json) -> Self {
        match serde_json::from_value(raw.clone()) {
            Ok(event) => event,
            Err(err) => match wire::tag(raw, TAG_FIELD) {
                Some(op) if OPS.contains(&op) => ShimEvent::Malformed {
                    tag: op.to_string(),
                    reason: err.to_string(),
                },
                _ => ShimEvent::Unrecognized {
                    tag: wire::kind_name(raw, TAG_FIELD),
                },
            },
        }
    }

    pub fn into_operation(self) -> Operation {
        match self {
            ShimEvent::Call { function } => Operation::Enter { function },
            ShimEvent::Ret { function } => Operation::Exit { function },
            ShimEvent::AllocLocal {
                var,
                ty,
                size,
                init,
            } => Operation::DeclareLocal {
                name: var,
                var_type: ty.unwrap_or_else(|| DEFAULT_TYPE.to_string()),
                size: size.unwrap_or(DEFAULT_LOCAL_SIZE),
                value: init.unwrap_or_default(),
            },
            ShimEvent::SetLocal { var, val } => Operation::SetLocal {
                name: var,
                value: val,
            },
            ShimEvent::Malloc {
                size,
                bind,
                data,
                label,
            } => Operation::Malloc {
                size,
                label,
                bytes: data,
                symbol: bind,
            },
            ShimEvent::Free { ptr } => Operation::Free { address: ptr },
            ShimEvent::StoreMem { ptr, data } => Operation::Store {
                address: ptr,
                bytes: data,
            },
            ShimEvent::Print { out } => Operation::Output { text: out },
            ShimEvent::Note { msg } => Operation::Note { text: msg },
            ShimEvent::Unrecognized { tag } => Operation::Unrecognized { kind: tag },
            ShimEvent::Malformed { tag, reason } => Operation::Malformed { kind: tag, reason },
        }
    }
}

/// Interpret a shim payload: an event array or `{ "events": [...] }`
pub fn interpret(payload: &Json) -> Result<StepHistory, TraceError> {
    match wire::events(payload) {
        Some(events) => replay(events),
        None => Err(wire::not_an_event_log(payload)),
    }
}

/// Replay shim events in order, one step per event
pub fn replay(events: &[Json]) -> Result<StepHistory, TraceError> {
    let mut interpreter = Interpreter::new(Dialect::Rust);
    for raw in events {
        let op = ShimEvent::decode(raw).into_operation();
        interpreter.apply(op, wire::line(raw))?;
    }
    Ok(interpreter.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_field_names() {
        assert_eq!(
            ShimEvent::decode(&json!({"op": "call", "fn": "main"})),
            ShimEvent::Call {
                function: "main".to_string()
            }
        );
        assert_eq!(
            ShimEvent::decode(&json!({"op": "alloc_local", "var": "n"})).into_operation(),
            Operation::DeclareLocal {
                name: "n".to_string(),
                var_type: "i32".to_string(),
                size: 4,
                value: Value::Int(0),
            }
        );
    }

    #[test]
    fn test_malloc_binds_pointer() {
        let steps = interpret(&json!([
            {"op": "call", "fn": "main"},
            {"op": "alloc_local", "var": "buf", "ty": "*mut u8", "size": 8},
            {"op": "malloc", "size": 2, "bind": "buf", "data": [104, 105]}
        ]))
        .unwrap();
        let last = steps.last().unwrap();
        let addr = last.heap[0].address;
        assert_eq!(last.stack[0].locals[0].value, Value::Int(addr as i64));
        assert_eq!(last.heap[0].bytes, vec![Some(104), Some(105)]);
        assert!(last.description.ends_with("assigned to buf"));
    }

    #[test]
    fn test_unknown_op() {
        let steps = interpret(&json!([{"op": "yield", "line": 4}])).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].description, "Unrecognized event 'yield'");
        assert!(steps[0].highlighted_lines.contains(&4));
    }

    #[test]
    fn test_structural_payload_rejected() {
        assert!(matches!(
            interpret(&json!({"kind": "TranslationUnit"})),
            Err(TraceError::UnrecognizedPayload { .. })
        ));
    }

    #[test]
    fn test_oversized_sizes_are_malformed() {
        let steps = interpret(&json!([
            {"op": "call", "fn": "main"},
            {"op": "alloc_local", "var": "big", "size": 4294967296u64},
            {"op": "malloc", "size": u64::MAX, "bind": "big"},
            {"op": "note", "msg": "still here"}
        ]))
        .unwrap();
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[1].description, "Malformed 'alloc_local' event ignored");
        assert_eq!(steps[2].description, "Malformed 'malloc' event ignored");
        assert!(steps[3].stack[0].locals.is_empty());
        assert!(steps[3].heap.is_empty());
    }
}

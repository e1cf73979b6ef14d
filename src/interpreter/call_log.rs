//! Instrumented call-log format
//!
//! Events are objects discriminated by `kind`, produced by compiler
//! instrumentation of a C program:
//!
//! ```json
//! [
//!   { "kind": "function_enter", "name": "main", "line": 3 },
//!   { "kind": "local_alloc", "name": "x", "type": "int", "size": 4, "value": 42, "line": 4 },
//!   { "kind": "function_exit", "name": "main", "line": 5 }
//! ]
//! ```
//!
//! Besides event logs this format also accepts a syntax-tree dump (an object
//! whose `kind` is e.g. `TranslationUnit`). No execution can be recovered from
//! it, so it yields a single explanatory step.

use crate::interpreter::constants::{DEFAULT_LOCAL_SIZE, ENTRY_FUNCTION, STRUCTURAL_KINDS};
use crate::interpreter::engine::{Dialect, Interpreter, Operation};
use crate::interpreter::errors::TraceError;
use crate::interpreter::wire;
use crate::memory::value::{Address, Value};
use crate::snapshot::StepHistory;
use serde::Deserialize;
use serde_json::Value as Json;

/// Field carrying the event discriminant
pub const TAG_FIELD: &str = "kind";

/// Type assumed for locals declared without one
pub const DEFAULT_TYPE: &str = "int";

const KINDS: &[&str] = &[
    "function_enter",
    "function_exit",
    "local_alloc",
    "local_set",
    "malloc",
    "free",
    "store",
    "printf",
    "note",
];

/// One event of the call-log format
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallLogEvent {
    FunctionEnter {
        name: String,
    },
    FunctionExit {
        #[serde(default)]
        name: Option<String>,
    },
    LocalAlloc {
        name: String,
        #[serde(rename = "type", default)]
        var_type: Option<String>,
        #[serde(default, deserialize_with = "wire::optional_block_size")]
        size: Option<usize>,
        #[serde(default)]
        value: Option<Value>,
    },
    LocalSet {
        name: String,
        #[serde(default)]
        value: Value,
    },
    Malloc {
        #[serde(deserialize_with = "wire::block_size")]
        size: usize,
        #[serde(default)]
        sym: Option<String>,
        #[serde(default)]
        bytes: Vec<u8>,
        #[serde(default)]
        label: Option<String>,
    },
    Free {
        #[serde(deserialize_with = "wire::address")]
        addr: Address,
    },
    Store {
        #[serde(deserialize_with = "wire::address")]
        addr: Address,
        #[serde(default)]
        bytes: Vec<u8>,
    },
    Printf {
        #[serde(default)]
        text: String,
    },
    Note {
        #[serde(default)]
        text: String,
    },
    #[serde(skip)]
    Unrecognized { tag: String },
    #[serde(skip)]
    Malformed { tag: String, reason: String },
}

impl CallLogEvent {
    /// Decode one raw event. Never fails: unknown or broken events become
    /// [`CallLogEvent::Unrecognized`] / [`CallLogEvent::Malformed`].
    pub fn decode(raw: &Json) -> Self {
        match serde_json::from_value(raw.clone()) {
            Ok(event) => event,
            Err(err) => match wire::tag(raw, TAG_FIELD) {
                Some(kind) if KINDS.contains(&kind) => CallLogEvent::Malformed {
                    tag: kind.to_string(),
                    reason: err.to_string(),
                },
                _ => CallLogEvent::Unrecognized {
                    tag: wire::kind_name(raw, TAG_FIELD),
                },
            },
        }
    }

    pub fn into_operation(self) -> Operation {
        match self {
            CallLogEvent::FunctionEnter { name } => Operation::Enter { function: name },
            CallLogEvent::FunctionExit { name } => Operation::Exit { function: name },
            CallLogEvent::LocalAlloc {
                name,
                var_type,
                size,
                value,
            } => Operation::DeclareLocal {
                name,
                var_type: var_type.unwrap_or_else(|| DEFAULT_TYPE.to_string()),
                size: size.unwrap_or(DEFAULT_LOCAL_SIZE),
                value: value.unwrap_or_default(),
            },
            CallLogEvent::LocalSet { name, value } => Operation::SetLocal { name, value },
            CallLogEvent::Malloc {
                size,
                sym,
                bytes,
                label,
            } => Operation::Malloc {
                size,
                label,
                bytes,
                symbol: sym,
            },
            CallLogEvent::Free { addr } => Operation::Free { address: addr },
            CallLogEvent::Store { addr, bytes } => Operation::Store {
                address: addr,
                bytes,
            },
            CallLogEvent::Printf { text } => Operation::Output { text },
            CallLogEvent::Note { text } => Operation::Note { text },
            CallLogEvent::Unrecognized { tag } => Operation::Unrecognized { kind: tag },
            CallLogEvent::Malformed { tag, reason } => Operation::Malformed { kind: tag, reason },
        }
    }
}

/// Interpret a call-log payload: an event array, `{ "events": [...] }`, or a
/// syntax-tree dump
pub fn interpret(payload: &Json) -> Result<StepHistory, TraceError> {
    if let Some(events) = wire::events(payload) {
        return replay(events);
    }
    if wire::is_structural(payload, STRUCTURAL_KINDS) {
        return structure_only();
    }
    Err(wire::not_an_event_log(payload))
}

/// Replay call-log events in order, one step per event
pub fn replay(events: &[Json]) -> Result<StepHistory, TraceError> {
    let mut interpreter = Interpreter::new(Dialect::C);
    for raw in events {
        let op = CallLogEvent::decode(raw).into_operation();
        interpreter.apply(op, wire::line(raw))?;
    }
    Ok(interpreter.finish())
}

fn structure_only() -> Result<StepHistory, TraceError> {
    let mut interpreter = Interpreter::new(Dialect::C);
    let op = Operation::Structure {
        function: ENTRY_FUNCTION.to_string(),
    };
    interpreter.apply(op, None)?;
    Ok(interpreter.finish())
}

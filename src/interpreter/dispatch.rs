//! Payload classification
//!
//! Picks the trace format for an untyped payload, either from an explicit
//! [`ModeHint`] or by looking at its shape.

use crate::interpreter::constants::STRUCTURAL_KINDS;
use crate::interpreter::errors::TraceError;
use crate::interpreter::{call_log, shim_log, wire};
use crate::snapshot::StepHistory;
use serde_json::Value as Json;
use std::fmt;
use std::str::FromStr;

/// Which trace format to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeHint {
    /// Inspect the payload
    #[default]
    Auto,
    /// Instrumented call log (`kind` events, syntax-tree dumps)
    CallLog,
    /// Shim event log (`op` events)
    ShimLog,
}

impl FromStr for ModeHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(ModeHint::Auto),
            "call-log" | "calllog" | "a" => Ok(ModeHint::CallLog),
            "shim-log" | "shimlog" | "b" => Ok(ModeHint::ShimLog),
            other => Err(format!(
                "unknown mode '{}' (expected auto, call-log or shim-log)",
                other
            )),
        }
    }
}

impl fmt::Display for ModeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModeHint::Auto => "auto",
            ModeHint::CallLog => "call-log",
            ModeHint::ShimLog => "shim-log",
        };
        f.write_str(name)
    }
}

/// Decide which format a payload is in.
///
/// Never returns [`ModeHint::Auto`].
pub fn detect(payload: &Json) -> Result<ModeHint, TraceError> {
    match payload {
        Json::Array(items) => {
            let shim = items
                .first()
                .is_some_and(|first| first.get(shim_log::TAG_FIELD).is_some());
            Ok(if shim {
                ModeHint::ShimLog
            } else {
                ModeHint::CallLog
            })
        }
        Json::Object(map)
            if map.get("events").is_some_and(Json::is_array)
                || wire::is_structural(payload, STRUCTURAL_KINDS) =>
        {
            Ok(ModeHint::CallLog)
        }
        _ => Err(TraceError::unrecognized(format!(
            "cannot tell the trace format of {}",
            wire::shape_of(payload)
        ))),
    }
}

/// Interpret a payload into its step history.
///
/// An explicit hint is obeyed without looking at the payload's shape.
pub fn interpret(payload: &Json, mode: ModeHint) -> Result<StepHistory, TraceError> {
    let mode = match mode {
        ModeHint::Auto => detect(payload)?,
        explicit => explicit,
    };
    tracing::info!("interpreting payload as {}", mode);

    let steps = match mode {
        ModeHint::ShimLog => shim_log::interpret(payload)?,
        ModeHint::CallLog | ModeHint::Auto => call_log::interpret(payload)?,
    };
    tracing::info!("produced {} steps", steps.len());
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect() {
        assert_eq!(detect(&json!([{"op": "call"}])).unwrap(), ModeHint::ShimLog);
        assert_eq!(detect(&json!([{"kind": "note"}])).unwrap(), ModeHint::CallLog);
        assert_eq!(detect(&json!([])).unwrap(), ModeHint::CallLog);
        assert_eq!(detect(&json!({"events": []})).unwrap(), ModeHint::CallLog);
        assert_eq!(
            detect(&json!({"kind": "TranslationUnit"})).unwrap(),
            ModeHint::CallLog
        );
        assert!(detect(&json!({"events": 3})).is_err());
        assert!(detect(&json!("trace")).is_err());
        assert!(detect(&json!(null)).is_err());
    }

    #[test]
    fn test_hint_overrides_detection() {
        // Shim-shaped, but forced through the call-log decoder
        let steps = interpret(&json!([{"op": "call", "fn": "main"}]), ModeHint::CallLog).unwrap();
        assert_eq!(steps.len(), 1);
        assert!(steps[0].description.starts_with("Unrecognized event"));
        assert!(steps[0].stack.is_empty());
    }

    #[test]
    fn test_mode_names_round_trip() {
        for mode in [ModeHint::Auto, ModeHint::CallLog, ModeHint::ShimLog] {
            assert_eq!(mode.to_string().parse::<ModeHint>(), Ok(mode));
        }
        assert!("x".parse::<ModeHint>().is_err());
    }
}

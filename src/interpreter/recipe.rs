//! Synthetic step sequences from a declarative recipe
//!
//! A recipe describes a tiny `main` without any real trace behind it:
//!
//! ```json
//! { "startLine": 1, "endLine": 6,
//!   "locals": [{ "name": "x", "value": 42, "line": 2 }],
//!   "heapBytes": [104, 105, 0],
//!   "print": "done\n" }
//! ```
//!
//! The sequence is always: enter `main`, one step per local, one step for the
//! heap block (if any), one for the output (if any), and a closing return.

use crate::interpreter::constants::{DEFAULT_LOCAL_SIZE, ENTRY_FUNCTION};
use crate::interpreter::engine::{Dialect, Interpreter, Operation};
use crate::interpreter::errors::TraceError;
use crate::memory::value::Value;
use crate::snapshot::StepHistory;
use serde::Deserialize;

/// Type given to recipe locals that do not name one
pub const DEFAULT_TYPE: &str = "int";

/// Declarative description of a synthetic run
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Recipe {
    pub start_line: Option<u32>,
    pub end_line: Option<u32>,
    pub locals: Vec<LocalSpec>,
    pub heap_bytes: Option<Vec<u8>>,
    pub print: Option<String>,
}

/// One local declared by a recipe
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocalSpec {
    pub name: String,
    #[serde(rename = "type", default = "default_type")]
    pub var_type: String,
    #[serde(default = "default_size")]
    pub size: usize,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub line: Option<u32>,
}

fn default_type() -> String {
    DEFAULT_TYPE.to_string()
}

fn default_size() -> usize {
    DEFAULT_LOCAL_SIZE
}

impl LocalSpec {
    pub fn new(name: &str, value: Value) -> Self {
        LocalSpec {
            name: name.to_string(),
            var_type: default_type(),
            size: default_size(),
            value,
            line: None,
        }
    }
}

/// Build the step sequence a recipe describes
pub fn synthesize(recipe: &Recipe) -> Result<StepHistory, TraceError> {
    let mut interpreter = Interpreter::new(Dialect::C);

    interpreter.apply(
        Operation::Enter {
            function: ENTRY_FUNCTION.to_string(),
        },
        recipe.start_line,
    )?;

    for local in &recipe.locals {
        interpreter.apply(
            Operation::DeclareLocal {
                name: local.name.clone(),
                var_type: local.var_type.clone(),
                size: local.size,
                value: local.value.clone(),
            },
            local.line,
        )?;
    }

    if let Some(bytes) = &recipe.heap_bytes {
        interpreter.apply(
            Operation::Malloc {
                size: bytes.len(),
                label: None,
                bytes: bytes.clone(),
                symbol: None,
            },
            None,
        )?;
    }

    if let Some(text) = &recipe.print {
        interpreter.apply(Operation::Output { text: text.clone() }, None)?;
    }

    interpreter.apply(
        Operation::Exit {
            function: Some(ENTRY_FUNCTION.to_string()),
        },
        recipe.end_line,
    )?;

    Ok(interpreter.finish())
}

// Replay engine shared by every trace format

use crate::interpreter::constants::MALLOC_LABEL;
use crate::interpreter::errors::TraceError;
use crate::memory::value::{format_address, Address, Value};
use crate::memory::MemoryState;
use crate::snapshot::{build_step, Step, StepHistory};

/// How a format spells its calls, used only to phrase descriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `printf`-style output, C types
    C,
    /// `print!`-style output, Rust types
    Rust,
}

/// One format-neutral effect on the memory model.
///
/// Each trace format decodes its own vocabulary into these; the engine turns
/// each one into exactly one [`Step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Enter {
        function: String,
    },
    Exit {
        function: Option<String>,
    },
    DeclareLocal {
        name: String,
        var_type: String,
        size: usize,
        value: Value,
    },
    SetLocal {
        name: String,
        value: Value,
    },
    Malloc {
        size: usize,
        label: Option<String>,
        bytes: Vec<u8>,
        symbol: Option<String>,
    },
    Free {
        address: Address,
    },
    Store {
        address: Address,
        bytes: Vec<u8>,
    },
    Output {
        text: String,
    },
    Note {
        text: String,
    },
    /// A whole-program syntax tree stood in for the event log
    Structure {
        function: String,
    },
    Unrecognized {
        kind: String,
    },
    Malformed {
        kind: String,
        reason: String,
    },
}

/// Replays operations against one owned [`MemoryState`]
pub struct Interpreter {
    state: MemoryState,
    steps: Vec<Step>,
    dialect: Dialect,
}

impl Interpreter {
    pub fn new(dialect: Dialect) -> Self {
        Interpreter {
            state: MemoryState::new(),
            steps: Vec::new(),
            dialect,
        }
    }

    /// Apply one operation and record its step
    pub fn apply(&mut self, op: Operation, line: Option<u32>) -> Result<(), TraceError> {
        match op {
            Operation::Enter { function } => {
                self.state.push_frame(&function);
                self.record(line, format!("Call {}()", function));
            }

            Operation::Exit { function } => {
                let current = self.state.stack().current_frame().map(|f| f.name.clone());
                let description = match (function.or(current.clone()), current) {
                    (Some(name), Some(_)) => format!("Return from {}()", name),
                    (Some(name), None) => format!("Return from {}() with no active frame", name),
                    (None, _) => "Return with no active frame".to_string(),
                };
                // Recorded before the pop so the departing frame is still visible
                self.record(line, description);
                self.state.pop_frame();
            }

            Operation::DeclareLocal {
                name,
                var_type,
                size,
                value,
            } => {
                let description = match self.state.declare_local(&name, &var_type, size, value) {
                    Ok(var) => format!(
                        "Declare {} {} at {} = {}",
                        var.var_type,
                        var.name,
                        format_address(var.address),
                        var.value
                    ),
                    Err(err @ TraceError::AllocationTooLarge { .. }) => {
                        tracing::warn!("local '{}' refused: {}", name, err);
                        format!("Declare {} {} ignored: {}", var_type, name, err)
                    }
                    Err(err) => return Err(err),
                };
                self.record(line, description);
            }

            Operation::SetLocal { name, value } => {
                let description = format!("Set {} = {}", name, value);
                self.state.set_local(&name, value);
                self.record(line, description);
            }

            Operation::Malloc {
                size,
                label,
                bytes,
                symbol,
            } => {
                let label = label.as_deref().unwrap_or(MALLOC_LABEL);
                let addr = match self.state.allocate_heap(size, label) {
                    Ok(block) => block.address,
                    Err(err) => {
                        tracing::warn!("malloc refused: {}", err);
                        self.record(line, format!("malloc({}) ignored: {}", size, err));
                        return Ok(());
                    }
                };
                for (offset, byte) in bytes.iter().enumerate() {
                    self.state.write_heap_byte(addr, offset, *byte);
                }

                let mut description = format!("malloc({}) -> {}", size, format_address(addr));
                if let Some(symbol) = symbol {
                    if self.state.set_local(&symbol, Value::Int(addr as i64)) {
                        description.push_str(&format!(", assigned to {}", symbol));
                    }
                }
                self.record(line, description);
            }

            Operation::Free { address } => {
                let description = if self.state.free_heap(address) {
                    format!("free({})", format_address(address))
                } else {
                    format!("free({}) matched no live block", format_address(address))
                };
                self.record(line, description);
            }

            Operation::Store { address, bytes } => {
                let description = self.store(address, bytes);
                self.record(line, description);
            }

            Operation::Output { text } => {
                self.state.append_output(&text);
                let shown = escape_output(&text);
                let description = match self.dialect {
                    Dialect::C => format!("printf(\"{}\")", shown),
                    Dialect::Rust => format!("print!(\"{}\")", shown),
                };
                self.record(line, description);
            }

            Operation::Note { text } => self.record(line, text),

            Operation::Structure { function } => {
                self.state.push_frame(&function);
                self.record(
                    line,
                    "Only the program structure was provided; \
                     execution steps cannot be derived from a syntax tree alone",
                );
            }

            Operation::Unrecognized { kind } => {
                tracing::warn!("unrecognized trace event '{}'", kind);
                self.record(line, format!("Unrecognized event '{}'", kind));
            }

            Operation::Malformed { kind, reason } => {
                tracing::warn!("malformed '{}' event: {}", kind, reason);
                self.record(line, format!("Malformed '{}' event ignored", kind));
            }
        }
        Ok(())
    }

    /// Write raw bytes wherever `address` points: a live heap block first,
    /// then a local of the current frame
    fn store(&mut self, address: Address, bytes: Vec<u8>) -> String {
        let count = bytes.len();

        let heap_target = self
            .state
            .heap()
            .live_block_containing(address)
            .map(|block| (block.address, (address - block.address) as usize));
        if let Some((base, start)) = heap_target {
            for (i, byte) in bytes.iter().enumerate() {
                self.state.write_heap_byte(base, start + i, *byte);
            }
            return if start == 0 {
                format!("Store {} byte(s) into heap block {}", count, format_address(base))
            } else {
                format!(
                    "Store {} byte(s) into heap block {} at offset {}",
                    count,
                    format_address(base),
                    start
                )
            };
        }

        let local = self
            .state
            .current_local_at(address)
            .map(|var| (var.name.clone(), var.holds_chars()));
        if let Some((name, holds_chars)) = local {
            let value = if holds_chars {
                Value::chars_from_bytes(&bytes)
            } else if let Ok(word) = <[u8; 4]>::try_from(bytes.as_slice()) {
                Value::from_le_word(word)
            } else {
                Value::Bytes(bytes)
            };
            let description = format!(
                "Store to {} at {} = {}",
                name,
                format_address(address),
                value
            );
            self.state.set_local(&name, value);
            return description;
        }

        tracing::debug!("store at {} matched no target", format_address(address));
        format!("Store {} byte(s) at {}", count, format_address(address))
    }

    fn record(&mut self, line: Option<u32>, description: impl Into<String>) {
        let step = build_step(line, description, &self.state);
        self.steps.push(step);
    }

    /// The live memory model
    pub fn state(&self) -> &MemoryState {
        &self.state
    }

    /// Get the number of steps recorded so far
    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// Hand over the recorded steps; the memory model is dropped here
    pub fn finish(self) -> StepHistory {
        StepHistory::new(self.steps)
    }
}

/// Make control characters in program output visible
fn escape_output(text: &str) -> String {
    let mut shown = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\n' => shown.push_str("\\n"),
            '\t' => shown.push_str("\\t"),
            '\r' => shown.push_str("\\r"),
            '"' => shown.push_str("\\\""),
            _ => shown.push(ch),
        }
    }
    shown
}

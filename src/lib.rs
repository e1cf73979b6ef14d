//! # Introduction
//!
//! memtrace replays the instrumentation log of an already-executed program
//! and produces, for every event, a complete snapshot of the simulated stack
//! frames, heap blocks and program output, plus a short description of what
//! changed. Nothing is executed; the crate only projects state from events.
//!
//! ## Pipeline
//!
//! ```text
//! JSON payload → Dispatcher → Normalizer → Interpreter + MemoryState → Steps
//! ```
//!
//! 1. [`interpreter::dispatch`] — classifies the payload (or obeys a
//!    [`ModeHint`]).
//! 2. [`interpreter::call_log`] / [`interpreter::shim_log`] — decode each
//!    format's events into format-neutral operations.
//! 3. [`interpreter::engine`] — applies operations to the [`memory`] model and
//!    records a [`snapshot::Step`] after each.
//! 4. [`snapshot`] — owned, immutable steps collected in a [`StepHistory`].
//!
//! [`interpreter::recipe`] builds small step sequences without any trace,
//! for demos and tests.
//!
//! ## Example
//!
//! ```
//! use memtrace::{interpret, ModeHint};
//! use serde_json::json;
//!
//! let trace = json!([
//!     { "kind": "function_enter", "name": "main", "line": 1 },
//!     { "kind": "local_alloc", "name": "x", "type": "int", "value": 42, "line": 2 },
//!     { "kind": "function_exit", "name": "main", "line": 3 }
//! ]);
//! let steps = interpret(&trace, ModeHint::Auto).unwrap();
//! assert_eq!(steps.len(), 3);
//! assert_eq!(steps[1].stack[0].locals[0].name, "x");
//! // the return step still shows the frame being left
//! assert_eq!(steps[2].stack.len(), 1);
//! ```

pub mod interpreter;
pub mod memory;
pub mod snapshot;

pub use interpreter::dispatch::{interpret, ModeHint};
pub use interpreter::errors::TraceError;
pub use interpreter::recipe::{synthesize, LocalSpec, Recipe};
pub use snapshot::{Step, StepHistory};

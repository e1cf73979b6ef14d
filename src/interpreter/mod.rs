//! Trace interpretation
//!
//! This module turns event logs into step histories:
//! - [`dispatch`]: picks a format for an untyped payload
//! - [`call_log`] / [`shim_log`]: the two event vocabularies
//! - [`recipe`]: synthetic sequences without a trace
//! - [`engine`]: replays format-neutral operations against the memory model
//! - [`errors`]: the fatal error type
//!
//! # Execution Model
//!
//! Events are replayed strictly in order against a single
//! [`MemoryState`](crate::memory::MemoryState) owned by the run. After each
//! event exactly one step is recorded. Anomalies in the trace degrade into
//! descriptive steps; only [`errors::TraceError`] stops a run.

pub mod call_log;
pub mod constants;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod recipe;
pub mod shim_log;
mod wire;

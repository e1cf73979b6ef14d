//! Error types for trace interpretation
//!
//! Only two conditions stop interpretation. Everything else a trace can get
//! wrong (unknown tags, dangling addresses, missing locals, oversized
//! allocations) is absorbed into a descriptive step so that partial traces
//! still render.

use thiserror::Error;

/// Fatal errors surfaced to the caller instead of a step history
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceError {
    /// A local was declared while the call stack was empty
    #[error("cannot declare local '{variable}': no active stack frame")]
    NoActiveFrame { variable: String },

    /// The payload matched none of the known trace shapes
    #[error("unrecognized payload: {reason}")]
    UnrecognizedPayload { reason: String },

    /// An allocation did not fit the simulated address space. The engine
    /// records this as a step rather than stopping.
    #[error("{region} allocation of {size} bytes does not fit the address space")]
    AllocationTooLarge { region: &'static str, size: usize },
}

impl TraceError {
    pub(crate) fn unrecognized(reason: impl Into<String>) -> Self {
        TraceError::UnrecognizedPayload {
            reason: reason.into(),
        }
    }
}

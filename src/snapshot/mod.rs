// Step records and the read-only step history

use crate::memory::{heap::HeapBlock, stack::StackFrame, MemoryState};
use serde::Serialize;
use std::collections::BTreeSet;
use std::ops::Index;

/// Owned copy of the memory model at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySnapshot {
    pub stack: Vec<StackFrame>,
    pub heap: Vec<HeapBlock>,
    pub output: String,
}

/// One immutable point in the replayed execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub highlighted_lines: BTreeSet<u32>,
    pub description: String,
    pub stack: Vec<StackFrame>,
    pub heap: Vec<HeapBlock>,
    pub accumulated_output: String,
}

/// Build a step from the current state.
///
/// Every step goes through here so that each one owns its own copy of the
/// stack, heap and output.
pub fn build_step(
    highlighted_lines: impl IntoIterator<Item = u32>,
    description: impl Into<String>,
    state: &MemoryState,
) -> Step {
    let MemorySnapshot {
        stack,
        heap,
        output,
    } = state.snapshot();

    Step {
        highlighted_lines: highlighted_lines.into_iter().collect(),
        description: description.into(),
        stack,
        heap,
        accumulated_output: output,
    }
}

/// Ordered, read-only sequence of steps produced by one interpretation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StepHistory {
    steps: Vec<Step>,
}

impl StepHistory {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        StepHistory { steps }
    }

    /// Get a step by index
    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Get the number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The final step, if any
    pub fn last(&self) -> Option<&Step> {
        self.steps.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }
}

impl Index<usize> for StepHistory {
    type Output = Step;

    fn index(&self, index: usize) -> &Step {
        &self.steps[index]
    }
}

impl<'a> IntoIterator for &'a StepHistory {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

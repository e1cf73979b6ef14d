//! Memory model for replayed traces
//!
//! This module provides the core memory abstractions:
//! - [`value`]: Value representation (Int, Text, Chars, Bytes)
//! - [`stack`]: Call stack with frames and local variables
//! - [`heap`]: Bump-allocated heap with tombstones for freed blocks
//!
//! [`MemoryState`] ties them together and is the only place state changes.
//!
//! # Address Space
//!
//! Both regions are bump allocators, neither ever reclaims space:
//! ```text
//! stack:  0x7fff0000 ─▶ grows down, slot = max(4, size)
//! heap:   0x10000000 ─▶ grows up,   slot = max(4, size)
//! ```

pub mod heap;
pub mod stack;
pub mod value;

use crate::interpreter::constants::{MAX_BLOCK_SIZE, MIN_SLOT_SIZE, STACK_ADDRESS_START};
use crate::interpreter::errors::TraceError;
use crate::snapshot::MemorySnapshot;
use heap::{Heap, HeapBlock};
use rustc_hash::FxHashMap;
use stack::{Stack, StackFrame, Variable};
use value::{format_address, Address, Value};

/// Live state of one interpretation run
#[derive(Debug, Clone)]
pub struct MemoryState {
    stack: Stack,
    heap: Heap,
    output: String,
    /// Next free stack address; decremented before each declaration
    next_stack_address: Address,
    /// Stack address -> (frame depth, variable name)
    symbols: FxHashMap<Address, (usize, String)>,
}

impl MemoryState {
    pub fn new() -> Self {
        MemoryState {
            stack: Stack::new(),
            heap: Heap::new(),
            output: String::new(),
            next_stack_address: STACK_ADDRESS_START,
            symbols: FxHashMap::default(),
        }
    }

    /// Push an empty frame on top of the call stack
    pub fn push_frame(&mut self, name: &str) {
        self.stack.push_frame(name.to_string());
    }

    /// Pop the top frame; a pop on an empty stack is ignored
    pub fn pop_frame(&mut self) -> Option<StackFrame> {
        let frame = self.stack.pop_frame();
        match &frame {
            Some(frame) => {
                for var in &frame.locals {
                    self.symbols.remove(&var.address);
                }
            }
            None => tracing::debug!("pop on empty call stack ignored"),
        }
        frame
    }

    /// Declare a local in the current frame at the next stack slot.
    ///
    /// Fails with [`TraceError::NoActiveFrame`] on an empty call stack and
    /// with [`TraceError::AllocationTooLarge`] when the slot does not fit.
    pub fn declare_local(
        &mut self,
        name: &str,
        var_type: &str,
        size: usize,
        initial: Value,
    ) -> Result<&Variable, TraceError> {
        let depth = self.stack.depth();
        let frame = self
            .stack
            .current_frame_mut()
            .ok_or_else(|| TraceError::NoActiveFrame {
                variable: name.to_string(),
            })?;

        let address = Some(size)
            .filter(|&size| size <= MAX_BLOCK_SIZE)
            .and_then(|size| {
                self.next_stack_address
                    .checked_sub(size.max(MIN_SLOT_SIZE) as u64)
            })
            .ok_or(TraceError::AllocationTooLarge {
                region: "stack",
                size,
            })?;
        self.next_stack_address = address;

        let var = Variable::new(
            name.to_string(),
            var_type.to_string(),
            address,
            size,
            initial,
        );
        let (var, replaced) = frame.declare_var(var);
        if let Some(old) = replaced {
            self.symbols.remove(&old);
        }
        self.symbols.insert(address, (depth - 1, name.to_string()));
        Ok(var)
    }

    /// Overwrite a local of the current frame. Returns false if nothing matched.
    pub fn set_local(&mut self, name: &str, value: Value) -> bool {
        match self
            .stack
            .current_frame_mut()
            .and_then(|f| f.get_var_mut(name))
        {
            Some(var) => {
                var.value = value;
                true
            }
            None => {
                tracing::debug!("set of '{}' matched no local in the current frame", name);
                false
            }
        }
    }

    /// Find a local of the current frame by its address
    pub fn current_local_at(&self, addr: Address) -> Option<&Variable> {
        let (depth, name) = self.symbols.get(&addr)?;
        if *depth + 1 != self.stack.depth() {
            return None;
        }
        self.stack.current_frame()?.get_var(name)
    }

    /// Overwrite the current-frame local at `addr`. Returns false if nothing matched.
    pub fn set_local_at(&mut self, addr: Address, value: Value) -> bool {
        let Some(name) = self.current_local_at(addr).map(|v| v.name.clone()) else {
            tracing::debug!("no current-frame local at {}", format_address(addr));
            return false;
        };
        self.set_local(&name, value)
    }

    /// Allocate a zero-filled heap block
    pub fn allocate_heap(&mut self, size: usize, label: &str) -> Result<&HeapBlock, TraceError> {
        self.heap.allocate(size, label.to_string())
    }

    /// Free the first live heap block at `addr`
    pub fn free_heap(&mut self, addr: Address) -> bool {
        self.heap.free(addr)
    }

    /// Write one byte into the live heap block at `addr`
    pub fn write_heap_byte(&mut self, addr: Address, offset: usize, byte: u8) -> bool {
        self.heap.write_byte(addr, offset, byte)
    }

    /// Append program output
    pub fn append_output(&mut self, text: &str) {
        self.output.push_str(text);
    }

    /// Take an owned copy of everything a step needs
    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            stack: self.stack.frames().to_vec(),
            heap: self.heap.blocks().to_vec(),
            output: self.output.clone(),
        }
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }
}

impl Default for MemoryState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_without_frame_fails() {
        let mut state = MemoryState::new();
        let err = state.declare_local("x", "int", 4, Value::Int(1)).unwrap_err();
        assert!(matches!(err, TraceError::NoActiveFrame { ref variable } if variable == "x"));
    }

    #[test]
    fn test_stack_addresses_grow_down() {
        let mut state = MemoryState::new();
        state.push_frame("main");
        let a = state.declare_local("c", "char", 1, Value::Int(0)).unwrap().address;
        let b = state.declare_local("buf", "char[16]", 16, Value::Int(0)).unwrap().address;
        assert_eq!(a, STACK_ADDRESS_START - 4);
        assert_eq!(b, a - 16);
    }

    #[test]
    fn test_set_local_only_searches_top_frame() {
        let mut state = MemoryState::new();
        state.push_frame("main");
        state.declare_local("x", "int", 4, Value::Int(1)).unwrap();
        state.push_frame("helper");
        assert!(!state.set_local("x", Value::Int(2)));
        state.pop_frame();
        assert!(state.set_local("x", Value::Int(3)));
        assert_eq!(state.stack().frames()[0].locals[0].value, Value::Int(3));
    }

    #[test]
    fn test_shadowing_across_frames() {
        let mut state = MemoryState::new();
        state.push_frame("main");
        let outer = state.declare_local("x", "int", 4, Value::Int(1)).unwrap().address;
        state.push_frame("helper");
        let inner = state.declare_local("x", "int", 4, Value::Int(2)).unwrap().address;
        assert_ne!(outer, inner);
        assert!(state.current_local_at(outer).is_none());
        assert_eq!(state.current_local_at(inner).map(|v| &v.value), Some(&Value::Int(2)));
    }

    #[test]
    fn test_pop_does_not_rewind_stack_cursor() {
        let mut state = MemoryState::new();
        state.push_frame("f");
        let first = state.declare_local("a", "int", 4, Value::Int(0)).unwrap().address;
        state.pop_frame();
        state.push_frame("f");
        let second = state.declare_local("a", "int", 4, Value::Int(0)).unwrap().address;
        assert!(second < first);
    }

    #[test]
    fn test_pop_on_empty_is_noop() {
        let mut state = MemoryState::new();
        assert!(state.pop_frame().is_none());
        assert!(state.stack().is_empty());
    }

    #[test]
    fn test_set_local_at() {
        let mut state = MemoryState::new();
        state.push_frame("main");
        let addr = state.declare_local("n", "int", 4, Value::Int(0)).unwrap().address;
        assert!(state.set_local_at(addr, Value::Int(7)));
        assert!(!state.set_local_at(addr + 100, Value::Int(7)));
        assert_eq!(state.stack().frames()[0].locals[0].value, Value::Int(7));
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut state = MemoryState::new();
        state.push_frame("main");
        state.declare_local("x", "int", 4, Value::Int(1)).unwrap();
        let addr = state.allocate_heap(4, "malloc").unwrap().address;
        state.append_output("a");
        let snap = state.snapshot();

        state.set_local("x", Value::Int(2));
        state.write_heap_byte(addr, 0, 9);
        state.free_heap(addr);
        state.append_output("b");
        state.pop_frame();

        assert_eq!(snap.stack[0].locals[0].value, Value::Int(1));
        assert_eq!(snap.heap[0].bytes, vec![Some(0); 4]);
        assert!(!snap.heap[0].freed);
        assert_eq!(snap.output, "a");
    }

    #[test]
    fn test_oversized_local_leaves_cursor() {
        let mut state = MemoryState::new();
        state.push_frame("main");
        let err = state
            .declare_local("big", "char[]", MAX_BLOCK_SIZE + 1, Value::Int(0))
            .unwrap_err();
        assert_eq!(
            err,
            TraceError::AllocationTooLarge {
                region: "stack",
                size: MAX_BLOCK_SIZE + 1
            }
        );
        assert!(state.stack().frames()[0].locals.is_empty());

        let next = state.declare_local("x", "int", 4, Value::Int(0)).unwrap().address;
        assert_eq!(next, STACK_ADDRESS_START - 4);
    }

    #[test]
    fn test_stack_exhaustion_never_wraps() {
        let mut state = MemoryState::new();
        state.push_frame("main");
        let mut last = STACK_ADDRESS_START;
        let mut exhausted = false;
        for i in 0..4096 {
            match state.declare_local(&format!("v{}", i), "char[]", MAX_BLOCK_SIZE, Value::Int(0)) {
                Ok(var) => {
                    assert!(var.address < last);
                    last = var.address;
                }
                Err(err) => {
                    assert!(matches!(err, TraceError::AllocationTooLarge { region: "stack", .. }));
                    exhausted = true;
                    break;
                }
            }
        }
        assert!(exhausted);
    }
}

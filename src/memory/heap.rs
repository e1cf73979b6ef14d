//! Heap implementation for replayed traces
//!
//! This module provides the simulated heap:
//! - Bump allocation: the cursor only moves up, addresses are never reused
//! - Tombstones: freed blocks stay visible with their contents erased
//! - Writes to freed or unknown blocks are ignored, not reported
//!
//! Detecting use-after-free is left to whoever renders the snapshots.

use super::value::{format_address, Address};
use crate::interpreter::constants::{HEAP_ADDRESS_START, MAX_BLOCK_SIZE, MIN_SLOT_SIZE};
use crate::interpreter::errors::TraceError;
use serde::Serialize;

/// Label given to a block once it has been freed
pub const FREED_LABEL: &str = "freed";

/// A block of heap memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeapBlock {
    pub address: Address,
    pub size: usize,
    /// Per-byte contents; `None` means erased by `free`
    pub bytes: Vec<Option<u8>>,
    pub freed: bool,
    pub label: String,
}

impl HeapBlock {
    pub fn new(address: Address, size: usize, label: String) -> Self {
        HeapBlock {
            address,
            size,
            bytes: vec![Some(0); size],
            freed: false,
            label,
        }
    }

    /// Whether `addr` falls inside this block
    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.address && addr < self.address + self.size as u64
    }

    fn release(&mut self) {
        self.freed = true;
        self.label = FREED_LABEL.to_string();
        self.bytes.iter_mut().for_each(|b| *b = None);
    }
}

/// The heap
#[derive(Debug, Clone)]
pub struct Heap {
    blocks: Vec<HeapBlock>,
    next_address: Address,
}

impl Heap {
    pub fn new() -> Self {
        Heap {
            blocks: Vec::new(),
            next_address: HEAP_ADDRESS_START,
        }
    }

    /// Allocate a zero-filled block at the cursor and advance it.
    ///
    /// Blocks over [`MAX_BLOCK_SIZE`] or past the end of the address space
    /// are refused and leave the heap untouched.
    pub fn allocate(&mut self, size: usize, label: String) -> Result<&HeapBlock, TraceError> {
        let too_large = || TraceError::AllocationTooLarge {
            region: "heap",
            size,
        };
        if size > MAX_BLOCK_SIZE {
            return Err(too_large());
        }
        let addr = self.next_address;
        self.next_address = addr
            .checked_add(size.max(MIN_SLOT_SIZE) as u64)
            .ok_or_else(too_large)?;
        self.blocks.push(HeapBlock::new(addr, size, label));
        Ok(&self.blocks[self.blocks.len() - 1])
    }

    /// Free the first live block at `addr`. Returns false if there was none.
    pub fn free(&mut self, addr: Address) -> bool {
        match self.live_block_mut(addr) {
            Some(block) => {
                block.release();
                true
            }
            None => {
                tracing::debug!("free of {} matched no live block", format_address(addr));
                false
            }
        }
    }

    /// Overwrite one byte of the live block at `addr`. Returns false if ignored.
    pub fn write_byte(&mut self, addr: Address, offset: usize, byte: u8) -> bool {
        match self.live_block_mut(addr) {
            Some(block) if offset < block.size => {
                block.bytes[offset] = Some(byte);
                true
            }
            _ => {
                tracing::debug!(
                    "byte write at {}+{} ignored",
                    format_address(addr),
                    offset
                );
                false
            }
        }
    }

    fn live_block_mut(&mut self, addr: Address) -> Option<&mut HeapBlock> {
        self.blocks.iter_mut().find(|b| !b.freed && b.address == addr)
    }

    /// Get the first live block whose range covers `addr`
    pub fn live_block_containing(&self, addr: Address) -> Option<&HeapBlock> {
        self.blocks.iter().find(|b| !b.freed && b.contains(addr))
    }

    /// All blocks in allocation order, tombstones included
    pub fn blocks(&self) -> &[HeapBlock] {
        &self.blocks
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

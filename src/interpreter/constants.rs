// Address-space and default constants for trace replay

/// Starting address for heap allocations
/// Heap addresses start at 0x10000000 and grow upward
pub const HEAP_ADDRESS_START: u64 = 0x1000_0000;

/// Top of the simulated stack
/// The first local lands one slot below this address
pub const STACK_ADDRESS_START: u64 = 0x7fff_0000;

/// Smallest slot either allocator hands out, keeps addresses 4-aligned
pub const MIN_SLOT_SIZE: usize = 4;

/// Largest local or heap block a trace may ask for
pub const MAX_BLOCK_SIZE: usize = 1 << 20;

/// Size assumed for a local when the trace omits it
pub const DEFAULT_LOCAL_SIZE: usize = 4;

/// Frame pushed for structural payloads and synthesized recipes
pub const ENTRY_FUNCTION: &str = "main";

/// Label given to blocks allocated by `malloc` events
pub const MALLOC_LABEL: &str = "malloc";

/// `kind` values that mark a syntax-tree dump rather than an event log
pub const STRUCTURAL_KINDS: &[&str] = &["TranslationUnit", "SourceFile", "Program"];

use crate::{Allocator, Drainable, Memory};

/// Always fails. A dead end for allocator chains under test.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAllocator;

impl NullAllocator {
    pub const fn new() -> NullAllocator {
        NullAllocator
    }
}

impl Allocator for NullAllocator {
    #[inline(always)]
    fn alloc(&mut self, _size: usize) -> Memory {
        Memory::empty()
    }

    fn free(&mut self, memory: Memory) {
        debug_assert!(memory.is_empty(), "null allocator asked to free {:?}", memory);
    }

    #[inline(always)]
    fn owns(&self, memory: Memory) -> bool {
        memory.is_empty()
    }
}

impl Drainable for NullAllocator {
    fn is_drained(&self) -> bool {
        true
    }
}

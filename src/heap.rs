use crate::memory::ALIGN;
use crate::{Allocator, Memory};
use std::alloc::Layout;

/// Forwards to the system allocator.
///
/// Accepts every block offered to it, so it belongs at the tail of a fallback chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAllocator;

impl HeapAllocator {
    pub const fn new() -> HeapAllocator {
        HeapAllocator
    }
}

impl Allocator for HeapAllocator {
    fn alloc(&mut self, size: usize) -> Memory {
        if size == 0 {
            return Memory::empty();
        }
        let layout = match Layout::from_size_align(size, ALIGN) {
            Ok(layout) => layout,
            Err(_) => return Memory::empty(),
        };
        let ptr = unsafe { std::alloc::alloc(layout) };
        if ptr.is_null() {
            debug!("heap allocator: system refused {} bytes", size);
            return Memory::empty();
        }
        Memory::new(ptr, size)
    }

    fn free(&mut self, memory: Memory) {
        if memory.is_empty() {
            return;
        }
        unsafe {
            std::alloc::dealloc(
                memory.ptr(),
                Layout::from_size_align_unchecked(memory.capacity(), ALIGN),
            )
        }
    }

    #[inline(always)]
    fn owns(&self, _memory: Memory) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_exact_capacity() {
        let mut heap = HeapAllocator::new();
        let m = heap.alloc(100);
        assert!(!m.is_empty());
        assert_eq!(100, m.capacity());
        assert_eq!(0, m.addr() % ALIGN);
        unsafe { std::ptr::write_bytes(m.ptr(), 0xAB, m.capacity()) };
        assert!(heap.dealloc(m));
    }

    #[test]
    fn zero_bytes_is_empty() {
        let mut heap = HeapAllocator::new();
        assert!(heap.alloc(0).is_empty());
    }

    #[test]
    fn impossible_size_is_empty() {
        let mut heap = HeapAllocator::new();
        assert!(heap.alloc(usize::MAX).is_empty());
    }

    #[test]
    fn owns_everything() {
        let heap = HeapAllocator::new();
        assert!(heap.owns(Memory::empty()));
        assert!(heap.owns(Memory::new(8 as *mut u8, 8)));
    }
}

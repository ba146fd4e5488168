use crate::memory::{round_up, Region, ALIGN};
use crate::{Allocator, Drainable, Memory};
use std::alloc::Layout;

/// Bump-pointer allocator over a fixed region of `SIZE` bytes.
///
/// Every request is rounded up to `CHUNK` and to native pointer alignment.
/// Only the most recent allocation can be freed (strict LIFO order); freeing
/// anything else is silently ignored and the bytes stay in use until
/// [`free_all`](Arena::free_all).
///
/// The arena does not fall through to anything when it runs out of space;
/// wrap it in a [`Fallback`](crate::Fallback) or [`Cascade`](crate::Cascade) for that.
pub struct Arena<const SIZE: usize, const CHUNK: usize = 16> {
    region: Region,
    next_item_offset: usize,
}

impl<const SIZE: usize, const CHUNK: usize> Arena<SIZE, CHUNK> {
    /// Reserves the `SIZE` byte region.
    ///
    /// # Panics
    ///
    /// Panics if `SIZE` is zero or too large; aborts if the system allocator refuses the region.
    pub fn new() -> Arena<SIZE, CHUNK> {
        assert!(SIZE > 0, "arena size must be non-zero");
        let layout = match Layout::from_size_align(SIZE, ALIGN) {
            Ok(layout) => layout,
            Err(_) => panic!("arena size {} is too large", SIZE),
        };
        let region = match Region::new(SIZE) {
            Some(region) => region,
            None => std::alloc::handle_alloc_error(layout),
        };
        Arena {
            region,
            next_item_offset: 0,
        }
    }

    #[inline(always)]
    fn rounded(size: usize) -> usize {
        round_up(round_up(size, CHUNK), ALIGN)
    }

    /// Total bytes managed by the arena.
    pub fn size(&self) -> usize {
        SIZE
    }

    /// Bytes between the start of the region and the bump pointer.
    pub fn used(&self) -> usize {
        self.next_item_offset
    }

    pub fn remaining(&self) -> usize {
        SIZE - self.next_item_offset
    }

    /// Resets the bump pointer, invalidating every outstanding block.
    pub fn free_all(&mut self) {
        self.next_item_offset = 0;
    }
}

impl<const SIZE: usize, const CHUNK: usize> Default for Arena<SIZE, CHUNK> {
    fn default() -> Self {
        Arena::new()
    }
}

impl<const SIZE: usize, const CHUNK: usize> Allocator for Arena<SIZE, CHUNK> {
    fn alloc(&mut self, size: usize) -> Memory {
        if size == 0 {
            return Memory::empty();
        }
        if size > self.remaining() || Self::rounded(size) > self.remaining() {
            debug!("arena exhausted: {} bytes requested, {} remaining", size, self.remaining());
            return Memory::empty();
        }
        let len = Self::rounded(size);
        let memory = self.region.slice(self.next_item_offset, len);
        self.next_item_offset += len;
        memory
    }

    fn free(&mut self, memory: Memory) {
        if memory.is_empty() {
            return;
        }
        debug_assert!(self.owns(memory), "arena asked to free foreign block {:?}", memory);
        let len = Self::rounded(memory.capacity());
        let top = self.region.base() as usize + self.next_item_offset;
        if memory.addr() + len == top {
            self.next_item_offset -= len;
        } else {
            trace!("arena ignores non-LIFO free of {:?}", memory);
        }
    }

    #[inline(always)]
    fn owns(&self, memory: Memory) -> bool {
        !memory.is_empty() && self.region.contains(memory.addr())
    }
}

impl<const SIZE: usize, const CHUNK: usize> Drainable for Arena<SIZE, CHUNK> {
    fn is_drained(&self) -> bool {
        self.next_item_offset == 0
    }
}

impl<const SIZE: usize, const CHUNK: usize> std::fmt::Debug for Arena<SIZE, CHUNK> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("size", &SIZE)
            .field("chunk", &CHUNK)
            .field("used", &self.next_item_offset)
            .finish()
    }
}

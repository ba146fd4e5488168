use crate::{Allocator, Drainable, Memory};
use std::ptr::null_mut;

/// Caches freed blocks of a single size class in front of a parent allocator.
///
/// Requests of `1..=LENGTH` bytes belong to the class and are rounded up to
/// `LENGTH`; they are served from the cache when possible and from
/// `parent.alloc(LENGTH)` otherwise. Every other request goes straight to the
/// parent. At most `MAX_NODES` blocks are retained; further frees are
/// forwarded to the parent.
///
/// Cached blocks form an intrusive singly linked list: the first word of a
/// freed block stores the address of the next one.
pub struct FreeList<P: Allocator, const LENGTH: usize, const MAX_NODES: usize = 64> {
    parent: P,
    head: *mut u8,
    cached: usize,
}

impl<P: Allocator, const LENGTH: usize, const MAX_NODES: usize> FreeList<P, LENGTH, MAX_NODES> {
    pub fn new(parent: P) -> Self {
        assert!(
            LENGTH >= std::mem::size_of::<*mut u8>(),
            "free list length must fit a pointer"
        );
        FreeList {
            parent,
            head: null_mut(),
            cached: 0,
        }
    }

    /// Number of blocks currently held in the cache.
    pub fn cached(&self) -> usize {
        self.cached
    }

    pub fn parent(&self) -> &P {
        &self.parent
    }

    pub fn parent_mut(&mut self) -> &mut P {
        &mut self.parent
    }

    /// Returns every cached block to the parent.
    pub fn release_cached(&mut self) {
        while let Some(memory) = self.pop() {
            self.parent.free(memory);
        }
    }

    #[inline(always)]
    fn in_class(size: usize) -> bool {
        size > 0 && size <= LENGTH
    }

    fn pop(&mut self) -> Option<Memory> {
        if self.head.is_null() {
            return None;
        }
        let node = self.head;
        self.head = unsafe { (node as *mut *mut u8).read_unaligned() };
        self.cached -= 1;
        Some(Memory::new(node, LENGTH))
    }

    fn push(&mut self, memory: Memory) {
        unsafe { (memory.ptr() as *mut *mut u8).write_unaligned(self.head) };
        self.head = memory.ptr();
        self.cached += 1;
    }
}

impl<P: Allocator + Default, const LENGTH: usize, const MAX_NODES: usize> Default
    for FreeList<P, LENGTH, MAX_NODES>
{
    fn default() -> Self {
        FreeList::new(P::default())
    }
}

impl<P: Allocator, const LENGTH: usize, const MAX_NODES: usize> Allocator
    for FreeList<P, LENGTH, MAX_NODES>
{
    fn alloc(&mut self, size: usize) -> Memory {
        if !Self::in_class(size) {
            return self.parent.alloc(size);
        }
        if let Some(memory) = self.pop() {
            return memory;
        }
        let memory = self.parent.alloc(LENGTH);
        if memory.is_empty() {
            memory
        } else {
            Memory::new(memory.ptr(), LENGTH)
        }
    }

    fn free(&mut self, memory: Memory) {
        if memory.is_empty() {
            return;
        }
        if memory.capacity() == LENGTH && self.cached < MAX_NODES {
            self.push(memory);
        } else {
            if memory.capacity() == LENGTH {
                trace!("free list full ({} nodes), returning block to parent", MAX_NODES);
            }
            self.parent.free(memory);
        }
    }

    #[inline(always)]
    fn owns(&self, memory: Memory) -> bool {
        self.parent.owns(memory)
    }
}

impl<P: Drainable, const LENGTH: usize, const MAX_NODES: usize> Drainable
    for FreeList<P, LENGTH, MAX_NODES>
{
    /// Cached blocks count as outstanding.
    fn is_drained(&self) -> bool {
        self.cached == 0 && self.parent.is_drained()
    }
}

impl<P: Allocator, const LENGTH: usize, const MAX_NODES: usize> Drop for FreeList<P, LENGTH, MAX_NODES> {
    fn drop(&mut self) {
        self.release_cached();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Arena, HeapAllocator, Stats};

    #[test]
    fn second_allocation_comes_from_cache() {
        let mut list = FreeList::<Arena<4096>, 256>::new(Arena::new());
        let first = list.alloc(200);
        assert_eq!(256, first.capacity());
        let parent_used = list.parent().used();
        list.free(first);
        assert_eq!(1, list.cached());
        let second = list.alloc(200);
        assert_eq!(first.ptr(), second.ptr());
        assert_eq!(parent_used, list.parent().used());
        assert_eq!(0, list.cached());
    }

    #[test]
    fn out_of_class_requests_bypass_cache() {
        let mut list = FreeList::<Stats<HeapAllocator>, 64>::new(Stats::new(HeapAllocator));
        let big = list.alloc(100);
        assert_eq!(100, big.capacity());
        list.free(big);
        assert_eq!(0, list.cached());
        assert_eq!(1, list.parent().stats().deallocs);
    }

    #[test]
    fn retains_at_most_max_nodes() {
        let mut list = FreeList::<Stats<HeapAllocator>, 32, 2>::new(Stats::new(HeapAllocator));
        let blocks: Vec<Memory> = (0..4).map(|_| list.alloc(10)).collect();
        for m in blocks {
            list.free(m);
        }
        assert_eq!(2, list.cached());
        assert_eq!(2, list.parent().stats().deallocs);
        drop(list);
    }

    #[test]
    fn drop_returns_cached_blocks_to_parent() {
        let mut stats = Stats::new(HeapAllocator);
        {
            let mut list = FreeList::<_, 32>::new(&mut stats);
            let a = list.alloc(32);
            let b = list.alloc(32);
            list.free(a);
            list.free(b);
            assert_eq!(2, list.cached());
        }
        assert_eq!(2, stats.stats().allocs);
        assert_eq!(2, stats.stats().deallocs);
        assert_eq!(0, stats.stats().bytes_allocated_now);
    }

    #[test]
    fn owns_follows_parent() {
        let mut list = FreeList::<Arena<512>, 64>::new(Arena::new());
        let m = list.alloc(1);
        assert!(list.owns(m));
        assert!(!list.owns(Memory::new(8 as *mut u8, 64)));
        assert!(list.dealloc(m));
        assert!(!list.is_drained());
        list.release_cached();
        assert!(list.is_drained());
    }

    #[test]
    fn failed_parent_allocation_is_empty() {
        let mut list = FreeList::<Arena<64>, 128>::new(Arena::new());
        assert!(list.alloc(100).is_empty());
        assert!(list.alloc(0).is_empty());
    }
}

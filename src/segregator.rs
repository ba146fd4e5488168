use crate::{Allocator, Drainable, Memory};

/// Routes requests of at most `THRESHOLD` bytes to `first`, larger ones to `second`.
///
/// A small request that `first` can not satisfy is retried on `second`, so the
/// request size alone does not say who owns a block. `free` and `owns` ask
/// `first.owns` before anything else; ownership, not size, decides. For that
/// reason `first` must not be a catch-all such as
/// [`HeapAllocator`](crate::HeapAllocator).
#[derive(Debug, Default)]
pub struct Segregator<const THRESHOLD: usize, A, B> {
    first: A,
    second: B,
}

impl<const THRESHOLD: usize, A: Allocator, B: Allocator> Segregator<THRESHOLD, A, B> {
    pub fn new(first: A, second: B) -> Self {
        Segregator { first, second }
    }

    pub const fn threshold(&self) -> usize {
        THRESHOLD
    }

    pub fn first(&self) -> &A {
        &self.first
    }

    pub fn second(&self) -> &B {
        &self.second
    }

    pub fn first_mut(&mut self) -> &mut A {
        &mut self.first
    }

    pub fn second_mut(&mut self) -> &mut B {
        &mut self.second
    }
}

impl<const THRESHOLD: usize, A: Allocator, B: Allocator> Allocator for Segregator<THRESHOLD, A, B> {
    fn alloc(&mut self, size: usize) -> Memory {
        if size == 0 {
            return Memory::empty();
        }
        if size > THRESHOLD {
            return self.second.alloc(size);
        }
        let memory = self.first.alloc(size);
        if !memory.is_empty() {
            return memory;
        }
        trace!("segregator: small allocation of {} bytes spilled to second", size);
        self.second.alloc(size)
    }

    fn free(&mut self, memory: Memory) {
        if memory.is_empty() {
            return;
        }
        if self.first.owns(memory) {
            self.first.free(memory)
        } else {
            debug_assert!(self.second.owns(memory), "segregator asked to free foreign block {:?}", memory);
            self.second.free(memory)
        }
    }

    fn owns(&self, memory: Memory) -> bool {
        self.first.owns(memory) || self.second.owns(memory)
    }
}

impl<const THRESHOLD: usize, A: Drainable, B: Drainable> Drainable for Segregator<THRESHOLD, A, B> {
    fn is_drained(&self) -> bool {
        self.first.is_drained() && self.second.is_drained()
    }
}

use crate::Memory;

/// The uniform contract of every allocator and combinator in this crate.
///
/// Allocators never panic on exhaustion: a failed `alloc` returns
/// [`Memory::empty`]. Requests for zero bytes also return the empty descriptor.
pub trait Allocator {
    /// Returns a block of at least `size` bytes, or the empty descriptor.
    fn alloc(&mut self, size: usize) -> Memory;

    /// Releases a block previously returned by `alloc` on this allocator.
    ///
    /// Freeing a block this allocator does not own is a logic error; use
    /// [`dealloc`](Allocator::dealloc) when the owner is not known.
    fn free(&mut self, memory: Memory);

    /// True if `memory` was produced by this allocator. Has no side effects.
    fn owns(&self, memory: Memory) -> bool;

    /// Frees `memory` only if this allocator owns it; reports whether it did.
    fn dealloc(&mut self, memory: Memory) -> bool {
        if self.owns(memory) {
            self.free(memory);
            true
        } else {
            false
        }
    }
}

/// Allocators that can tell when every block they handed out has come back.
pub trait Drainable: Allocator {
    fn is_drained(&self) -> bool;
}

impl<'a, A: Allocator + ?Sized> Allocator for &'a mut A {
    #[inline(always)]
    fn alloc(&mut self, size: usize) -> Memory {
        (**self).alloc(size)
    }

    #[inline(always)]
    fn free(&mut self, memory: Memory) {
        (**self).free(memory)
    }

    #[inline(always)]
    fn owns(&self, memory: Memory) -> bool {
        (**self).owns(memory)
    }

    #[inline(always)]
    fn dealloc(&mut self, memory: Memory) -> bool {
        (**self).dealloc(memory)
    }
}

impl<'a, A: Drainable + ?Sized> Drainable for &'a mut A {
    #[inline(always)]
    fn is_drained(&self) -> bool {
        (**self).is_drained()
    }
}

use crate::{Allocator, Drainable, Memory};

/// Tries `primary` first and `secondary` when the primary comes back empty.
#[derive(Debug, Default)]
pub struct Fallback<P, S> {
    primary: P,
    secondary: S,
}

impl<P: Allocator, S: Allocator> Fallback<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Fallback { primary, secondary }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn secondary(&self) -> &S {
        &self.secondary
    }

    pub fn primary_mut(&mut self) -> &mut P {
        &mut self.primary
    }

    pub fn secondary_mut(&mut self) -> &mut S {
        &mut self.secondary
    }

    pub fn into_inner(self) -> (P, S) {
        (self.primary, self.secondary)
    }
}

impl<P: Allocator, S: Allocator> Allocator for Fallback<P, S> {
    fn alloc(&mut self, size: usize) -> Memory {
        let memory = self.primary.alloc(size);
        if !memory.is_empty() || size == 0 {
            return memory;
        }
        trace!("primary allocator refused {} bytes, falling back", size);
        self.secondary.alloc(size)
    }

    fn free(&mut self, memory: Memory) {
        if self.primary.owns(memory) {
            self.primary.free(memory)
        } else {
            self.secondary.free(memory)
        }
    }

    fn owns(&self, memory: Memory) -> bool {
        self.primary.owns(memory) || self.secondary.owns(memory)
    }
}

impl<P: Drainable, S: Drainable> Drainable for Fallback<P, S> {
    fn is_drained(&self) -> bool {
        self.primary.is_drained() && self.secondary.is_drained()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Arena, HeapAllocator, NullAllocator};

    #[test]
    fn uses_secondary_when_primary_is_exhausted() {
        let mut alloc = Fallback::new(Arena::<64>::new(), Arena::<256>::new());
        let a = alloc.alloc(64);
        let b = alloc.alloc(64);
        assert!(alloc.primary().owns(a));
        assert!(alloc.secondary().owns(b));
        assert!(!alloc.primary().owns(b));

        alloc.free(b);
        alloc.free(a);
        assert!(alloc.is_drained());
    }

    #[test]
    fn heap_tail_accepts_everything() {
        let mut alloc = Fallback::new(Arena::<32>::new(), HeapAllocator);
        let big = alloc.alloc(1000);
        assert!(!big.is_empty());
        assert!(!alloc.primary().owns(big));
        assert!(alloc.owns(big));
        assert!(alloc.dealloc(big));
    }

    #[test]
    fn both_failing_yields_empty() {
        let mut alloc = Fallback::new(NullAllocator, NullAllocator);
        assert!(alloc.alloc(8).is_empty());
        assert!(!alloc.dealloc(Memory::new(8 as *mut u8, 8)));
    }
}

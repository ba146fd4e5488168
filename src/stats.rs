use crate::{Allocator, Drainable, Memory};
use std::fmt;

/// Allocation counters kept by [`Stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocStats {
    /// Successful allocations.
    pub allocs: u64,
    /// Blocks handed back.
    pub deallocs: u64,
    /// Allocations the wrapped allocator refused.
    pub failed_allocs: u64,
    pub bytes_allocated: u64,
    pub bytes_deallocated: u64,
    /// `bytes_allocated - bytes_deallocated`.
    pub bytes_allocated_now: u64,
    /// Largest value `bytes_allocated_now` has reached.
    pub bytes_allocated_highwater: u64,
}

impl AllocStats {
    fn record_alloc(&mut self, bytes: u64) {
        self.allocs += 1;
        self.bytes_allocated += bytes;
        self.bytes_allocated_now += bytes;
        if self.bytes_allocated_now > self.bytes_allocated_highwater {
            self.bytes_allocated_highwater = self.bytes_allocated_now;
        }
    }

    fn record_free(&mut self, bytes: u64) {
        self.deallocs += 1;
        self.bytes_deallocated += bytes;
        self.bytes_allocated_now -= bytes;
    }
}

impl fmt::Display for AllocStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "allocations:     {} ({} failed)", self.allocs, self.failed_allocs)?;
        writeln!(f, "deallocations:   {}", self.deallocs)?;
        writeln!(f, "bytes allocated: {}", self.bytes_allocated)?;
        writeln!(f, "bytes freed:     {}", self.bytes_deallocated)?;
        writeln!(f, "bytes in use:    {}", self.bytes_allocated_now)?;
        write!(f, "high-water mark: {}", self.bytes_allocated_highwater)
    }
}

/// Wraps an allocator and counts what it services.
///
/// Never changes whether an operation succeeds; only observes it. Byte counts
/// use the capacity of the returned descriptors.
///
/// Every `free` passed to the inner allocator is counted as a deallocation,
/// including frees the inner allocator ignores. Over an [`Arena`](crate::Arena)
/// a non-LIFO free is dropped by the arena, yet `bytes_allocated_now` goes down:
/// the counters then understate the bytes the arena still holds.
#[derive(Debug, Default)]
pub struct Stats<A> {
    inner: A,
    stats: AllocStats,
}

impl<A: Allocator> Stats<A> {
    pub fn new(inner: A) -> Self {
        Stats {
            inner,
            stats: AllocStats::default(),
        }
    }

    pub fn stats(&self) -> &AllocStats {
        &self.stats
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut A {
        &mut self.inner
    }

    pub fn into_inner(self) -> A {
        self.inner
    }

    /// Human-readable summary of the counters.
    pub fn report(&self) -> String {
        self.stats.to_string()
    }
}

impl<A: Allocator> Allocator for Stats<A> {
    fn alloc(&mut self, size: usize) -> Memory {
        let memory = self.inner.alloc(size);
        if memory.is_empty() {
            if size != 0 {
                self.stats.failed_allocs += 1;
            }
        } else {
            self.stats.record_alloc(memory.capacity() as u64);
        }
        memory
    }

    fn free(&mut self, memory: Memory) {
        if memory.is_empty() {
            return;
        }
        self.inner.free(memory);
        self.stats.record_free(memory.capacity() as u64);
    }

    #[inline(always)]
    fn owns(&self, memory: Memory) -> bool {
        self.inner.owns(memory)
    }
}

impl<A: Drainable> Drainable for Stats<A> {
    fn is_drained(&self) -> bool {
        self.inner.is_drained()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Arena, HeapAllocator, NullAllocator};
    use proptest::prelude::*;

    #[test]
    fn counts_allocations_and_frees() {
        let mut stats = Stats::new(HeapAllocator);
        let a = stats.alloc(100);
        let b = stats.alloc(50);
        stats.free(a);
        let s = stats.stats();
        assert_eq!(2, s.allocs);
        assert_eq!(1, s.deallocs);
        assert_eq!(150, s.bytes_allocated);
        assert_eq!(100, s.bytes_deallocated);
        assert_eq!(50, s.bytes_allocated_now);
        assert_eq!(150, s.bytes_allocated_highwater);
        assert!(stats.dealloc(b));
        assert_eq!(0, stats.stats().bytes_allocated_now);
    }

    #[test]
    fn failures_are_not_counted_as_allocations() {
        let mut stats = Stats::new(NullAllocator);
        assert!(stats.alloc(10).is_empty());
        assert!(stats.alloc(0).is_empty());
        assert_eq!(0, stats.stats().allocs);
        assert_eq!(1, stats.stats().failed_allocs);
    }

    #[test]
    fn dealloc_of_foreign_block_is_not_counted() {
        let mut stats = Stats::new(Arena::<64>::new());
        assert!(!stats.dealloc(Memory::new(8 as *mut u8, 8)));
        assert_eq!(0, stats.stats().deallocs);
    }

    #[test]
    fn ignored_arena_free_is_still_counted() {
        let mut stats = Stats::new(Arena::<256>::new());
        let a = stats.alloc(16);
        let _b = stats.alloc(16);
        stats.free(a);
        assert_eq!(1, stats.stats().deallocs);
        assert_eq!(16, stats.stats().bytes_allocated_now);
        assert_eq!(32, stats.inner().used());
    }

    #[test]
    fn report_mentions_high_water_mark() {
        let mut stats = Stats::new(Arena::<256>::new());
        let m = stats.alloc(64);
        stats.free(m);
        let report = stats.report();
        assert!(report.contains("high-water mark: 64"), "{}", report);
        assert!(report.contains("allocations:     1 (0 failed)"), "{}", report);
    }

    proptest! {
        #[test]
        fn counters_track_bytes_in_use(ops in prop::collection::vec((any::<bool>(), 1usize..512), 1..100)) {
            let mut stats = Stats::new(HeapAllocator);
            let mut live: Vec<Memory> = Vec::new();
            let mut highest = 0u64;
            for (allocate, size) in ops {
                if allocate || live.is_empty() {
                    live.push(stats.alloc(size));
                } else {
                    let m = live.swap_remove(size % live.len());
                    prop_assert!(stats.dealloc(m));
                }
                let s = *stats.stats();
                prop_assert_eq!(s.bytes_allocated - s.bytes_deallocated, s.bytes_allocated_now);
                highest = highest.max(s.bytes_allocated_now);
                prop_assert_eq!(highest, s.bytes_allocated_highwater);
            }
            for m in live {
                stats.free(m);
            }
            prop_assert_eq!(0, stats.stats().bytes_allocated_now);
        }
    }
}

use crate::{Allocator, Drainable, Memory};

/// Grows a list of identical sub-allocators on demand.
///
/// Starts with one instance. Allocation searches the instances starting at
/// the last one that succeeded, wrapping around; when all of them refuse, a
/// fresh `A::default()` is appended and the request is retried there. A
/// request even a fresh instance can not satisfy fails without leaving the
/// extra instance behind.
///
/// When a free drains an instance and more than one remains, that instance is
/// dropped. The last instance is never dropped.
pub struct Cascade<A: Drainable + Default> {
    allocators: Vec<A>,
    current: usize,
}

impl<A: Drainable + Default> Cascade<A> {
    pub fn new() -> Self {
        let mut allocators = Vec::with_capacity(4);
        allocators.push(A::default());
        Cascade {
            allocators,
            current: 0,
        }
    }

    /// Number of sub-allocator instances.
    pub fn len(&self) -> usize {
        self.allocators.len()
    }

    /// Index the next search starts from.
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn allocators(&self) -> &[A] {
        &self.allocators
    }

    fn owner_of(&self, memory: Memory) -> Option<usize> {
        let len = self.allocators.len();
        (0..len)
            .map(|i| (self.current + i) % len)
            .find(|&i| self.allocators[i].owns(memory))
    }

    fn remove(&mut self, index: usize) {
        self.allocators.remove(index);
        if self.current > index {
            self.current -= 1;
        }
        if self.current >= self.allocators.len() {
            self.current = 0;
        }
        debug!("cascade reclaimed instance {}, {} left", index, self.allocators.len());
    }
}

impl<A: Drainable + Default> Default for Cascade<A> {
    fn default() -> Self {
        Cascade::new()
    }
}

impl<A: Drainable + Default> Allocator for Cascade<A> {
    fn alloc(&mut self, size: usize) -> Memory {
        if size == 0 {
            return Memory::empty();
        }
        let len = self.allocators.len();
        for i in 0..len {
            let index = (self.current + i) % len;
            let memory = self.allocators[index].alloc(size);
            if !memory.is_empty() {
                self.current = index;
                return memory;
            }
        }

        let mut fresh = A::default();
        let memory = fresh.alloc(size);
        if memory.is_empty() {
            debug!("cascade: {} bytes do not fit a fresh instance", size);
            return memory;
        }
        self.allocators.push(fresh);
        self.current = self.allocators.len() - 1;
        debug!("cascade grew to {} instances", self.allocators.len());
        memory
    }

    fn free(&mut self, memory: Memory) {
        if memory.is_empty() {
            return;
        }
        let index = match self.owner_of(memory) {
            Some(index) => index,
            None => {
                debug_assert!(false, "cascade asked to free foreign block {:?}", memory);
                return;
            }
        };
        self.allocators[index].free(memory);
        if self.allocators.len() > 1 && self.allocators[index].is_drained() {
            self.remove(index);
        }
    }

    fn owns(&self, memory: Memory) -> bool {
        self.owner_of(memory).is_some()
    }
}

impl<A: Drainable + Default> Drainable for Cascade<A> {
    fn is_drained(&self) -> bool {
        self.allocators.iter().all(|a| a.is_drained())
    }
}

impl<A: Drainable + Default> std::fmt::Debug for Cascade<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cascade")
            .field("instances", &self.allocators.len())
            .field("current", &self.current)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Arena, BlockAllocator};
    use proptest::prelude::*;

    #[test]
    fn starts_with_one_instance() {
        let cascade = Cascade::<Arena<128>>::new();
        assert_eq!(1, cascade.len());
        assert_eq!(0, cascade.current());
        assert!(cascade.is_drained());
    }

    #[test]
    fn grows_when_every_instance_is_full() {
        let mut cascade = Cascade::<Arena<64>>::new();
        let a = cascade.alloc(64);
        let b = cascade.alloc(64);
        let c = cascade.alloc(32);
        assert_eq!(3, cascade.len());
        assert!(cascade.allocators()[0].owns(a));
        assert!(cascade.allocators()[1].owns(b));
        assert!(cascade.allocators()[2].owns(c));
        assert_eq!(2, cascade.current());
    }

    #[test]
    fn oversized_request_does_not_grow() {
        let mut cascade = Cascade::<Arena<64>>::new();
        assert!(cascade.alloc(65).is_empty());
        assert_eq!(1, cascade.len());
    }

    #[test]
    fn drained_instance_is_reclaimed_but_never_the_last() {
        let mut cascade = Cascade::<Arena<64>>::new();
        let a = cascade.alloc(64);
        let b = cascade.alloc(64);
        assert_eq!(2, cascade.len());
        assert!(cascade.dealloc(a));
        assert_eq!(1, cascade.len());
        assert!(cascade.owns(b));
        assert!(cascade.dealloc(b));
        assert_eq!(1, cascade.len());
        assert!(cascade.is_drained());
    }

    #[test]
    fn hint_stays_valid_after_removal() {
        let mut cascade = Cascade::<Arena<64>>::new();
        let blocks: Vec<Memory> = (0..4).map(|_| cascade.alloc(64)).collect();
        assert_eq!(3, cascade.current());
        cascade.free(blocks[3]);
        assert_eq!(3, cascade.len());
        assert!(cascade.current() < cascade.len());
        cascade.free(blocks[0]);
        assert_eq!(2, cascade.len());
        assert!(cascade.current() < cascade.len());
        let again = cascade.alloc(64);
        assert!(!again.is_empty());
        assert!(cascade.owns(again));
    }

    #[test]
    fn earlier_removal_shifts_hint_down() {
        let mut cascade = Cascade::<Arena<64>>::new();
        let a = cascade.alloc(64);
        let _b = cascade.alloc(64);
        let _c = cascade.alloc(32);
        assert_eq!(2, cascade.current());
        cascade.free(a);
        assert_eq!(1, cascade.current());
        assert!(cascade.allocators()[1].owns(_c));
    }

    proptest! {
        #[test]
        fn freeing_everything_returns_to_one_instance(
            sizes in prop::collection::vec(1usize..=32, 1..200),
            order in prop::collection::vec(any::<prop::sample::Index>(), 200),
        ) {
            let mut cascade = Cascade::<BlockAllocator<32, 1>>::new();
            let mut blocks: Vec<Memory> = sizes.iter().map(|&s| cascade.alloc(s)).collect();
            prop_assert!(blocks.iter().all(|m| !m.is_empty()));
            prop_assert_eq!((sizes.len() + 63) / 64, cascade.len());

            let mut picks = order.into_iter();
            while !blocks.is_empty() {
                let index = picks.next().map(|i| i.index(blocks.len())).unwrap_or(0);
                let m = blocks.swap_remove(index);
                prop_assert!(cascade.dealloc(m));
                prop_assert!(cascade.current() < cascade.len());
            }
            prop_assert_eq!(1, cascade.len());
            prop_assert!(cascade.is_drained());
        }
    }
}

use crate::memory::{round_up, Region};
use crate::{Allocator, BitBlock, Drainable, Memory, ALIGN};

/// Slab of `64 * WORDS` slots of `SLOT_SIZE` bytes each.
///
/// The backing region is allocated on the first successful `alloc`, never
/// before. A clear bit in the slot bitmap means the slot is available.
///
/// Requests larger than `SLOT_SIZE` always fail. With `STRICT` set, requests
/// smaller than `MIN_SIZE` fail too, even when a slot is free.
pub struct BlockAllocator<
    const SLOT_SIZE: usize,
    const WORDS: usize,
    const STRICT: bool = false,
    const MIN_SIZE: usize = 1,
> {
    used: BitBlock<WORDS>,
    region: Option<Region>,
}

impl<const SLOT_SIZE: usize, const WORDS: usize, const STRICT: bool, const MIN_SIZE: usize>
    BlockAllocator<SLOT_SIZE, WORDS, STRICT, MIN_SIZE>
{
    const STRIDE: usize = round_up(SLOT_SIZE, ALIGN);

    pub fn new() -> Self {
        assert!(SLOT_SIZE > 0, "slot size must be non-zero");
        assert!(WORDS > 0, "block allocator needs at least one bitmap word");
        BlockAllocator {
            used: BitBlock::new(),
            region: None,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.used.len()
    }

    pub fn slots_in_use(&self) -> usize {
        self.used.count_ones()
    }

    /// True once the backing region has been reserved.
    pub fn is_allocated(&self) -> bool {
        self.region.is_some()
    }

    #[inline(always)]
    fn serves(size: usize) -> bool {
        if size == 0 || size > SLOT_SIZE {
            return false;
        }
        !STRICT || size >= MIN_SIZE
    }

    fn region(&mut self) -> Option<&Region> {
        if self.region.is_none() {
            let len = Self::STRIDE * self.used.len();
            self.region = Some(Region::new(len)?);
            debug!("block allocator reserved {} slots of {} bytes", self.used.len(), SLOT_SIZE);
        }
        self.region.as_ref()
    }
}

impl<const SLOT_SIZE: usize, const WORDS: usize, const STRICT: bool, const MIN_SIZE: usize> Default
    for BlockAllocator<SLOT_SIZE, WORDS, STRICT, MIN_SIZE>
{
    fn default() -> Self {
        BlockAllocator::new()
    }
}

impl<const SLOT_SIZE: usize, const WORDS: usize, const STRICT: bool, const MIN_SIZE: usize> Allocator
    for BlockAllocator<SLOT_SIZE, WORDS, STRICT, MIN_SIZE>
{
    fn alloc(&mut self, size: usize) -> Memory {
        if !Self::serves(size) {
            return Memory::empty();
        }
        let slot = match self.used.peek_first_unset() {
            Some(slot) => slot,
            None => {
                debug!("block allocator full: {} slots of {} bytes", self.used.len(), SLOT_SIZE);
                return Memory::empty();
            }
        };
        let memory = match self.region() {
            Some(region) => region.slice(slot * Self::STRIDE, SLOT_SIZE),
            None => return Memory::empty(),
        };
        self.used.set(slot);
        memory
    }

    fn free(&mut self, memory: Memory) {
        if memory.is_empty() {
            return;
        }
        let base = match &self.region {
            Some(region) if region.contains(memory.addr()) => region.base() as usize,
            _ => {
                debug_assert!(false, "block allocator asked to free foreign block {:?}", memory);
                return;
            }
        };
        let offset = memory.addr() - base;
        debug_assert_eq!(0, offset % Self::STRIDE, "pointer is not at a slot boundary");
        let slot = offset / Self::STRIDE;
        debug_assert!(self.used.test(slot), "double free of slot {}", slot);
        self.used.clear(slot);
    }

    #[inline(always)]
    fn owns(&self, memory: Memory) -> bool {
        match &self.region {
            Some(region) => !memory.is_empty() && region.contains(memory.addr()),
            None => false,
        }
    }
}

impl<const SLOT_SIZE: usize, const WORDS: usize, const STRICT: bool, const MIN_SIZE: usize> Drainable
    for BlockAllocator<SLOT_SIZE, WORDS, STRICT, MIN_SIZE>
{
    fn is_drained(&self) -> bool {
        self.used.none()
    }
}

impl<const SLOT_SIZE: usize, const WORDS: usize, const STRICT: bool, const MIN_SIZE: usize>
    std::fmt::Debug for BlockAllocator<SLOT_SIZE, WORDS, STRICT, MIN_SIZE>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockAllocator")
            .field("slot_size", &SLOT_SIZE)
            .field("slots", &self.used.len())
            .field("in_use", &self.used.count_ones())
            .field("allocated", &self.region.is_some())
            .finish()
    }
}

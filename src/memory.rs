use std::alloc::Layout;
use std::ptr::{null_mut, NonNull};

/// Native pointer alignment. Every allocator in this crate hands out blocks
/// aligned to at least this.
pub const ALIGN: usize = std::mem::align_of::<usize>();

/// Rounds `size` up to the next multiple of `multiple`.
#[inline(always)]
pub const fn round_up(size: usize, multiple: usize) -> usize {
    if multiple <= 1 {
        size
    } else {
        match size % multiple {
            0 => size,
            rem => size + (multiple - rem),
        }
    }
}

/// A raw extent of bytes: the currency passed between allocators.
///
/// The descriptor owns nothing. Whoever holds it is responsible for handing it
/// back to the allocator that produced it, exactly once.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Memory {
    ptr: *mut u8,
    capacity: usize,
}

impl Memory {
    /// The descriptor returned by a failed allocation.
    #[inline(always)]
    pub const fn empty() -> Memory {
        Memory {
            ptr: null_mut(),
            capacity: 0,
        }
    }

    #[inline(always)]
    pub const fn new(ptr: *mut u8, capacity: usize) -> Memory {
        Memory { ptr, capacity }
    }

    /// True if the pointer is null.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.ptr.is_null()
    }

    #[inline(always)]
    pub fn ptr(&self) -> *mut u8 {
        self.ptr
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    pub fn addr(&self) -> usize {
        self.ptr as usize
    }

    /// One-past-the-end address.
    #[inline(always)]
    pub fn end(&self) -> usize {
        self.addr() + self.capacity
    }

    /// True if `addr` lies within `[ptr, ptr + capacity)`.
    pub fn contains(&self, addr: usize) -> bool {
        !self.is_empty() && addr >= self.addr() && addr < self.end()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory::empty()
    }
}

/// Owned, pointer-aligned heap extent backing the arena and block allocators.
///
/// The bytes never move while the region is alive, so descriptors pointing
/// into it stay valid when the owning allocator value itself is moved.
pub(crate) struct Region {
    ptr: NonNull<u8>,
    len: usize,
}

impl Region {
    /// Returns `None` for a zero-sized request or when the system is out of memory.
    pub fn new(len: usize) -> Option<Region> {
        if len == 0 {
            return None;
        }
        let layout = Layout::from_size_align(len, ALIGN).ok()?;
        let ptr = NonNull::new(unsafe { std::alloc::alloc(layout) })?;
        trace!("region of {} bytes at {:p}", len, ptr);
        Some(Region { ptr, len })
    }

    #[inline(always)]
    pub fn base(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn contains(&self, addr: usize) -> bool {
        let base = self.ptr.as_ptr() as usize;
        addr >= base && addr < base + self.len
    }

    /// Descriptor for `len` bytes starting `offset` bytes into the region.
    #[inline(always)]
    pub fn slice(&self, offset: usize, len: usize) -> Memory {
        debug_assert!(offset + len <= self.len, "region slice out of range");
        Memory::new(unsafe { self.base().add(offset) }, len)
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        trace!("release region of {} bytes at {:p}", self.len, self.ptr);
        unsafe {
            std::alloc::dealloc(
                self.ptr.as_ptr(),
                Layout::from_size_align_unchecked(self.len, ALIGN),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_descriptor_is_null() {
        let m = Memory::empty();
        assert!(m.is_empty());
        assert_eq!(0, m.capacity());
        assert_eq!(Memory::default(), m);
        assert!(!m.contains(0));
    }

    #[test]
    fn round_up_to_multiple() {
        assert_eq!(0, round_up(0, 16));
        assert_eq!(16, round_up(1, 16));
        assert_eq!(16, round_up(16, 16));
        assert_eq!(32, round_up(17, 16));
        assert_eq!(7, round_up(7, 1));
    }

    #[test]
    fn region_is_aligned_and_contains_its_bytes() {
        let region = Region::new(100).unwrap();
        assert_eq!(0, region.base() as usize % ALIGN);
        assert!(region.contains(region.base() as usize));
        assert!(region.contains(region.base() as usize + 99));
        assert!(!region.contains(region.base() as usize + 100));

        let m = region.slice(8, 16);
        assert_eq!(region.base() as usize + 8, m.addr());
        assert_eq!(16, m.capacity());
        assert!(m.contains(m.addr() + 15));
        assert!(!m.contains(m.end()));
    }

    #[test]
    fn zero_sized_region_is_refused() {
        assert!(Region::new(0).is_none());
    }
}

//! Storage machinery behind [`SmallArray`](crate::SmallArray).
//!
//! A `RawArray` owns either an inline region of `N` uninitialised slots or a
//! single heap extent. It tracks how many leading slots hold live elements but
//! never drops them; that is the job of the owning container.
//!
//! Element handling is split at compile time on `mem::needs_drop::<T>()`:
//!
//! - plain data (no drop glue) grows heap storage with a single `realloc`,
//!   and destroying ranges of it is a no-op;
//! - everything else is relocated into a freshly allocated extent before the
//!   old one is released, and ranges are destroyed with `drop_in_place`.
//!
//! Heap memory comes straight from `std::alloc`. Running out of memory aborts
//! through `handle_alloc_error`; asking for more elements than `T` can address
//! is a fatal condition.

use crate::fatal::{raise, FatalError};
use std::alloc::{self, Layout};
use std::mem::{self, MaybeUninit};
use std::ptr::{self, NonNull};

pub(crate) enum Storage<T, const N: usize> {
    Inline([MaybeUninit<T>; N]),
    Heap { ptr: NonNull<T>, capacity: usize },
}

pub(crate) struct RawArray<T, const N: usize> {
    storage: Storage<T, N>,
    pub len: usize,
}

/// Capacity chosen when growing `current` to hold at least `min` elements.
///
/// Always grows: the result is at least `2 * current + 1`, clamped to `max`.
pub(crate) fn grown_capacity(current: usize, min: usize, max: usize) -> usize {
    if min > max {
        raise(FatalError::CapacityOverflow { requested: min, max });
    }
    if current >= max {
        raise(FatalError::AtMaximumCapacity { capacity: current });
    }
    current
        .saturating_mul(2)
        .saturating_add(1)
        .max(min)
        .min(max)
}

fn inline_uninit<T, const N: usize>() -> [MaybeUninit<T>; N] {
    // An array of `MaybeUninit` is valid without initialisation.
    unsafe { MaybeUninit::<[MaybeUninit<T>; N]>::uninit().assume_init() }
}

fn layout_for<T>(capacity: usize) -> Layout {
    match Layout::array::<T>(capacity) {
        Ok(layout) => layout,
        Err(_) => raise(FatalError::CapacityOverflow {
            requested: capacity,
            max: RawArray::<T, 0>::MAX_CAPACITY,
        }),
    }
}

fn alloc_buffer<T>(capacity: usize) -> NonNull<T> {
    let layout = layout_for::<T>(capacity);
    match NonNull::new(unsafe { alloc::alloc(layout) } as *mut T) {
        Some(ptr) => ptr,
        None => alloc::handle_alloc_error(layout),
    }
}

unsafe fn realloc_buffer<T>(ptr: NonNull<T>, capacity: usize, new_capacity: usize) -> NonNull<T> {
    let old_layout = layout_for::<T>(capacity);
    let new_layout = layout_for::<T>(new_capacity);
    let raw = alloc::realloc(ptr.as_ptr() as *mut u8, old_layout, new_layout.size());
    match NonNull::new(raw as *mut T) {
        Some(ptr) => ptr,
        None => alloc::handle_alloc_error(new_layout),
    }
}

unsafe fn free_buffer<T>(ptr: NonNull<T>, capacity: usize) {
    alloc::dealloc(ptr.as_ptr() as *mut u8, layout_for::<T>(capacity));
}

/// Read access to the live elements while an insertion is in progress.
///
/// Indices are the ones the elements had before the insertion started,
/// wherever the elements happen to sit at the moment.
pub(crate) struct Source<T> {
    base: *const T,
    index: usize,
    shift: usize,
}

impl<T> Source<T> {
    #[inline(always)]
    pub fn get(&self, i: usize) -> &T {
        let i = if i >= self.index { i + self.shift } else { i };
        unsafe { &*self.base.add(i) }
    }
}

/// Restores an in-place insertion that panicked half way: drops what was
/// written into the gap and closes it again.
struct GapGuard<'a, T> {
    base: *mut T,
    len: &'a mut usize,
    old_len: usize,
    index: usize,
    count: usize,
    filled: usize,
}

impl<'a, T> Drop for GapGuard<'a, T> {
    fn drop(&mut self) {
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.base.add(self.index),
                self.filled,
            ));
            ptr::copy(
                self.base.add(self.index + self.count),
                self.base.add(self.index),
                self.old_len - self.index,
            );
        }
        *self.len = self.old_len;
    }
}

/// Releases a freshly allocated extent whose filling panicked.
struct FreshGuard<T> {
    ptr: NonNull<T>,
    capacity: usize,
    start: usize,
    filled: usize,
}

impl<T> Drop for FreshGuard<T> {
    fn drop(&mut self) {
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.ptr.as_ptr().add(self.start),
                self.filled,
            ));
            free_buffer(self.ptr, self.capacity);
        }
    }
}

impl<T, const N: usize> RawArray<T, N> {
    pub const IS_ZST: bool = mem::size_of::<T>() == 0;
    pub const TRIVIAL: bool = !mem::needs_drop::<T>();
    pub const MAX_CAPACITY: usize = if Self::IS_ZST {
        usize::MAX
    } else {
        isize::MAX as usize / mem::size_of::<T>()
    };

    pub fn new() -> Self {
        RawArray {
            storage: Storage::Inline(inline_uninit()),
            len: 0,
        }
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        match &self.storage {
            Storage::Inline(_) if Self::IS_ZST => usize::MAX,
            Storage::Inline(_) => N,
            Storage::Heap { capacity, .. } => *capacity,
        }
    }

    #[inline(always)]
    pub fn is_heap(&self) -> bool {
        matches!(self.storage, Storage::Heap { .. })
    }

    #[inline(always)]
    pub fn ptr(&self) -> *const T {
        match &self.storage {
            Storage::Inline(items) => items.as_ptr() as *const T,
            Storage::Heap { ptr, .. } => ptr.as_ptr(),
        }
    }

    #[inline(always)]
    pub fn mut_ptr(&mut self) -> *mut T {
        match &mut self.storage {
            Storage::Inline(items) => items.as_mut_ptr() as *mut T,
            Storage::Heap { ptr, .. } => ptr.as_ptr(),
        }
    }

    /// Moves to a larger extent chosen by [`grown_capacity`].
    pub fn grow(&mut self, min: usize) {
        let new_capacity = grown_capacity(self.capacity(), min, Self::MAX_CAPACITY);
        unsafe { self.relocate(new_capacity) };
    }

    /// Moves the live elements to a heap extent of `new_capacity` slots.
    ///
    /// The new extent is in place before the old one is released. Inline
    /// storage is never freed.
    unsafe fn relocate(&mut self, new_capacity: usize) {
        debug_assert!(!Self::IS_ZST, "zero-sized elements never need storage");
        debug_assert!(new_capacity >= self.len, "relocation would drop elements");
        let new_ptr = match self.storage {
            Storage::Heap { ptr, capacity } if Self::TRIVIAL => {
                realloc_buffer(ptr, capacity, new_capacity)
            }
            _ => {
                let new_ptr = alloc_buffer::<T>(new_capacity);
                ptr::copy_nonoverlapping(self.ptr(), new_ptr.as_ptr(), self.len);
                if let Storage::Heap { ptr, capacity } = self.storage {
                    free_buffer(ptr, capacity);
                }
                new_ptr
            }
        };
        trace!(
            "small array of {} grows {} -> {} elements",
            std::any::type_name::<T>(),
            self.capacity(),
            new_capacity
        );
        self.storage = Storage::Heap {
            ptr: new_ptr,
            capacity: new_capacity,
        };
    }

    /// Gives back the heap extent, if any, and returns to inline storage.
    ///
    /// The caller must have disposed of the live elements.
    pub fn release(&mut self) {
        debug_assert_eq!(0, self.len, "release with live elements");
        if let Storage::Heap { ptr, capacity } = self.storage {
            unsafe { free_buffer(ptr, capacity) };
            self.storage = Storage::Inline(inline_uninit());
        }
    }

    /// Exchanges storage and length with `other` without touching elements.
    pub fn swap_storage(&mut self, other: &mut Self) {
        mem::swap(&mut self.storage, &mut other.storage);
        mem::swap(&mut self.len, &mut other.len);
    }

    /// Opens a gap of `count` slots at `index` and fills slot `index + k` with
    /// `fill(source, k)`.
    ///
    /// `source` reads the elements that were live before the call, which is
    /// how an insertion can copy from the very array it grows. When the array
    /// has to grow, the new extent is allocated and filled before anything is
    /// moved; a panic in `fill` leaves the array as it was.
    ///
    /// # Safety
    ///
    /// `index <= self.len`.
    pub unsafe fn insert_with<F>(&mut self, index: usize, count: usize, fill: F)
    where
        F: FnMut(&Source<T>, usize) -> T,
    {
        debug_assert!(index <= self.len, "insert position past the end");
        if count == 0 {
            return;
        }
        let required = match self.len.checked_add(count) {
            Some(required) if required <= Self::MAX_CAPACITY => required,
            _ => raise(FatalError::CapacityOverflow {
                requested: self.len.saturating_add(count),
                max: Self::MAX_CAPACITY,
            }),
        };
        if required <= self.capacity() {
            self.insert_in_place(index, count, fill);
        } else {
            let new_capacity = grown_capacity(self.capacity(), required, Self::MAX_CAPACITY);
            self.insert_growing(index, count, new_capacity, fill);
        }
    }

    unsafe fn insert_in_place<F>(&mut self, index: usize, count: usize, mut fill: F)
    where
        F: FnMut(&Source<T>, usize) -> T,
    {
        let old_len = self.len;
        let base = self.mut_ptr();
        ptr::copy(base.add(index), base.add(index + count), old_len - index);
        self.len = index;

        let source = Source {
            base: base as *const T,
            index,
            shift: count,
        };
        let mut guard = GapGuard {
            base,
            len: &mut self.len,
            old_len,
            index,
            count,
            filled: 0,
        };
        for k in 0..count {
            base.add(index + k).write(fill(&source, k));
            guard.filled += 1;
        }
        mem::forget(guard);
        self.len = old_len + count;
    }

    unsafe fn insert_growing<F>(&mut self, index: usize, count: usize, new_capacity: usize, mut fill: F)
    where
        F: FnMut(&Source<T>, usize) -> T,
    {
        let old_len = self.len;
        let old = self.ptr();
        let new_ptr = alloc_buffer::<T>(new_capacity);

        let source = Source {
            base: old,
            index,
            shift: 0,
        };
        let mut guard = FreshGuard {
            ptr: new_ptr,
            capacity: new_capacity,
            start: index,
            filled: 0,
        };
        for k in 0..count {
            new_ptr.as_ptr().add(index + k).write(fill(&source, k));
            guard.filled += 1;
        }
        mem::forget(guard);

        ptr::copy_nonoverlapping(old, new_ptr.as_ptr(), index);
        ptr::copy_nonoverlapping(
            old.add(index),
            new_ptr.as_ptr().add(index + count),
            old_len - index,
        );
        if let Storage::Heap { ptr, capacity } = self.storage {
            free_buffer(ptr, capacity);
        }
        trace!(
            "small array of {} grows {} -> {} elements on insert",
            std::any::type_name::<T>(),
            self.capacity(),
            new_capacity
        );
        self.storage = Storage::Heap {
            ptr: new_ptr,
            capacity: new_capacity,
        };
        self.len = old_len + count;
    }
}

impl<T, const N: usize> Drop for RawArray<T, N> {
    fn drop(&mut self) {
        if let Storage::Heap { ptr, capacity } = self.storage {
            unsafe { free_buffer(ptr, capacity) };
        }
    }
}

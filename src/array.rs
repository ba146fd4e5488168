use crate::fatal::{raise, FatalError};
use crate::raw::RawArray;
use std::borrow::{Borrow, BorrowMut};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;
use std::ops::{Bound, Deref, DerefMut, Range, RangeBounds};
use std::{fmt, mem, ptr, slice};

/// A growable array that keeps up to `N` elements inline and moves to a
/// single heap allocation once it outgrows them.
///
/// Moving from inline to heap storage is one-way: only [`reset`](SmallArray::reset)
/// brings the array back to its inline buffer. Any operation that may grow the
/// array invalidates raw pointers into it.
///
/// Index and range violations, and requests for more elements than `T` can
/// address, are fatal (see [`fatal`](crate::fatal)).
///
/// Neither `Send` nor `Sync`, like every other type in this crate.
pub struct SmallArray<T, const N: usize> {
    raw: RawArray<T, N>,
}

impl<T, const N: usize> SmallArray<T, N> {
    pub fn new() -> Self {
        SmallArray {
            raw: RawArray::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut array = SmallArray::new();
        array.reserve(capacity);
        array
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.raw.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.raw.len == 0
    }

    /// Elements the current storage can hold.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    pub const fn inline_capacity(&self) -> usize {
        N
    }

    /// Largest element count this array can ever hold.
    pub const fn max_capacity(&self) -> usize {
        RawArray::<T, N>::MAX_CAPACITY
    }

    /// True once the elements live on the heap rather than inline.
    #[inline(always)]
    pub fn is_using_allocated_buffer(&self) -> bool {
        self.raw.is_heap()
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> *const T {
        self.raw.ptr()
    }

    #[inline(always)]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.raw.mut_ptr()
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.raw.ptr(), self.raw.len) }
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.raw.mut_ptr(), self.raw.len) }
    }

    /// Ensures `capacity() >= capacity`. Never shrinks.
    pub fn reserve(&mut self, capacity: usize) {
        if self.capacity() < capacity {
            self.grow(capacity);
        }
    }

    /// Ensures room for `additional` more elements.
    pub fn reserve_additional(&mut self, additional: usize) {
        match self.raw.len.checked_add(additional) {
            Some(capacity) => self.reserve(capacity),
            None => raise(FatalError::CapacityOverflow {
                requested: usize::MAX,
                max: self.max_capacity(),
            }),
        }
    }

    /// Moves to a larger heap allocation of at least `max(2 * capacity + 1, min_size)`
    /// elements, clamped to [`max_capacity`](SmallArray::max_capacity).
    ///
    /// Always grows, even if `min_size` already fits.
    pub fn grow(&mut self, min_size: usize) {
        self.raw.grow(min_size);
    }

    /// Appends `value` (push_back).
    pub fn push(&mut self, value: T) {
        let len = self.raw.len;
        if len == self.capacity() {
            self.grow(len.saturating_add(1));
        }
        unsafe { self.raw.mut_ptr().add(len).write(value) };
        self.raw.len = len + 1;
    }

    /// Appends the value built by `make` and returns a reference to it.
    pub fn emplace_back<F: FnOnce() -> T>(&mut self, make: F) -> &mut T {
        self.push(make());
        let last = self.raw.len - 1;
        unsafe { &mut *self.raw.mut_ptr().add(last) }
    }

    /// Appends a clone of the element at `index`.
    ///
    /// When the array is full the clone is taken from the old storage after
    /// the new storage has been allocated and before the old one is released.
    pub fn push_from_within(&mut self, index: usize)
    where
        T: Clone,
    {
        self.check_index(index);
        let len = self.raw.len;
        self.insert_from_within(len, index..index + 1);
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.raw.len == 0 {
            return None;
        }
        self.raw.len -= 1;
        Some(unsafe { ptr::read(self.raw.ptr().add(self.raw.len)) })
    }

    /// Inserts `value` before position `index`; returns `index`.
    pub fn insert(&mut self, index: usize, value: T) -> usize {
        self.check_position(index);
        let len = self.raw.len;
        if len == self.capacity() {
            self.grow(len.saturating_add(1));
        }
        unsafe {
            let slot = self.raw.mut_ptr().add(index);
            ptr::copy(slot, slot.add(1), len - index);
            slot.write(value);
        }
        self.raw.len = len + 1;
        index
    }

    /// Inserts `count` clones of `value` before `index`; returns `index`.
    pub fn insert_n(&mut self, index: usize, count: usize, value: &T) -> usize
    where
        T: Clone,
    {
        self.check_position(index);
        unsafe { self.raw.insert_with(index, count, |_, _| value.clone()) };
        index
    }

    /// Inserts clones of `items` before `index`; returns `index`.
    pub fn insert_slice(&mut self, index: usize, items: &[T]) -> usize
    where
        T: Clone,
    {
        self.check_position(index);
        unsafe { self.raw.insert_with(index, items.len(), |_, k| items[k].clone()) };
        index
    }

    /// Inserts every item of `iter` before `index`; returns `index`.
    pub fn insert_iter<I: IntoIterator<Item = T>>(&mut self, index: usize, iter: I) -> usize {
        self.check_position(index);
        let old_len = self.raw.len;
        let mut guard = TruncateOnUnwind {
            array: &mut *self,
            len: old_len,
        };
        guard.array.extend(iter);
        mem::forget(guard);
        self.as_mut_slice()[index..].rotate_left(old_len - index);
        index
    }

    /// Inserts clones of the elements in `range` of this same array before `index`.
    ///
    /// The source range is read before any element moves, so it may overlap
    /// the insertion point, and the copy stays correct when the array has to
    /// grow to make room.
    pub fn insert_from_within(&mut self, index: usize, range: Range<usize>) -> usize
    where
        T: Clone,
    {
        self.check_position(index);
        self.check_range(range.start, range.end);
        let start = range.start;
        unsafe {
            self.raw
                .insert_with(index, range.len(), |source, k| source.get(start + k).clone())
        };
        index
    }

    /// Removes the element at `index`; returns the position that followed it.
    pub fn erase(&mut self, index: usize) -> usize {
        drop(self.remove(index));
        index
    }

    /// Removes `range`; returns the position that followed it.
    pub fn erase_range<R: RangeBounds<usize>>(&mut self, range: R) -> usize {
        let (start, end) = self.resolve(range);
        let old_len = self.raw.len;
        let removed = end - start;
        if removed == 0 {
            return start;
        }
        unsafe {
            let base = self.raw.mut_ptr();
            // A panicking destructor leaks the tail instead of dropping it twice.
            self.raw.len = start;
            if !RawArray::<T, N>::TRIVIAL {
                ptr::drop_in_place(ptr::slice_from_raw_parts_mut(base.add(start), removed));
            }
            ptr::copy(base.add(end), base.add(start), old_len - end);
        }
        self.raw.len = old_len - removed;
        start
    }

    /// Removes and returns the element at `index`, shifting the tail down.
    pub fn remove(&mut self, index: usize) -> T {
        self.check_index(index);
        let len = self.raw.len;
        unsafe {
            let base = self.raw.mut_ptr();
            let value = ptr::read(base.add(index));
            ptr::copy(base.add(index + 1), base.add(index), len - index - 1);
            self.raw.len = len - 1;
            value
        }
    }

    /// Drops the elements past `len`. Does nothing if the array is not longer.
    pub fn truncate(&mut self, len: usize) {
        let old_len = self.raw.len;
        if len >= old_len {
            return;
        }
        self.raw.len = len;
        if !RawArray::<T, N>::TRIVIAL {
            unsafe {
                let tail = self.raw.mut_ptr().add(len);
                ptr::drop_in_place(ptr::slice_from_raw_parts_mut(tail, old_len - len));
            }
        }
    }

    /// Drops every element. Keeps the current storage.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Drops every element, releases the heap allocation and returns to inline storage.
    pub fn reset(&mut self) {
        self.clear();
        self.raw.release();
    }

    pub fn resize(&mut self, new_len: usize, value: T)
    where
        T: Clone,
    {
        let len = self.raw.len;
        if new_len > len {
            self.insert_n(len, new_len - len, &value);
        } else {
            self.truncate(new_len);
        }
    }

    pub fn resize_with<F: FnMut() -> T>(&mut self, new_len: usize, mut make: F) {
        let len = self.raw.len;
        if new_len > len {
            self.reserve(new_len);
            for _ in len..new_len {
                self.push(make());
            }
        } else {
            self.truncate(new_len);
        }
    }

    pub fn extend_from_slice(&mut self, items: &[T])
    where
        T: Clone,
    {
        let len = self.raw.len;
        self.insert_slice(len, items);
    }

    pub fn from_slice(items: &[T]) -> Self
    where
        T: Clone,
    {
        let mut array = SmallArray::with_capacity(items.len());
        array.extend_from_slice(items);
        array
    }

    /// Exchanges the contents of two arrays.
    ///
    /// When both are on the heap only the storage handles change hands.
    /// Otherwise the common prefix is swapped element by element and the
    /// longer array's excess is moved into the shorter one's tail.
    pub fn swap_with(&mut self, other: &mut Self) {
        if self.raw.is_heap() && other.raw.is_heap() {
            self.raw.swap_storage(&mut other.raw);
            return;
        }
        let (longer, shorter) = if self.raw.len >= other.raw.len {
            (self, other)
        } else {
            (other, self)
        };
        let common = shorter.raw.len;
        let excess = longer.raw.len - common;
        shorter.reserve(common + excess);
        unsafe {
            ptr::swap_nonoverlapping(longer.raw.mut_ptr(), shorter.raw.mut_ptr(), common);
            ptr::copy_nonoverlapping(
                longer.raw.ptr().add(common),
                shorter.raw.mut_ptr().add(common),
                excess,
            );
        }
        shorter.raw.len = common + excess;
        longer.raw.len = common;
    }

    /// True if `ptr` points at one of the live elements.
    pub fn is_reference_to_storage(&self, ptr: *const T) -> bool {
        let (begin, end) = self.live_range();
        let addr = ptr as usize;
        addr >= begin && addr < end
    }

    /// True if the `count` elements starting at `first` all lie within the live elements.
    pub fn is_range_in_storage(&self, first: *const T, count: usize) -> bool {
        let (begin, end) = self.live_range();
        let start = first as usize;
        match count
            .checked_mul(mem::size_of::<T>())
            .and_then(|bytes| start.checked_add(bytes))
        {
            Some(stop) => start >= begin && stop <= end,
            None => false,
        }
    }

    fn live_range(&self) -> (usize, usize) {
        let begin = self.raw.ptr() as usize;
        (begin, begin + self.raw.len * mem::size_of::<T>())
    }

    #[inline(always)]
    fn check_index(&self, index: usize) {
        if index >= self.raw.len {
            raise(FatalError::IndexOutOfBounds {
                index,
                len: self.raw.len,
            });
        }
    }

    #[inline(always)]
    fn check_position(&self, index: usize) {
        if index > self.raw.len {
            raise(FatalError::IndexOutOfBounds {
                index,
                len: self.raw.len,
            });
        }
    }

    #[inline(always)]
    fn check_range(&self, start: usize, end: usize) {
        if start > end || end > self.raw.len {
            raise(FatalError::InvalidRange {
                start,
                end,
                len: self.raw.len,
            });
        }
    }

    fn resolve<R: RangeBounds<usize>>(&self, range: R) -> (usize, usize) {
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => self.raw.len,
        };
        self.check_range(start, end);
        (start, end)
    }
}

/// Drops the elements an interrupted append left past `len`.
struct TruncateOnUnwind<'a, T, const N: usize> {
    array: &'a mut SmallArray<T, N>,
    len: usize,
}

impl<'a, T, const N: usize> Drop for TruncateOnUnwind<'a, T, N> {
    fn drop(&mut self) {
        self.array.truncate(self.len);
    }
}

impl<T, const N: usize> Drop for SmallArray<T, N> {
    fn drop(&mut self) {
        self.truncate(0);
    }
}

impl<T, const N: usize> Default for SmallArray<T, N> {
    fn default() -> Self {
        SmallArray::new()
    }
}

impl<T, const N: usize> Deref for SmallArray<T, N> {
    type Target = [T];

    #[inline(always)]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, const N: usize> DerefMut for SmallArray<T, N> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, const N: usize> AsRef<[T]> for SmallArray<T, N> {
    fn as_ref(&self) -> &[T] {
        self
    }
}

impl<T, const N: usize> AsMut<[T]> for SmallArray<T, N> {
    fn as_mut(&mut self) -> &mut [T] {
        self
    }
}

impl<T, const N: usize> Borrow<[T]> for SmallArray<T, N> {
    fn borrow(&self) -> &[T] {
        self
    }
}

impl<T, const N: usize> BorrowMut<[T]> for SmallArray<T, N> {
    fn borrow_mut(&mut self) -> &mut [T] {
        self
    }
}

impl<T: Clone, const N: usize> Clone for SmallArray<T, N> {
    fn clone(&self) -> Self {
        SmallArray::from_slice(self)
    }
}

impl<'a, T: Clone, const N: usize> From<&'a [T]> for SmallArray<T, N> {
    fn from(items: &'a [T]) -> Self {
        SmallArray::from_slice(items)
    }
}

impl<T: fmt::Debug, const N: usize> fmt::Debug for SmallArray<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, const N: usize, const M: usize> PartialEq<SmallArray<T, M>> for SmallArray<T, N> {
    fn eq(&self, other: &SmallArray<T, M>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: PartialEq, const N: usize> PartialEq<[T]> for SmallArray<T, N> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}

impl<'a, T: PartialEq, const N: usize> PartialEq<&'a [T]> for SmallArray<T, N> {
    fn eq(&self, other: &&'a [T]) -> bool {
        self.as_slice() == *other
    }
}

impl<T: Eq, const N: usize> Eq for SmallArray<T, N> {}

impl<T: PartialOrd, const N: usize, const M: usize> PartialOrd<SmallArray<T, M>> for SmallArray<T, N> {
    fn partial_cmp(&self, other: &SmallArray<T, M>) -> Option<Ordering> {
        self.as_slice().partial_cmp(other.as_slice())
    }
}

impl<T: Ord, const N: usize> Ord for SmallArray<T, N> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl<T: Hash, const N: usize> Hash for SmallArray<T, N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state)
    }
}

impl<T, const N: usize> Extend<T> for SmallArray<T, N> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        self.reserve_additional(lower);
        for item in iter {
            self.push(item);
        }
    }
}

impl<'a, T: Copy + 'a, const N: usize> Extend<&'a T> for SmallArray<T, N> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied())
    }
}

impl<T, const N: usize> FromIterator<T> for SmallArray<T, N> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = SmallArray::new();
        array.extend(iter);
        array
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a SmallArray<T, N> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a mut SmallArray<T, N> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T, const N: usize> IntoIterator for SmallArray<T, N> {
    type Item = T;
    type IntoIter = IntoIter<T, N>;

    fn into_iter(mut self) -> Self::IntoIter {
        let mut raw = mem::replace(&mut self.raw, RawArray::new());
        let back = raw.len;
        raw.len = 0;
        IntoIter {
            raw,
            front: 0,
            back,
        }
    }
}

/// Owning iterator over the elements of a [`SmallArray`].
pub struct IntoIter<T, const N: usize> {
    raw: RawArray<T, N>,
    front: usize,
    back: usize,
}

impl<T, const N: usize> IntoIter<T, N> {
    /// The elements not yet yielded.
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.raw.ptr().add(self.front), self.back - self.front) }
    }
}

impl<T, const N: usize> Iterator for IntoIter<T, N> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.front == self.back {
            return None;
        }
        let item = unsafe { ptr::read(self.raw.ptr().add(self.front)) };
        self.front += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }
}

impl<T, const N: usize> DoubleEndedIterator for IntoIter<T, N> {
    fn next_back(&mut self) -> Option<T> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        Some(unsafe { ptr::read(self.raw.ptr().add(self.back)) })
    }
}

impl<T, const N: usize> ExactSizeIterator for IntoIter<T, N> {}

impl<T, const N: usize> Drop for IntoIter<T, N> {
    fn drop(&mut self) {
        if RawArray::<T, N>::TRIVIAL {
            return;
        }
        let remaining = self.back - self.front;
        self.front = self.back;
        unsafe {
            let start = self.raw.mut_ptr().add(self.back - remaining);
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(start, remaining));
        }
    }
}

impl<T: fmt::Debug, const N: usize> fmt::Debug for IntoIter<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.as_slice()).finish()
    }
}

/// Builds a [`SmallArray`] from a list of elements or from `value; count`.
#[macro_export]
macro_rules! small_array {
    ($elem:expr; $n:expr) => ({
        let mut array = $crate::SmallArray::new();
        array.resize($n, $elem);
        array
    });
    ($($x:expr),* $(,)?) => ({
        #[allow(unused_mut)]
        let mut array = $crate::SmallArray::new();
        $( array.push($x); )*
        array
    });
}

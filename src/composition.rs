//! Tests of allocators nested inside each other.

use crate::{
    Allocator, Arena, BlockAllocator, Cascade, Drainable, Fallback, FreeList, HeapAllocator, Memory,
    Segregator, Stats,
};
use proptest::prelude::*;

type Small = FreeList<Arena<8192>, 256>;
type Medium = Cascade<BlockAllocator<1024, 1>>;
type Composed = Stats<Fallback<Segregator<256, Small, Medium>, HeapAllocator>>;

fn fill(memory: Memory, size: usize, tag: u8) {
    unsafe { std::ptr::write_bytes(memory.ptr(), tag, size) };
}

fn holds(memory: Memory, size: usize, tag: u8) -> bool {
    let bytes = unsafe { std::slice::from_raw_parts(memory.ptr(), size) };
    bytes.iter().all(|&b| b == tag)
}

#[test]
fn requests_land_where_their_size_says() {
    let mut alloc = Composed::default();
    let small = alloc.alloc(100);
    let medium = alloc.alloc(700);
    let large = alloc.alloc(5000);

    let segregator = alloc.inner().primary();
    assert_eq!(256, small.capacity());
    assert!(segregator.first().owns(small));
    assert!(segregator.second().owns(medium));
    assert!(!alloc.inner().primary().owns(large));
    assert!(alloc.owns(large));

    for m in [small, medium, large].iter() {
        assert!(alloc.dealloc(*m));
    }
    assert_eq!(0, alloc.stats().bytes_allocated_now);
}

#[test]
fn exhausted_small_class_spills_to_cascade() {
    let mut alloc = Composed::default();
    let blocks: Vec<Memory> = (0..40).map(|_| alloc.alloc(64)).collect();
    let segregator = alloc.inner().primary();
    let in_first = blocks.iter().filter(|m| segregator.first().owns(**m)).count();
    assert_eq!(32, in_first);
    assert!(blocks[32..].iter().all(|m| segregator.second().owns(*m)));
    for m in blocks {
        alloc.free(m);
    }
    assert!(alloc.inner().primary().second().is_drained());
}

#[test]
fn freed_small_block_is_reused() {
    let mut alloc = Composed::default();
    let a = alloc.alloc(200);
    alloc.free(a);
    assert_eq!(1, alloc.inner().primary().first().cached());
    let b = alloc.alloc(10);
    assert_eq!(a.ptr(), b.ptr());
    assert_eq!(0, alloc.inner().primary().first().cached());
}

proptest! {
    #[test]
    fn blocks_never_overlap_and_everything_comes_back(
        sizes in prop::collection::vec(1usize..3000, 1..120),
        order in prop::collection::vec(any::<prop::sample::Index>(), 120),
    ) {
        let mut alloc = Composed::default();
        let mut live: Vec<(Memory, usize, u8)> = Vec::new();
        for (i, &size) in sizes.iter().enumerate() {
            let m = alloc.alloc(size);
            prop_assert!(!m.is_empty());
            prop_assert!(m.capacity() >= size);
            let tag = (i % 251) as u8;
            fill(m, size, tag);
            live.push((m, size, tag));
        }
        for &(m, size, tag) in &live {
            prop_assert!(holds(m, size, tag));
        }

        let mut picks = order.into_iter();
        while !live.is_empty() {
            let index = picks.next().map(|i| i.index(live.len())).unwrap_or(0);
            let (m, _, _) = live.swap_remove(index);
            prop_assert!(alloc.dealloc(m));
        }

        let s = *alloc.stats();
        prop_assert_eq!(0, s.bytes_allocated_now);
        prop_assert_eq!(s.allocs, s.deallocs);
        prop_assert_eq!(1, alloc.inner().primary().second().len());
        prop_assert!(alloc.alloc(64).capacity() >= 64);
    }
}

//! Small-buffer arrays and composable allocators.
//!
//! [`SmallArray`] stores up to `N` elements inline and moves to one heap
//! allocation when it outgrows them.
//!
//! The allocator side is a set of building blocks that share the
//! [`Allocator`] trait and nest inside each other: [`HeapAllocator`] and
//! [`NullAllocator`] at the leaves, [`Arena`] and [`BlockAllocator`] over a
//! fixed region, and [`FreeList`], [`Segregator`], [`Fallback`], [`Cascade`]
//! and [`Stats`] as combinators.
//!
//! ```
//! use memkit::{Allocator, Arena, Fallback, HeapAllocator, Segregator, BlockAllocator};
//!
//! let mut alloc: Fallback<Segregator<64, BlockAllocator<64, 1>, Arena<4096>>, HeapAllocator> =
//!     Default::default();
//! let small = alloc.alloc(24);
//! let large = alloc.alloc(10_000);
//! assert!(!small.is_empty() && !large.is_empty());
//! assert!(alloc.dealloc(small));
//! assert!(alloc.dealloc(large));
//! ```

#[macro_use]
mod logging;

pub mod fatal;
mod memory;
mod traits;
mod bitblock;
mod heap;
mod null;
mod arena;
mod block;
mod freelist;
mod fallback;
mod segregator;
mod cascade;
mod stats;
mod raw;
mod array;

pub use fatal::{set_fatal_hook, take_fatal_hook, FatalError, FatalHook};
pub use memory::{round_up, Memory, ALIGN};
pub use traits::{Allocator, Drainable};
pub use bitblock::BitBlock;
pub use heap::HeapAllocator;
pub use null::NullAllocator;
pub use arena::Arena;
pub use block::BlockAllocator;
pub use freelist::FreeList;
pub use fallback::Fallback;
pub use segregator::Segregator;
pub use cascade::Cascade;
pub use stats::{AllocStats, Stats};
pub use array::{IntoIter, SmallArray};

#[cfg(test)]
pub mod dropflag;
#[cfg(test)]
mod composition;

//! Fatal, non-recoverable conditions.
//!
//! Size overflows and broken invariants are programmer errors. They are
//! reported through [`raise`], which logs the condition, hands it to the
//! fatal hook installed on the current thread (if any) and then panics.
//! Allocation exhaustion is *not* fatal; allocators signal it with an
//! empty [`Memory`](crate::Memory) descriptor.

use std::cell::Cell;
use std::error::Error;
use std::fmt;

/// A condition that terminates the current operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FatalError {
    /// The requested element count exceeds what the buffer can address.
    CapacityOverflow {
        /// Requested element count.
        requested: usize,
        /// Largest element count the buffer supports.
        max: usize,
    },
    /// Growth was requested while already at the largest supported capacity.
    AtMaximumCapacity {
        /// Current capacity.
        capacity: usize,
    },
    /// A position outside `0..=len` (or `0..len` for element access).
    IndexOutOfBounds {
        /// Offending index.
        index: usize,
        /// Number of live elements.
        len: usize,
    },
    /// A range that is reversed or extends past the live elements.
    InvalidRange {
        /// Range start.
        start: usize,
        /// Range end (exclusive).
        end: usize,
        /// Number of live elements.
        len: usize,
    },
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalError::CapacityOverflow { requested, max } => write!(
                f,
                "capacity overflow: requested {} elements, maximum is {}",
                requested, max
            ),
            FatalError::AtMaximumCapacity { capacity } => write!(
                f,
                "buffer is already at maximum capacity ({}) and can not grow",
                capacity
            ),
            FatalError::IndexOutOfBounds { index, len } => {
                write!(f, "index {} is out of bounds for length {}", index, len)
            }
            FatalError::InvalidRange { start, end, len } => {
                write!(f, "range {}..{} is invalid for length {}", start, end, len)
            }
        }
    }
}

impl Error for FatalError {}

/// Observer invoked with every fatal condition before the panic unwinds.
pub type FatalHook = fn(&FatalError);

thread_local! {
    static FATAL_HOOK: Cell<Option<FatalHook>> = Cell::new(None);
}

/// Installs `hook` for the current thread and returns the previous one.
pub fn set_fatal_hook(hook: FatalHook) -> Option<FatalHook> {
    FATAL_HOOK.with(|cell| cell.replace(Some(hook)))
}

/// Removes the hook installed on the current thread.
pub fn take_fatal_hook() -> Option<FatalHook> {
    FATAL_HOOK.with(|cell| cell.take())
}

/// Reports `err` and panics.
#[cold]
#[inline(never)]
pub fn raise(err: FatalError) -> ! {
    error!("fatal: {}", err);
    if let Some(hook) = FATAL_HOOK.with(|cell| cell.get()) {
        hook(&err);
    }
    panic!("{}", err)
}

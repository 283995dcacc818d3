//! Centralized id range allocator.
//!
//! Serializes concurrent allocation requests against the durable counter and
//! hands out disjoint, contiguous, monotonically increasing ranges. The
//! ordering inside the critical section is the whole contract: read the
//! counter, compute the range, durably persist the new high-water mark, and
//! only then release and return. Releasing before the persist completes
//! would let two callers observe the same counter value after a crash.

pub mod buffer;

use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::counter::{CounterError, CounterStore};

pub use buffer::IdBuffer;

/// Errors from range allocation.
#[derive(Debug, Error)]
pub enum AllocatorError {
    /// Requested size was zero or negative; no state was changed
    #[error("allocation size must be positive, got {0}")]
    InvalidSize(i64),

    /// The counter state was unreadable or corrupt when the allocator opened
    #[error("counter state unusable at startup: {0}")]
    OpenFailed(#[source] CounterError),

    /// The high-water mark could not be read or durably advanced; the counter
    /// is left at its last persisted value
    #[error("failed to advance high-water mark: {0}")]
    AllocationFailed(#[source] CounterError),
}

/// A contiguous, 1-based, inclusive range of allocated ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    pub start: u64,
    pub end: u64,
}

impl IdRange {
    /// Number of ids in the range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// True when the range holds no ids (never produced by `allocate`).
    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// Single-writer allocator over a durable counter.
///
/// At most one allocation is in flight at a time; the mutex totally orders
/// all `allocate` calls within one process. The allocator holds no
/// cross-process lock: running multiple instances against the same counter
/// store without external mutual exclusion is unsupported and will violate
/// range disjointness.
#[derive(Debug)]
pub struct RangeAllocator<C: CounterStore> {
    counter: Mutex<C>,
}

impl<C: CounterStore> RangeAllocator<C> {
    /// Opens an allocator over the given counter store.
    ///
    /// Performs an initial read so a corrupt high-water mark surfaces here,
    /// at startup, rather than on the first allocation.
    pub fn open(counter: C) -> crate::Result<Self> {
        counter.read().map_err(AllocatorError::OpenFailed)?;
        Ok(Self {
            counter: Mutex::new(counter),
        })
    }

    /// Allocates a contiguous range of `size` fresh ids.
    ///
    /// # Arguments
    /// * `size` - Number of ids requested, must be positive
    ///
    /// # Returns
    /// The allocated `(start, end)` range, disjoint from every range this
    /// allocator has ever returned
    pub fn allocate(&self, size: i64) -> crate::Result<IdRange> {
        if size <= 0 {
            return Err(AllocatorError::InvalidSize(size).into());
        }

        // Critical section: counter reads and the durable write happen under
        // one lock, in arrival order.
        let mut counter = self.counter.lock().unwrap_or_else(PoisonError::into_inner);

        let current = counter.read().map_err(AllocatorError::AllocationFailed)?;
        let start = current + 1;
        let end = current + size as u64;

        // Persist before releasing the section; a failure here fails the
        // whole allocation and leaves the counter at `current`.
        counter.write(end).map_err(AllocatorError::AllocationFailed)?;

        tracing::info!(start, end, "allocated id range");
        Ok(IdRange { start, end })
    }

    /// Returns the current high-water mark: the largest id ever allocated.
    pub fn high_water_mark(&self) -> crate::Result<u64> {
        let counter = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(counter.read()?)
    }
}

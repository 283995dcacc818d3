//! Caller-side id buffering.
//!
//! A requester fetches a size-N batch from the allocator once and dispenses
//! ids locally, re-requesting only when exhausted. Unused ids in a fetched
//! batch are abandoned on drop: bounded waste, traded for fewer allocator
//! round trips.

use crate::counter::CounterStore;

use super::RangeAllocator;

/// Dispenses single ids from locally buffered allocator batches.
pub struct IdBuffer<'a, C: CounterStore> {
    allocator: &'a RangeAllocator<C>,
    batch_size: i64,
    next: u64,
    end: u64,
}

impl<'a, C: CounterStore> IdBuffer<'a, C> {
    /// Creates an empty buffer; the first `next_id` call fetches a batch.
    ///
    /// # Arguments
    /// * `allocator` - The allocator to fetch batches from
    /// * `batch_size` - Ids per fetched batch, must be positive
    pub fn new(allocator: &'a RangeAllocator<C>, batch_size: i64) -> Self {
        Self {
            allocator,
            batch_size,
            next: 1,
            end: 0,
        }
    }

    /// Returns the next id, fetching a fresh batch when the buffer is empty.
    pub fn next_id(&mut self) -> crate::Result<u64> {
        if self.next > self.end {
            let range = self.allocator.allocate(self.batch_size)?;
            self.next = range.start;
            self.end = range.end;
        }

        let id = self.next;
        self.next += 1;
        Ok(id)
    }

    /// Ids still available without another allocator round trip.
    pub fn remaining(&self) -> u64 {
        if self.next > self.end {
            0
        } else {
            self.end - self.next + 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::RangeAllocator;
    use crate::counter::FileCounter;

    #[test]
    fn test_ids_are_sequential_within_batch() {
        let dir = tempfile::tempdir().unwrap();
        let counter = FileCounter::open(dir.path().join("counter.state")).unwrap();
        let allocator = RangeAllocator::open(counter).unwrap();

        let mut buffer = IdBuffer::new(&allocator, 10);
        assert_eq!(buffer.remaining(), 0);

        for expected in 1..=10 {
            assert_eq!(buffer.next_id().unwrap(), expected);
        }
        assert_eq!(buffer.remaining(), 0);
    }

    #[test]
    fn test_refetches_when_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let counter = FileCounter::open(dir.path().join("counter.state")).unwrap();
        let allocator = RangeAllocator::open(counter).unwrap();

        let mut buffer = IdBuffer::new(&allocator, 3);
        for expected in 1..=7 {
            assert_eq!(buffer.next_id().unwrap(), expected);
        }
        // Two batches consumed fully, third fetched and partially used
        assert_eq!(buffer.remaining(), 2);
        assert_eq!(allocator.high_water_mark().unwrap(), 9);
    }

    #[test]
    fn test_dropped_buffer_abandons_unused_ids() {
        let dir = tempfile::tempdir().unwrap();
        let counter = FileCounter::open(dir.path().join("counter.state")).unwrap();
        let allocator = RangeAllocator::open(counter).unwrap();

        {
            let mut buffer = IdBuffer::new(&allocator, 100);
            buffer.next_id().unwrap();
        }

        // A fresh buffer starts past the abandoned batch
        let mut buffer = IdBuffer::new(&allocator, 100);
        assert_eq!(buffer.next_id().unwrap(), 101);
    }
}

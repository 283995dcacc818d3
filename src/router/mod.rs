//! Partition routing for allocated ids.
//!
//! Two pure, stateless functions: deterministic partition selection by id,
//! and the threshold predicate that schedules pre-creation of the next
//! partition before the boundary-crossing insert needs it. No I/O, no shared
//! state.

/// Returns the canonical name of the partition at `index`.
pub fn partition_name(index: u64) -> String {
    format!("partition_{}", index)
}

/// Returns the 0-based index of the partition owning `id`.
///
/// Partition `k` owns ids `[k * capacity, (k + 1) * capacity - 1]`.
///
/// # Arguments
/// * `id` - The id to route
/// * `capacity` - Ids per partition, must be positive
pub fn partition_index(id: u64, capacity: u64) -> crate::Result<u64> {
    if capacity == 0 {
        return Err(crate::Error::InvalidInput(
            "partition capacity must be positive".to_string(),
        ));
    }
    Ok(id / capacity)
}

/// Returns the name of the partition owning `id`.
pub fn target_partition(id: u64, capacity: u64) -> crate::Result<String> {
    Ok(partition_name(partition_index(id, capacity)?))
}

/// Decides whether the partition after `id`'s should be pre-created.
///
/// Returns the next partition's index once `id` sits in the last 10% of its
/// partition, so creation (which performs I/O) runs as a background task
/// instead of on the boundary-crossing insert's critical path. If the
/// background creation loses the race, insert-time lazy creation still
/// succeeds: creation is idempotent.
pub fn preallocate_check(id: u64, capacity: u64) -> crate::Result<Option<u64>> {
    let index = partition_index(id, capacity)?;
    let position = id % capacity;

    // 90% threshold in integer math: ceil(9 * capacity / 10)
    let threshold = capacity - capacity / 10;

    if position >= threshold {
        Ok(Some(index + 1))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_partition_is_deterministic_and_monotonic() {
        assert_eq!(target_partition(1, 100).unwrap(), "partition_0");
        assert_eq!(target_partition(99, 100).unwrap(), "partition_0");
        assert_eq!(target_partition(100, 100).unwrap(), "partition_1");
        assert_eq!(target_partition(250, 100).unwrap(), "partition_2");
    }

    #[test]
    fn test_partition_index_default_capacity() {
        assert_eq!(partition_index(1, 1_000_000).unwrap(), 0);
        assert_eq!(partition_index(999_999, 1_000_000).unwrap(), 0);
        assert_eq!(partition_index(1_000_000, 1_000_000).unwrap(), 1);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(partition_index(1, 0).is_err());
        assert!(target_partition(1, 0).is_err());
        assert!(preallocate_check(1, 0).is_err());
    }

    #[test]
    fn test_preallocate_threshold() {
        assert_eq!(preallocate_check(89, 100).unwrap(), None);
        assert_eq!(preallocate_check(90, 100).unwrap(), Some(1));
        assert_eq!(preallocate_check(99, 100).unwrap(), Some(1));
        assert_eq!(preallocate_check(100, 100).unwrap(), None);
        assert_eq!(preallocate_check(199, 100).unwrap(), Some(2));
    }

    #[test]
    fn test_preallocate_threshold_rounds_up() {
        // capacity 15: 0.9 * 15 = 13.5, so position 13 is below threshold
        assert_eq!(preallocate_check(13, 15).unwrap(), None);
        assert_eq!(preallocate_check(14, 15).unwrap(), Some(1));
    }
}

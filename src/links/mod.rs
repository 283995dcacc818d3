//! Router + storage facade.
//!
//! The operations the request gateway calls: persist an (id, code, value)
//! mapping into the id's target partition, resolve a display code, and flush
//! everything at orderly shutdown. Lookup decodes the code back to an id and
//! queries only that id's partition; no scatter-gather across partitions.

use std::sync::Arc;
use std::thread;

use crate::config::StoreConfig;
use crate::store::PartitionStore;
use crate::{codes, router};

/// Partitioned link store: deterministic routing over the storage engine.
pub struct LinkStore {
    store: Arc<PartitionStore>,
    capacity: u64,
}

impl LinkStore {
    /// Opens the store under the configured root.
    pub fn open(config: &StoreConfig) -> crate::Result<Self> {
        Ok(Self {
            store: Arc::new(PartitionStore::open(config)?),
            capacity: config.partition_capacity,
        })
    }

    /// Persists one link record into `id`'s target partition.
    ///
    /// When `id` sits in the last 10% of its partition, creation of the next
    /// partition is kicked off on a best-effort background thread so the
    /// boundary-crossing insert finds it already there. If that task has not
    /// finished in time, the insert path creates the partition itself.
    ///
    /// # Returns
    /// The name of the partition the record landed in
    pub fn save_link(&self, id: u64, short_code: &str, original_value: &str) -> crate::Result<String> {
        let name = router::target_partition(id, self.capacity)?;
        self.store.insert(&name, id, short_code, original_value)?;

        if let Some(next_index) = router::preallocate_check(id, self.capacity)? {
            self.preallocate(next_index);
        }

        Ok(name)
    }

    fn preallocate(&self, index: u64) {
        let store = Arc::clone(&self.store);
        let name = router::partition_name(index);
        thread::spawn(move || {
            if let Err(err) = store.create_if_absent(&name) {
                tracing::warn!(partition = %name, error = %err, "background partition preallocation failed");
            }
        });
    }

    /// Resolves a display code to its original value.
    ///
    /// An undecodable code resolves to `None` like any unknown code: both
    /// mean "nothing to resolve", and callers treat absence as a normal
    /// negative result, not an error.
    pub fn resolve(&self, short_code: &str) -> crate::Result<Option<String>> {
        let id = match codes::decode_base62(short_code) {
            Ok(id) => id,
            Err(_) => return Ok(None),
        };

        let name = router::target_partition(id, self.capacity)?;
        self.store.lookup(&name, short_code)
    }

    /// Flushes every open partition. Best-effort shutdown hook: failures are
    /// logged and skipped, since an unflushed partition only pays replay
    /// time on the next open.
    pub fn checkpoint_all(&self) {
        for name in self.store.partition_names() {
            if let Err(err) = self.store.checkpoint(&name) {
                tracing::warn!(partition = %name, error = %err, "checkpoint failed");
            }
        }
    }

    /// Names of all partitions opened by this process, sorted.
    pub fn partition_names(&self) -> Vec<String> {
        self.store.partition_names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::encode_base62;
    use std::time::{Duration, Instant};

    fn links_in(dir: &tempfile::TempDir, capacity: u64) -> LinkStore {
        let config = StoreConfig::new(dir.path(), capacity).unwrap();
        LinkStore::open(&config).unwrap()
    }

    #[test]
    fn test_save_routes_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let links = links_in(&dir, 100);

        assert_eq!(links.save_link(1, "1", "https://a").unwrap(), "partition_0");
        assert_eq!(links.save_link(99, "1b", "https://b").unwrap(), "partition_0");
        assert_eq!(links.save_link(100, "1c", "https://c").unwrap(), "partition_1");
    }

    #[test]
    fn test_resolve_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let links = links_in(&dir, 100);

        let code = encode_base62(100);
        links.save_link(100, &code, "https://x").unwrap();

        assert_eq!(links.resolve(&code).unwrap(), Some("https://x".to_string()));
        assert_eq!(links.resolve("zzzz").unwrap(), None);
    }

    #[test]
    fn test_undecodable_code_resolves_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let links = links_in(&dir, 100);

        assert_eq!(links.resolve("not base62!").unwrap(), None);
        assert_eq!(links.resolve("").unwrap(), None);
    }

    #[test]
    fn test_threshold_preallocates_next_partition() {
        let dir = tempfile::tempdir().unwrap();
        let links = links_in(&dir, 100);

        links.save_link(90, &encode_base62(90), "https://x").unwrap();

        // Background thread; poll for the file instead of sleeping blindly
        let next = dir.path().join("partition_1.redb");
        let deadline = Instant::now() + Duration::from_secs(5);
        while !next.exists() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(next.exists(), "partition_1 was not preallocated");
    }

    #[test]
    fn test_checkpoint_all_runs() {
        let dir = tempfile::tempdir().unwrap();
        let links = links_in(&dir, 100);

        links.save_link(1, "1", "https://a").unwrap();
        links.save_link(100, "1c", "https://b").unwrap();
        links.checkpoint_all();

        assert_eq!(
            links.partition_names(),
            vec!["partition_0".to_string(), "partition_1".to_string()]
        );
    }
}

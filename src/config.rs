//! Configuration for the partitioned link store.
//!
//! Contains the validated configuration structure plus the environment
//! surface consumed at process startup.

use std::env;
use std::path::PathBuf;

use crate::retry::RetryPolicy;

/// Default partition capacity (`L`): ids per partition.
pub const DEFAULT_PARTITION_CAPACITY: u64 = 1_000_000;

/// Environment variable overriding the partition capacity.
pub const PARTITION_CAPACITY_ENV: &str = "PARTITION_CAPACITY";

/// Environment variable pointing at the storage root directory.
pub const STORAGE_ROOT_ENV: &str = "STORAGE_ROOT";

/// Configuration for the partitioned link store.
///
/// Defines how ids map onto partitions and where partition files and the
/// counter state live on disk.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Number of ids owned by each partition (`L`)
    ///
    /// Partition `k` owns the id range `[k*L, (k+1)*L - 1]`. Must be positive.
    pub partition_capacity: u64,

    /// Root directory holding partition files and the counter state
    pub root: PathBuf,

    /// Whether every insert commit is individually fsynced
    ///
    /// The default is deferred durability: inserts commit without fsync and
    /// `checkpoint` makes them durable in one flush. Set to true to pay one
    /// fsync per insert instead.
    pub durable_writes: bool,

    /// Retry policy applied to transient storage failures
    pub retry: RetryPolicy,
}

impl StoreConfig {
    /// Creates a validated configuration.
    ///
    /// # Arguments
    /// * `root` - Storage root directory
    /// * `partition_capacity` - Ids per partition, must be positive
    ///
    /// # Returns
    /// Validated configuration or error
    pub fn new(root: impl Into<PathBuf>, partition_capacity: u64) -> crate::Result<Self> {
        if partition_capacity == 0 {
            return Err(crate::Error::InvalidInput(
                "partition capacity must be positive".to_string(),
            ));
        }

        Ok(Self {
            partition_capacity,
            root: root.into(),
            durable_writes: false,
            retry: RetryPolicy::default(),
        })
    }

    /// Builds a configuration from the process environment.
    ///
    /// Reads `PARTITION_CAPACITY` (default 1,000,000) and `STORAGE_ROOT`
    /// (default `data`). An unparsable capacity is a startup fault.
    pub fn from_env() -> crate::Result<Self> {
        let capacity = match env::var(PARTITION_CAPACITY_ENV) {
            Ok(raw) => raw.parse().map_err(|_| {
                crate::Error::InvalidInput(format!(
                    "{} must be a positive integer, got {:?}",
                    PARTITION_CAPACITY_ENV, raw
                ))
            })?,
            Err(_) => DEFAULT_PARTITION_CAPACITY,
        };

        let root = env::var(STORAGE_ROOT_ENV).unwrap_or_else(|_| "data".to_string());

        Self::new(root, capacity)
    }

    /// Sets the per-insert durability mode.
    pub fn with_durable_writes(mut self, durable_writes: bool) -> Self {
        self.durable_writes = durable_writes;
        self
    }

    /// Replaces the retry policy for transient storage failures.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Path of the durable counter state file under the storage root.
    pub fn counter_path(&self) -> PathBuf {
        self.root.join("counter.state")
    }
}

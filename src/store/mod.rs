//! Per-partition storage engine.
//!
//! Manages one embedded redb database per partition file and owns the
//! engine's concurrency rules: idempotent serialized creation, one writer at
//! a time per partition, lock-free snapshot reads, bounded retry of
//! transient backend errors, and an explicit durability checkpoint.
//!
//! Per partition the lifecycle is ABSENT, INITIALIZING, READY: absent from
//! the handle map, being created under the map's write lock, or present in
//! the map. READY is terminal for the process lifetime.

pub mod record;

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use redb::{Database, Durability, ReadableDatabase, TableDefinition};
use thiserror::Error;

use crate::config::StoreConfig;
use crate::retry::{RetryPolicy, Transient};

pub use record::LinkRecord;

/// Primary table: allocator-issued id to link record.
const LINKS_TABLE: TableDefinition<u64, LinkRecord> = TableDefinition::new("links");

/// Unique index: display code to id.
const CODES_TABLE: TableDefinition<&str, u64> = TableDefinition::new("codes");

/// Errors from the partition storage engine.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The id or short code already exists in the partition. Never retried:
    /// retrying cannot change the outcome. The existing record is untouched.
    #[error("duplicate key in {partition}: id {id} / code {code:?} already present")]
    DuplicateKey {
        partition: String,
        id: u64,
        code: String,
    },

    /// Creating the partition file or its schema failed
    #[error("failed to create partition {partition}: {reason}")]
    CreateFailed { partition: String, reason: String },

    /// A write failed after exhausting the bounded retry budget
    #[error("write to {partition} failed after {attempts} attempts: {reason}")]
    WriteFailed {
        partition: String,
        attempts: u32,
        reason: String,
    },

    /// A checkpoint flush failed; affects recovery time, not correctness
    #[error("checkpoint of {partition} failed: {reason}")]
    CheckpointFailed { partition: String, reason: String },

    /// Transient backend error from the underlying store
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl Transient for StoreError {
    fn is_transient(&self) -> bool {
        matches!(self, StoreError::Backend(_))
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(err: redb::TransactionError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<redb::TableError> for StoreError {
    fn from(err: redb::TableError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(err: redb::StorageError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(err: redb::CommitError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<redb::SetDurabilityError> for StoreError {
    fn from(err: redb::SetDurabilityError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// One open partition: its database plus the process-local write token.
struct Partition {
    db: Database,
    write_lock: Mutex<()>,
}

/// Storage engine over a directory of partition files.
///
/// Partition files are named `<name>.redb` under the storage root, are
/// created lazily, and are never merged, split or deleted by this engine.
pub struct PartitionStore {
    root: PathBuf,
    durable_writes: bool,
    retry: RetryPolicy,
    partitions: RwLock<HashMap<String, Arc<Partition>>>,
}

impl PartitionStore {
    /// Opens the engine over the configured storage root, creating the
    /// directory if needed. Existing partition files are reopened lazily on
    /// first access.
    pub fn open(config: &StoreConfig) -> crate::Result<Self> {
        fs::create_dir_all(&config.root).map_err(|err| StoreError::CreateFailed {
            partition: config.root.display().to_string(),
            reason: err.to_string(),
        })?;

        Ok(Self {
            root: config.root.clone(),
            durable_writes: config.durable_writes,
            retry: config.retry.clone(),
            partitions: RwLock::new(HashMap::new()),
        })
    }

    fn partition_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.redb", name))
    }

    fn get(&self, name: &str) -> Option<Arc<Partition>> {
        self.partitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Ensures the named partition exists and is ready.
    ///
    /// Idempotent: an already-open partition returns immediately without
    /// being modified. Concurrent calls for the same not-yet-existing name
    /// are serialized through the handle map's write lock, so they cannot
    /// race to corrupt the file. The schema commit is fsynced so no later
    /// deferred-durability write can land in a file without the tables.
    pub fn create_if_absent(&self, name: &str) -> crate::Result<()> {
        if self.get(name).is_some() {
            return Ok(());
        }

        let mut partitions = self
            .partitions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if partitions.contains_key(name) {
            // Lost the creation race; the winner already made it ready
            return Ok(());
        }

        let create_failed = |reason: String| StoreError::CreateFailed {
            partition: name.to_string(),
            reason,
        };

        let path = self.partition_path(name);
        let existed = path.exists();

        // Database::create opens the file if it already exists on disk
        let db = Database::create(&path).map_err(|e| create_failed(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| create_failed(e.to_string()))?;
        {
            txn.open_table(LINKS_TABLE)
                .map_err(|e| create_failed(e.to_string()))?;
            txn.open_table(CODES_TABLE)
                .map_err(|e| create_failed(e.to_string()))?;
        }
        txn.commit().map_err(|e| create_failed(e.to_string()))?;

        if !existed {
            tracing::info!(partition = name, "created partition");
        }

        partitions.insert(
            name.to_string(),
            Arc::new(Partition {
                db,
                write_lock: Mutex::new(()),
            }),
        );
        Ok(())
    }

    /// Writes one link record into the named partition.
    ///
    /// Creates the partition lazily if the background preallocation has not
    /// run yet. All writes to one partition are serialized through its write
    /// mutex; writers to different partitions never block each other.
    /// Transient backend errors are retried with jittered backoff before
    /// surfacing as `WriteFailed`; duplicate ids or codes fail immediately
    /// with `DuplicateKey` and leave the existing record unchanged.
    pub fn insert(
        &self,
        name: &str,
        id: u64,
        short_code: &str,
        original_value: &str,
    ) -> crate::Result<()> {
        self.create_if_absent(name)?;
        let partition = self.get(name).ok_or_else(|| {
            StoreError::Backend(format!("partition {} missing after creation", name))
        })?;

        let _writer = partition
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let result = self
            .retry
            .run(|| self.try_insert(&partition, name, id, short_code, original_value));

        match result {
            Ok(()) => Ok(()),
            Err(err) if err.is_transient() => {
                tracing::error!(partition = name, id, error = %err, "write retries exhausted");
                Err(StoreError::WriteFailed {
                    partition: name.to_string(),
                    attempts: self.retry.max_attempts,
                    reason: err.to_string(),
                }
                .into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// One insert attempt inside its own write transaction. Returning early
    /// drops the transaction, which aborts it: a detected duplicate leaves
    /// nothing behind, including the probe insert itself.
    fn try_insert(
        &self,
        partition: &Partition,
        name: &str,
        id: u64,
        short_code: &str,
        original_value: &str,
    ) -> Result<(), StoreError> {
        let mut txn = partition.db.begin_write()?;
        if !self.durable_writes {
            // Deferred durability: no fsync per insert, folded in by the
            // next checkpoint. Readers still get consistent snapshots.
            txn.set_durability(Durability::None)?;
        }

        {
            let mut links = txn.open_table(LINKS_TABLE)?;
            let mut codes = txn.open_table(CODES_TABLE)?;

            let duplicate = || StoreError::DuplicateKey {
                partition: name.to_string(),
                id,
                code: short_code.to_string(),
            };

            let record = LinkRecord::new(id, short_code, original_value);
            if links.insert(id, &record)?.is_some() {
                return Err(duplicate());
            }
            if codes.insert(short_code, id)?.is_some() {
                return Err(duplicate());
            }
        }

        txn.commit()?;
        Ok(())
    }

    /// Resolves a display code inside the named partition.
    ///
    /// The read path takes no write lock: it reads a point-in-time snapshot
    /// concurrent with any in-flight writer. Returns `None` both when the
    /// partition does not exist and when the code is absent; callers cannot
    /// distinguish the two from this call, and both mean "nothing to
    /// resolve".
    pub fn lookup(&self, name: &str, short_code: &str) -> crate::Result<Option<String>> {
        let partition = match self.get(name) {
            Some(partition) => partition,
            None => match self.open_existing(name)? {
                Some(partition) => partition,
                None => return Ok(None),
            },
        };

        let txn = partition.db.begin_read().map_err(StoreError::from)?;
        let codes = match txn.open_table(CODES_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(err) => return Err(StoreError::from(err).into()),
        };

        let id = match codes.get(short_code).map_err(StoreError::from)? {
            Some(guard) => guard.value(),
            None => return Ok(None),
        };

        let links = txn.open_table(LINKS_TABLE).map_err(StoreError::from)?;
        Ok(links
            .get(id)
            .map_err(StoreError::from)?
            .map(|guard| guard.value().original_value))
    }

    /// Reopens a partition file left behind by an earlier run, if present.
    fn open_existing(&self, name: &str) -> crate::Result<Option<Arc<Partition>>> {
        if !self.partition_path(name).exists() {
            return Ok(None);
        }
        self.create_if_absent(name)?;
        Ok(self.get(name))
    }

    /// Folds deferred commits of the named partition into durable storage.
    ///
    /// Best-effort, intended for orderly shutdown: an empty
    /// immediate-durability commit persists every earlier deferred commit.
    /// A partition that was never opened has nothing to flush.
    pub fn checkpoint(&self, name: &str) -> crate::Result<()> {
        let partition = match self.get(name) {
            Some(partition) => partition,
            None => return Ok(()),
        };

        let _writer = partition
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let checkpoint_failed = |reason: String| StoreError::CheckpointFailed {
            partition: name.to_string(),
            reason,
        };

        let mut txn = partition
            .db
            .begin_write()
            .map_err(|e| checkpoint_failed(e.to_string()))?;
        txn.set_durability(Durability::Immediate)
            .map_err(|e| checkpoint_failed(e.to_string()))?;
        txn.commit().map_err(|e| checkpoint_failed(e.to_string()))?;
        Ok(())
    }

    /// Names of all partitions opened by this process, sorted.
    pub fn partition_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .partitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

//! Durable high-water-mark counter.
//!
//! A single persisted integer: the highest id ever allocated. The counter is
//! the allocator's sole source of truth and is only mutated inside the
//! allocator's critical section, so it provides durability per write, not
//! concurrency control.

use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from counter persistence.
#[derive(Debug, Error)]
pub enum CounterError {
    /// Reading the state file failed for a reason other than absence
    #[error("failed to read counter state: {0}")]
    ReadFailed(#[source] std::io::Error),

    /// Persisting a new high-water mark failed
    #[error("failed to persist counter state: {0}")]
    WriteFailed(#[source] std::io::Error),

    /// The state file exists but does not hold a decimal integer.
    /// Unrecoverable without operator intervention.
    #[error("counter state is corrupt: {0:?}")]
    Corrupt(String),
}

/// Storage seam for the allocator's high-water mark.
///
/// The file-backed implementation below assumes a single live allocator
/// instance; a distributed backend (e.g. a consensus-backed counter) can be
/// swapped in without changing the allocator's contract.
pub trait CounterStore: Send {
    /// Returns the last durably stored value, or 0 if no state exists yet.
    fn read(&self) -> Result<u64, CounterError>;

    /// Durably replaces the stored value. Must not return before the new
    /// value is persisted.
    fn write(&mut self, value: u64) -> Result<(), CounterError>;
}

/// File-backed counter: one decimal integer in a text file.
#[derive(Debug)]
pub struct FileCounter {
    path: PathBuf,
}

impl FileCounter {
    /// Opens a counter backed by the given file, creating parent directories.
    /// The file itself is created lazily on the first write; until then reads
    /// return 0.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CounterError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(CounterError::WriteFailed)?;
            }
        }
        Ok(Self { path })
    }

    /// Returns the state file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CounterStore for FileCounter {
    fn read(&self) -> Result<u64, CounterError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(CounterError::ReadFailed(err)),
        };

        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(0);
        }

        trimmed
            .parse()
            .map_err(|_| CounterError::Corrupt(trimmed.to_string()))
    }

    fn write(&mut self, value: u64) -> Result<(), CounterError> {
        // Whole-value replace: write a sibling file, fsync, then rename over
        // the old state so a crash never leaves a partial record behind.
        let staging = self.path.with_extension("tmp");
        let mut file = File::create(&staging).map_err(CounterError::WriteFailed)?;
        file.write_all(value.to_string().as_bytes())
            .map_err(CounterError::WriteFailed)?;
        file.sync_all().map_err(CounterError::WriteFailed)?;
        fs::rename(&staging, &self.path).map_err(CounterError::WriteFailed)?;
        Ok(())
    }
}

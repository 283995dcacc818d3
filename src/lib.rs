//! Partitioned durable link storage with monotonic id range allocation.
//!
//! Three tightly coupled pieces: a centralized allocator handing out
//! disjoint, contiguous id ranges backed by a durable counter; a pure router
//! mapping each id to its partition and deciding when to pre-create the next
//! one; and a per-partition storage engine on redb with serialized writes,
//! bounded retry, and an explicit durability checkpoint. [`LinkStore`] is
//! the facade a request gateway persists and resolves links through.

pub mod allocator;
pub mod codes;
pub mod config;
pub mod counter;
pub mod error;
pub mod links;
pub mod retry;
pub mod router;
pub mod store;

// Re-export common types for convenience
pub use allocator::{IdBuffer, IdRange, RangeAllocator};
pub use config::StoreConfig;
pub use counter::FileCounter;
pub use error::{Error, Result};
pub use links::LinkStore;

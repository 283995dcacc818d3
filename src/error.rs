//! Crate-scoped error handling for linkshard.
//!
//! This module provides a unified error type for public APIs while maintaining
//! precise error information for the individual layers.

use std::fmt;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type exposed to users of the crate.
///
/// Wraps the layer-specific error types so callers can match on the layer
/// that failed while the facade keeps a single error surface.
#[derive(Debug)]
pub enum Error {
    /// Errors from the durable counter (high-water-mark persistence)
    Counter(crate::counter::CounterError),

    /// Errors from the id range allocator
    Allocator(crate::allocator::AllocatorError),

    /// Errors from the partition storage engine
    Store(crate::store::StoreError),

    /// Invalid input parameters
    InvalidInput(String),
}

impl From<crate::counter::CounterError> for Error {
    fn from(err: crate::counter::CounterError) -> Self {
        Error::Counter(err)
    }
}

impl From<crate::allocator::AllocatorError> for Error {
    fn from(err: crate::allocator::AllocatorError) -> Self {
        Error::Allocator(err)
    }
}

impl From<crate::store::StoreError> for Error {
    fn from(err: crate::store::StoreError) -> Self {
        Error::Store(err)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Counter(err) => Some(err),
            Error::Allocator(err) => Some(err),
            Error::Store(err) => Some(err),
            Error::InvalidInput(_) => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Counter(err) => write!(f, "Counter error: {}", err),
            Error::Allocator(err) => write!(f, "Allocator error: {}", err),
            Error::Store(err) => write!(f, "Store error: {}", err),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

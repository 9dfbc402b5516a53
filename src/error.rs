//! Library error type.
//!
//! Failures are few and local: construction can fail when an element id does
//! not resolve, and unsubscribing can fail when a token is stale.  Everything
//! else (zero scroll travel, redundant teardown) is handled as a guard, not
//! an error.

use thiserror::Error;

/// Errors surfaced at the construction and subscribe/unsubscribe boundaries.
#[derive(Debug, Error)]
pub enum Error {
    /// An element id passed to [`crate::ScrollBar::create`] does not resolve
    /// in the host's element tree.  Fatal at construction time.
    #[error("element id `{id}` does not resolve in the host tree")]
    ElementNotFound { id: String },

    /// An unsubscribe was attempted with a token that is not registered
    /// (already removed, or minted by a different bridge).  Teardown paths
    /// treat this as a best-effort diagnostic.
    #[error("no registered handler matches the given token")]
    HandlerNotFound,
}

pub type Result<T> = std::result::Result<T, Error>;

//! Persistence for add-on requests.
//!
//! A store keeps one record per [`RequestId`]. Writes after creation go through
//! [`RequestStore::compare_and_swap`], which only succeeds when the stored status still equals
//! the status the caller read. Since every transition changes the status, this is enough to
//! make check-then-write atomic per record.

mod file;
mod memory;

pub use file::FileRequestStore;
pub use memory::MemoryRequestStore;

use crate::error::StoreResult;
use crate::ids::RequestId;
use crate::request::{AddOnRequest, RequestStatus};

/// Storage collaborator for the lifecycle service.
pub trait RequestStore: Send + Sync {
    /// Persists a new record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::AlreadyExists`] if the id is taken.
    fn insert(&self, request: &AddOnRequest) -> StoreResult<()>;

    /// Returns the stored record, if any.
    fn get(&self, id: RequestId) -> StoreResult<Option<AddOnRequest>>;

    /// Replaces the stored record only if its status is still `expected`.
    ///
    /// # Errors
    ///
    /// - [`crate::StoreError::Conflict`] if the stored status differs from `expected`.
    /// - [`crate::StoreError::Missing`] if no record exists for the id.
    fn compare_and_swap(&self, expected: RequestStatus, next: &AddOnRequest) -> StoreResult<()>;

    /// Snapshot of every stored record, in no particular order.
    fn list(&self) -> StoreResult<Vec<AddOnRequest>>;
}

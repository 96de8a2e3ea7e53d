//! Error types for the add-on request core.
//!
//! Every failure in this crate is returned as a value. A failed operation never leaves a
//! stored request partially modified.

use crate::ids::RequestId;
use crate::request::RequestStatus;

/// Errors returned by lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Missing or invalid input. The caller must correct the input; retrying is pointless.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The action is not legal from the request's current status.
    #[error("cannot {action} request {id} while it is {from}")]
    InvalidTransition {
        id: RequestId,
        from: RequestStatus,
        action: &'static str,
    },

    #[error("request {0} not found")]
    NotFound(RequestId),

    /// Lost a compare-and-swap race. Safe to retry once with fresh state.
    #[error("request {0} was modified concurrently")]
    ConcurrencyConflict(RequestId),

    /// The caller's role does not grant the capability required for the operation.
    #[error("{role} is not permitted to {capability}")]
    Forbidden {
        role: crate::access::Role,
        capability: crate::access::Capability,
    },

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("ward directory error: {0}")]
    Directory(#[from] DirectoryError),
}

impl LifecycleError {
    /// Short, stable name of the error kind, used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleError::Validation(_) => "validation_error",
            LifecycleError::InvalidTransition { .. } => "invalid_transition",
            LifecycleError::NotFound(_) => "not_found",
            LifecycleError::ConcurrencyConflict(_) => "concurrency_conflict",
            LifecycleError::Forbidden { .. } => "forbidden",
            LifecycleError::Storage(_) => "storage_error",
            LifecycleError::Directory(_) => "directory_error",
        }
    }
}

pub type LifecycleResult<T> = std::result::Result<T, LifecycleError>;

/// Errors raised by [`crate::store::RequestStore`] implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The stored status no longer matches the expected prior status.
    #[error("stored status is {current}, expected {expected}")]
    Conflict {
        expected: RequestStatus,
        current: RequestStatus,
    },
    #[error("request {0} already exists")]
    AlreadyExists(RequestId),
    #[error("request {0} not found in store")]
    Missing(RequestId),
    #[error("failed to create request directory: {0}")]
    DirCreation(std::io::Error),
    #[error("failed to write request file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read request file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize request: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize request: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("stored request is inconsistent: {0}")]
    Corrupt(String),
    #[error("failed to lock request record: {0}")]
    Lock(std::io::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised while loading or saving the ward directory.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("failed to read ward directory file: {0}")]
    FileRead(std::io::Error),
    #[error("ward directory schema mismatch at {path}: {message}")]
    Schema { path: String, message: String },
    #[error("duplicate ward id {0}")]
    DuplicateWard(u32),
    #[error("duplicate room id {0}")]
    DuplicateRoom(u32),
    #[error("invalid ward directory entry: {0}")]
    InvalidEntry(String),
    #[error("failed to write ward directory file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize ward directory: {0}")]
    YamlSerialization(serde_yaml::Error),
}

/// Errors raised while resolving configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

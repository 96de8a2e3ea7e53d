//! # Ward/Lab Core
//!
//! Core business logic for add-on laboratory test requests.
//!
//! This crate contains:
//! - The add-on request state machine (`pending → approved → completed`, `pending → rejected`)
//! - The lifecycle service that applies transitions atomically against a store
//! - In-memory and sharded-YAML request stores
//! - A ward/room directory used to validate request locations, maintained by administrators
//! - Role/capability policy for boundary layers
//! - Read-side analytics over stored requests
//!
//! **No API concerns**: HTTP servers, wire types, and API-key checks belong in `api-rest` and
//! `api-shared`.

pub mod access;
pub mod analytics;
pub mod config;
pub mod constants;
pub mod directory;
pub mod error;
pub mod ids;
pub mod lifecycle;
pub mod request;
pub mod store;
pub mod validation;

pub use access::{Caller, Capability, Role};
pub use config::CoreConfig;
pub use directory::{
    NurseContact, Room, RoomEdit, ShiftType, Ward, WardDirectory, YamlWardDirectory,
};
pub use error::{
    ConfigError, ConfigResult, DirectoryError, LifecycleError, LifecycleResult, StoreError,
    StoreResult,
};
pub use ids::{RequestId, RoomId, WardId};
pub use lifecycle::{Clock, LifecycleService, ListFilter, RequestList, StatusFilter};
pub use request::{
    AddOnRequest, ApprovalAction, AuditAction, AuditEntry, RequestDraft, RequestStatus,
};
pub use store::{FileRequestStore, MemoryRequestStore, RequestStore};
pub use validation::NonEmptyText;

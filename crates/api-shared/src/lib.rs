//! # API Shared
//!
//! Shared utilities and definitions for the ward/lab APIs.
//!
//! Contains:
//! - JSON request/response types with OpenAPI schemas (`wire` module)
//! - Shared services like `HealthService`
//! - API-key and caller-header definitions
//!
//! Used by `api-rest` and by anything else that speaks the same wire format.

pub mod auth;
pub mod health;
pub mod wire;

pub use auth::AuthError;
pub use health::HealthService;
pub use wire::*;

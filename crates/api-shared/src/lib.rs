//! # API Shared
//!
//! Shared utilities and definitions for the HIS APIs.
//!
//! Contains:
//! - Request and response types (`dto` module), with OpenAPI schemas
//! - Shared services like `HealthService`
//! - Credential parsing for HTTP Basic authentication
//!
//! Used by `api-rest` and the `his-run` binary.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{parse_basic_authorization, BasicCredentials, CredentialsError};
pub use dto::*;
pub use health::HealthService;

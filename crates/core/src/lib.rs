//! # HIS Core
//!
//! Core business logic for the hospital information system.
//!
//! This crate contains the data model and everything that operates on it:
//! - Records (accounts, departments, rooms, patients, cases, acts, orders, reports) stored as
//!   YAML files in a sharded directory layout
//! - A git repository over the data directory, with one commit per mutation
//! - Password hashing, role-based permissions and the services that apply them
//!
//! **No API concerns**: HTTP servers, the interactive shell and credential parsing belong in
//! `api-rest`, `cli` and `api-shared`.

#[macro_use]
pub mod models;

pub mod author;
pub mod config;
pub mod constants;
pub mod error;
pub mod password;
pub mod permissions;
pub mod seed;
pub mod services;
pub mod store;
pub mod versioned_files;

#[cfg(test)]
mod testing;

pub use author::Author;
pub use config::CoreConfig;
pub use error::{HisError, HisResult};
pub use services::HisServices;
pub use store::Store;

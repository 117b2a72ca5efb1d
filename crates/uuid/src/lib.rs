//! Record identifiers and sharded-path utilities.
//!
//! Every HIS record (accounts, patients, cases, orders, ...) is stored under a sharded directory
//! derived from its identifier.
//!
//! To keep path derivation deterministic, HIS uses a *canonical* UUID representation for storage
//! identifiers: **32 lowercase hexadecimal characters** (no hyphens).
//!
//! ## Canonical UUID form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Non-canonical values (uppercase, hyphenated, wrong length, non-hex) are rejected by
//! [`ShardableUuid::parse`]. Operators typing identifiers at a terminal may use a short prefix
//! instead; [`ShardableUuid::is_prefix`] validates such input and
//! [`ShardableUuid::starts_with`] matches it.
//!
//! ## Sharded directory layout
//! For a canonical UUID `u`, records are stored under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `his_data/cases/55/0e/550e8400e29b41d4a716446655440000/`

mod shardable;

pub use shardable::{ShardableUuid, Uuid};

/// Error type for UUID operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for UUID operations.
pub type UuidResult<T> = Result<T, UuidError>;

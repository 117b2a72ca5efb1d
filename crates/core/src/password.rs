//! Salted PBKDF2-HMAC-SHA256 password hashes.
//!
//! A stored hash carries its own iteration count, so raising [`PBKDF2_ITERATIONS`] later does
//! not invalidate existing accounts.

use crate::constants::{PASSWORD_HASH_LEN, PASSWORD_SALT_LEN, PBKDF2_ITERATIONS};
use crate::error::{HisError, HisResult};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;

#[cfg(not(test))]
const NEW_HASH_ITERATIONS: u32 = PBKDF2_ITERATIONS;
// Unit tests create many accounts.
#[cfg(test)]
const NEW_HASH_ITERATIONS: u32 = 1_000;

/// A derived password key with its salt, both hex encoded.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHash {
    iterations: u32,
    salt: String,
    hash: String,
}

impl PasswordHash {
    /// Hashes `password` with a fresh random salt.
    pub fn new(password: &str) -> HisResult<Self> {
        if password.is_empty() {
            return Err(HisError::InvalidInput("password must not be empty".into()));
        }
        let mut salt = [0u8; PASSWORD_SALT_LEN];
        rand::rngs::OsRng.fill_bytes(&mut salt);

        let key = derive(NEW_HASH_ITERATIONS, &salt, password);

        Ok(Self {
            iterations: NEW_HASH_ITERATIONS,
            salt: hex::encode(salt),
            hash: hex::encode(key),
        })
    }

    /// Returns true if `password` produces the stored key.
    ///
    /// # Errors
    ///
    /// Returns `HisError::InvalidPasswordHash` if the stored fields are not valid hex or the
    /// iteration count is zero.
    pub fn verify(&self, password: &str) -> HisResult<bool> {
        if self.iterations == 0 {
            return Err(HisError::InvalidPasswordHash);
        }
        let salt = hex::decode(&self.salt).map_err(|_| HisError::InvalidPasswordHash)?;
        let stored = hex::decode(&self.hash).map_err(|_| HisError::InvalidPasswordHash)?;
        if stored.len() != PASSWORD_HASH_LEN {
            return Err(HisError::InvalidPasswordHash);
        }

        let computed = derive(self.iterations, &salt, password);
        Ok(constant_time_eq(&computed, &stored))
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Derives a key for `password` and throws it away, so a login for an unknown user costs
    /// as much as one for a known user.
    pub fn verify_without_account(password: &str) {
        let salt = [0u8; PASSWORD_SALT_LEN];
        std::hint::black_box(derive(NEW_HASH_ITERATIONS, &salt, password));
    }
}

// Never print key material.
impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHash")
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

fn derive(iterations: u32, salt: &[u8], password: &str) -> [u8; PASSWORD_HASH_LEN] {
    let mut key = [0u8; PASSWORD_HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

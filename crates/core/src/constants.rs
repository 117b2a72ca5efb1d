//! Constants used throughout the HIS core crate.
//!
//! Path and filename constants live here so the on-disk layout is defined in one place.

/// Default directory for record storage when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "his_data";

/// Care location recorded in commits when none is configured.
pub const DEFAULT_CARE_LOCATION: &str = "General Hospital";

/// Directory names, one per record kind.
pub const ACCOUNTS_DIR_NAME: &str = "accounts";
pub const DOCTOR_QUALIFICATIONS_DIR_NAME: &str = "doctor_qualifications";
pub const DEPARTMENTS_DIR_NAME: &str = "departments";
pub const DEPARTMENT_QUALIFICATIONS_DIR_NAME: &str = "department_qualifications";
pub const ROOMS_DIR_NAME: &str = "rooms";
pub const PATIENTS_DIR_NAME: &str = "patients";
pub const CASES_DIR_NAME: &str = "cases";
pub const ACTS_DIR_NAME: &str = "acts";
pub const ORDERS_DIR_NAME: &str = "orders";
pub const REPORTS_DIR_NAME: &str = "reports";

/// Filename of the `.gitignore` written when the store is initialised.
pub const GITIGNORE_FILENAME: &str = ".gitignore";

/// Default `.gitignore` contents for a new store.
pub const DEFAULT_GITIGNORE: &str = ".DS_Store\n*.tmp\n*.swp\n";

/// Mail domain used for git signatures; accounts without an email address get
/// `<username>@` this domain.
pub const COMMIT_EMAIL_DOMAIN: &str = "his.local";

/// PBKDF2-HMAC-SHA256 parameters for stored passwords.
pub const PBKDF2_ITERATIONS: u32 = 100_000;
pub const PASSWORD_SALT_LEN: usize = 64;
pub const PASSWORD_HASH_LEN: usize = 128;

/// Field limits.
pub const USERNAME_MAX_LEN: usize = 33;
pub const NAME_MAX_LEN: usize = 32;
pub const ADDRESS_FIELD_MAX_LEN: usize = 64;
pub const ZIP_CODE_MAX_LEN: usize = 5;
pub const DEPARTMENT_NAME_MAX_LEN: usize = 64;
pub const ROOM_NAME_MAX_LEN: usize = 64;

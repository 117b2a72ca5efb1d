//! Record types persisted by the store.
//!
//! Each record kind is one YAML file per record in a sharded directory; the [`Record`] trait
//! names the directory and file for a kind.

use his_uuid::ShardableUuid;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Declares a fieldless enum stored, displayed and parsed by `code`, with a human `label`.
macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($what:literal) {
            $($(#[$vmeta:meta])* $variant:ident => $code:literal, $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize,
            serde::Deserialize,
        )]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $code)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub const fn code(self) -> &'static str {
                match self {
                    $(Self::$variant => $code),+
                }
            }

            pub const fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.code())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::HisError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let code = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.code() == code)
                    .ok_or_else(|| {
                        crate::error::HisError::InvalidInput(format!(
                            "unknown {}: '{}' (expected one of: {})",
                            $what,
                            code,
                            Self::ALL.iter().map(|v| v.code()).collect::<Vec<_>>().join(", ")
                        ))
                    })
            }
        }
    };
}

/// A record kind with its own directory in the store.
pub trait Record: Serialize + DeserializeOwned {
    /// Singular name used in errors and logs, e.g. `"patient"`.
    const KIND: &'static str;
    /// Top-level directory under the data dir.
    const DIR_NAME: &'static str;
    /// File holding the record inside its sharded directory.
    const FILE_NAME: &'static str;

    fn id(&self) -> &ShardableUuid;
}

/// Implements [`Record`] for types with an `id: ShardableUuid` field.
macro_rules! impl_record {
    ($ty:ty, $kind:literal, $dir:expr) => {
        impl crate::models::Record for $ty {
            const KIND: &'static str = $kind;
            const DIR_NAME: &'static str = $dir;
            const FILE_NAME: &'static str = concat!($kind, ".yaml");

            fn id(&self) -> &his_uuid::ShardableUuid {
                &self.id
            }
        }
    };
}

pub mod accounts;
pub mod common;
pub mod medical;
pub mod objects;
pub mod staging;
pub mod tasks;

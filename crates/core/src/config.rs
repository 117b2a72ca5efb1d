//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the record store and
//! services. Request handling never reads process-wide environment variables, which keeps
//! behaviour consistent in multi-threaded runtimes and test harnesses.

use crate::constants::{DEFAULT_CARE_LOCATION, DEFAULT_DATA_DIR};
use crate::{HisError, HisResult};
use his_types::NonEmptyText;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    care_location: NonEmptyText,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `HisError::InvalidInput` if `data_dir` exists but is not a directory, and
    /// `HisError::InvalidCareLocation` if the care location spans several lines.
    pub fn new(data_dir: PathBuf, care_location: NonEmptyText) -> HisResult<Self> {
        if data_dir.exists() && !data_dir.is_dir() {
            return Err(HisError::InvalidInput(format!(
                "data directory is not a directory: {}",
                data_dir.display()
            )));
        }
        if care_location.as_str().contains(['\n', '\r']) {
            return Err(HisError::InvalidCareLocation);
        }

        Ok(Self {
            data_dir,
            care_location,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding all records of one kind.
    pub fn record_dir(&self, dir_name: &str) -> PathBuf {
        self.data_dir.join(dir_name)
    }

    pub fn care_location(&self) -> &NonEmptyText {
        &self.care_location
    }
}

/// Resolve the data directory from an optional environment value.
///
/// Blank values fall back to [`DEFAULT_DATA_DIR`].
pub fn data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Resolve the care location from an optional environment value.
///
/// Blank values fall back to [`DEFAULT_CARE_LOCATION`].
pub fn care_location_from_env_value(value: Option<String>) -> HisResult<NonEmptyText> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_CARE_LOCATION.to_string());
    if value.contains(['\n', '\r']) {
        return Err(HisError::InvalidCareLocation);
    }
    NonEmptyText::new(value).map_err(|_| HisError::MissingCareLocation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn blank_env_values_use_defaults() {
        assert_eq!(
            data_dir_from_env_value(Some("  ".into())),
            PathBuf::from(DEFAULT_DATA_DIR)
        );
        assert_eq!(data_dir_from_env_value(None), PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(
            care_location_from_env_value(None).unwrap().as_str(),
            DEFAULT_CARE_LOCATION
        );
    }

    #[test]
    fn multiline_care_location_is_rejected() {
        let result = care_location_from_env_value(Some("Ward 1\nWard 2".into()));
        assert!(matches!(result, Err(HisError::InvalidCareLocation)));
    }

    #[test]
    fn data_dir_must_not_be_a_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let file = temp_dir.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();

        let result = CoreConfig::new(file, NonEmptyText::new("St. Elsewhere").unwrap());
        assert!(matches!(result, Err(HisError::InvalidInput(_))));
    }
}

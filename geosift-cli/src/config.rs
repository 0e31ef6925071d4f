//! TOML configuration file and its merge with CLI flags.
//!
//! Precedence is explicit and pure: a CLI flag overrides the config file,
//! which overrides the built-in default. No environment lookups.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::run::RunError;

/// Default checkpoint file name, next to the scanned directory.
pub const DEFAULT_CHECKPOINT: &str = "geosift.checkpoint.json";
/// Files processed between checkpoint writes.
pub const DEFAULT_BATCH_FILES: usize = 100;
/// Seconds between checkpoint writes, whichever limit is hit first.
pub const DEFAULT_BATCH_SECS: u64 = 60;

/// On-disk configuration, all fields optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// `[search]` section.
    #[serde(default)]
    pub search: SearchSection,
    /// `[cluster]` section.
    #[serde(default)]
    pub cluster: ClusterSection,
    /// `[filters]` section.
    #[serde(default)]
    pub filters: FiltersSection,
    /// `[scan]` section.
    #[serde(default)]
    pub scan: ScanSection,
    /// `[checkpoint]` section.
    #[serde(default)]
    pub checkpoint: CheckpointSection,
    /// `[output]` section.
    #[serde(default)]
    pub output: OutputSection,
}

/// `[search]` settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchSection {
    /// Search center latitude.
    pub latitude: Option<f64>,
    /// Search center longitude.
    pub longitude: Option<f64>,
    /// Search center address (used when coordinates are absent).
    pub address: Option<String>,
    /// Search radius in kilometers.
    pub radius_km: Option<f64>,
}

/// `[cluster]` settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterSection {
    /// Merge radius in kilometers.
    pub merge_radius_km: Option<f64>,
}

/// `[filters]` settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FiltersSection {
    /// Earliest capture date, `YYYY-MM-DD`.
    pub date_from: Option<NaiveDate>,
    /// Latest capture date, `YYYY-MM-DD`.
    pub date_to: Option<NaiveDate>,
    /// Maximum GPS accuracy error in meters.
    pub max_accuracy_m: Option<f64>,
}

/// `[scan]` settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanSection {
    /// Root directory to scan.
    pub root: Option<PathBuf>,
    /// Whether to descend into subdirectories.
    pub recursive: Option<bool>,
}

/// `[checkpoint]` settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckpointSection {
    /// Checkpoint file path.
    pub path: Option<PathBuf>,
    /// Files processed between checkpoint writes.
    pub batch_files: Option<usize>,
    /// Seconds between checkpoint writes.
    pub batch_secs: Option<u64>,
}

/// `[output]` settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    /// Directory to copy matches into.
    pub directory: Option<PathBuf>,
    /// Report matches without copying files.
    pub find_only: Option<bool>,
    /// Write a CSV export.
    pub csv: Option<bool>,
    /// Write a KML export.
    pub kml: Option<bool>,
}

impl FileConfig {
    /// Loads a config file, or returns defaults when `path` is `None` and no
    /// `geosift.toml` exists in the working directory.
    ///
    /// # Errors
    /// Returns a configuration error when an explicitly named file is
    /// missing or does not parse.
    pub fn load(path: Option<&Path>) -> Result<Self, RunError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from("geosift.toml"), false),
        };

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(RunError::config(format!(
                    "cannot read config {}: {err}",
                    path.display()
                )));
            }
        };

        toml::from_str(&text).map_err(|err| {
            RunError::config(format!("invalid config {}: {err}", path.display()))
        })
    }
}

/// CLI-over-file-over-default selection for one option.
pub fn pick<T>(cli: Option<T>, file: Option<T>, default: T) -> T {
    cli.or(file).unwrap_or(default)
}

/// CLI-over-file selection for an option with no default.
pub fn pick_opt<T>(cli: Option<T>, file: Option<T>) -> Option<T> {
    cli.or(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_precedence() {
        assert_eq!(pick(Some(1), Some(2), 3), 1);
        assert_eq!(pick(None, Some(2), 3), 2);
        assert_eq!(pick::<i32>(None, None, 3), 3);
        assert_eq!(pick_opt(Some(1), Some(2)), Some(1));
        assert_eq!(pick_opt(None, Some(2)), Some(2));
        assert_eq!(pick_opt::<i32>(None, None), None);
    }

    #[test]
    fn test_parse_full_config() {
        let text = r#"
            [search]
            latitude = 40.7128
            longitude = -74.0060
            radius_km = 1.5

            [cluster]
            merge_radius_km = 0.25

            [filters]
            date_from = "2024-01-01"
            date_to = "2024-12-31"
            max_accuracy_m = 15.0

            [scan]
            root = "/photos"
            recursive = false

            [checkpoint]
            path = "/tmp/geosift.checkpoint.json"
            batch_files = 50

            [output]
            directory = "/sorted"
            csv = true
        "#;

        let config: FileConfig = toml::from_str(text).unwrap();
        assert_eq!(config.search.latitude, Some(40.7128));
        assert_eq!(config.cluster.merge_radius_km, Some(0.25));
        assert_eq!(
            config.filters.date_from,
            Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
        assert_eq!(config.scan.recursive, Some(false));
        assert_eq!(config.checkpoint.batch_files, Some(50));
        assert_eq!(config.output.csv, Some(true));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result: Result<FileConfig, _> = toml::from_str("[search]\nradius = 1.0");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_default_config_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("explicit.toml");
        assert!(FileConfig::load(Some(&missing)).is_err());
        // Without an explicit path the defaults apply.
        assert!(FileConfig::load(None).is_ok());
    }
}

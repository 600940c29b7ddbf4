//! CLI settings.
//!
//! Settings are read from an optional JSON file; command-line flags take
//! precedence. The database defaults to a platform-specific data directory:
//! - Linux: `~/.local/share/standings/standings.db`
//! - macOS: `~/Library/Application Support/standings/standings.db`
//! - Windows: `%APPDATA%\standings\standings.db`

use serde::{Deserialize, Serialize};
use standings_data::{DataError, SqliteStore};
use standings_metrics::{MetricError, MetricRegistry, MetricSpec};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub(crate) enum SettingsError {
    /// Settings file could not be read.
    #[error("Cannot read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid JSON.
    #[error("Invalid settings file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Settings {
    /// SQLite database path
    #[serde(default)]
    pub(crate) database: Option<PathBuf>,
    /// Ranked metrics; the standard registry when absent
    #[serde(default)]
    pub(crate) metrics: Option<Vec<MetricSpec>>,
}

impl Settings {
    /// Load settings from a JSON file.
    pub(crate) fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| SettingsError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load settings if a file was given, defaults otherwise.
    pub(crate) fn load_or_default(path: Option<&Path>) -> Result<Self, SettingsError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Database path: the override, then the settings file, then the default.
    pub(crate) fn database_path(&self, cli_override: Option<&Path>) -> PathBuf {
        cli_override
            .map(Path::to_path_buf)
            .or_else(|| self.database.clone())
            .unwrap_or_else(default_database_path)
    }

    /// Metric registry declared in the settings, or the standard one.
    pub(crate) fn registry(&self) -> Result<MetricRegistry, MetricError> {
        match &self.metrics {
            Some(specs) => MetricRegistry::from_specs(specs),
            None => MetricRegistry::standard(),
        }
    }
}

/// Get the default database path.
pub(crate) fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("standings")
        .join("standings.db")
}

/// Open the store, creating the parent directory if needed.
pub(crate) fn open_store(path: &Path) -> Result<SqliteStore, DataError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    SqliteStore::new(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.database_path(None), default_database_path());
        assert_eq!(settings.registry().unwrap().len(), 10);
        assert!(default_database_path().ends_with("standings/standings.db"));
    }

    #[test]
    fn test_override_precedence() {
        let settings = Settings {
            database: Some(PathBuf::from("/tmp/from-settings.db")),
            metrics: None,
        };
        assert_eq!(
            settings.database_path(None),
            PathBuf::from("/tmp/from-settings.db")
        );
        assert_eq!(
            settings.database_path(Some(Path::new("cli.db"))),
            PathBuf::from("cli.db")
        );
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{
                "database": "ranks.db",
                "metrics": [
                    {"name": "headcount", "table": "manpower_status", "columns": ["total_employees"]}
                ]
            }"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.database, Some(PathBuf::from("ranks.db")));
        assert_eq!(settings.registry().unwrap().names(), vec!["headcount"]);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            Settings::load(&missing),
            Err(SettingsError::Io { .. })
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"databse": "typo.db"}"#).unwrap();
        assert!(matches!(Settings::load(&bad), Err(SettingsError::Json { .. })));

        assert_eq!(Settings::load_or_default(None).unwrap(), Settings::default());
    }

    #[test]
    fn test_invalid_metrics_rejected() {
        let settings = Settings {
            database: None,
            metrics: Some(vec![]),
        };
        assert!(matches!(settings.registry(), Err(MetricError::EmptyRegistry)));
    }

    #[test]
    fn test_open_store_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("standings.db");

        let store = open_store(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.stats().unwrap().companies, 0);
    }
}

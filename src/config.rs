use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::report::ReportConfig;

/// Application configuration loaded from TOML config file.
/// All fields have sensible defaults — the config file is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the export (used when no `--file`/`--data-dir` is given).
    pub export_dir: Option<PathBuf>,
    /// File-name prefix of the export files to read from `export_dir`.
    pub file_prefix: String,
    /// Minimum listen length for reports that don't set their own.
    pub min_listen_ms: u64,
    /// Default number of rows for `top`.
    pub top_count: usize,
    /// Preset reports for `wrapped` (built-in set when empty).
    pub reports: Vec<ReportConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            export_dir: None,
            file_prefix: crate::EXPORT_FILE_PREFIX.to_string(),
            min_listen_ms: crate::MIN_LISTEN_MS,
            top_count: 10,
            reports: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/spinback/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match Self::parse(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Configured reports, or the built-in set if none are declared.
    pub fn reports_or_default(&self) -> Vec<ReportConfig> {
        if self.reports.is_empty() {
            crate::report::default_reports()
        } else {
            self.reports.clone()
        }
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Export directory used when nothing else is configured: `./MyData`, the
/// folder name of the unpacked download.
pub fn default_export_dir() -> PathBuf {
    PathBuf::from("MyData")
}

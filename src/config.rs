//! Configuration management for fortune-log

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding the logs directory
pub const LOGS_DIR_ENV: &str = "FORTUNE_LOG_DIR";

/// Categories of disk errors for operator-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskErrorKind {
    /// Disk is full or quota exceeded
    DiskFull,
    /// Permission denied (read or write)
    PermissionDenied,
    /// File or directory not found
    NotFound,
    /// Other IO error
    Other,
}

impl DiskErrorKind {
    /// Get an operator-facing message for this error kind
    pub fn user_message(&self) -> &'static str {
        match self {
            DiskErrorKind::DiskFull => "disk full, log entries dropped",
            DiskErrorKind::PermissionDenied => "permission denied on the logs directory",
            DiskErrorKind::NotFound => "logs directory not found",
            DiskErrorKind::Other => "IO error",
        }
    }
}

/// Categorize an IO error
pub fn categorize_io_error(e: &std::io::Error) -> DiskErrorKind {
    use std::io::ErrorKind;

    match e.kind() {
        ErrorKind::StorageFull | ErrorKind::WriteZero => DiskErrorKind::DiskFull,
        ErrorKind::PermissionDenied => DiskErrorKind::PermissionDenied,
        ErrorKind::NotFound => DiskErrorKind::NotFound,
        _ => {
            #[cfg(unix)]
            {
                if let Some(os_error) = e.raw_os_error() {
                    // ENOSPC = 28; EDQUOT = 122 on Linux, 69 on macOS
                    if os_error == 28 || os_error == 122 || os_error == 69 {
                        return DiskErrorKind::DiskFull;
                    }
                    // EACCES
                    if os_error == 13 {
                        return DiskErrorKind::PermissionDenied;
                    }
                }
            }
            DiskErrorKind::Other
        }
    }
}

/// Create an operator-facing error message from an IO error
pub fn friendly_io_error_message(e: &std::io::Error, context: &str) -> String {
    match categorize_io_error(e) {
        DiskErrorKind::Other => format!("{}: {}", context, e),
        kind => format!("{}: {} ({})", context, kind.user_message(), e),
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Port for the dashboard HTTP server
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Directory holding the daily log partitions (`~` is expanded)
    #[serde(default = "default_logs_dir")]
    pub logs_dir: String,

    /// Pending entries that trigger an immediate flush (default: 100)
    #[serde(default = "default_max_buffer_size")]
    pub max_buffer_size: usize,

    /// Background flush period in milliseconds (default: 5000)
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Partition retention in days (default: 30)
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Mirror each entry to the console as `[timestamp] LEVEL: message`
    #[serde(default = "default_console_mirror")]
    pub console_mirror: bool,

    /// `tracing` filter used when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_http_port() -> u16 {
    8787
}

fn default_logs_dir() -> String {
    config_dir().join("logs").to_string_lossy().into_owned()
}

fn default_max_buffer_size() -> usize {
    100
}

fn default_flush_interval_ms() -> u64 {
    5000
}

fn default_retention_days() -> u32 {
    30
}

fn default_console_mirror() -> bool {
    true
}

fn default_log_filter() -> String {
    "fortune_log=info,console=info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            logs_dir: default_logs_dir(),
            max_buffer_size: default_max_buffer_size(),
            flush_interval_ms: default_flush_interval_ms(),
            retention_days: default_retention_days(),
            console_mirror: default_console_mirror(),
            log_filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Load configuration from file, or return default if not found
    ///
    /// `FORTUNE_LOG_DIR` overrides `logs_dir` either way.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&config_file_path())?;
        if let Ok(dir) = std::env::var(LOGS_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.logs_dir = dir;
            }
        }
        Ok(config)
    }

    /// Load configuration from a specific file, or return default if it does not exist
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Logs directory with `~` expanded
    pub fn logs_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.logs_dir).into_owned())
    }
}

/// Get the base configuration directory (~/.fortune-log)
/// Falls back to ./.fortune-log if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".fortune-log")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".fortune-log"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Write the default config file if none exists yet
///
/// Returns true when a file was written.
pub fn write_default_if_missing(path: &std::path::Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    Config::default().save_to(path)?;
    Ok(true)
}

/// Ensure the config and logs directories exist
pub fn ensure_directories(config: &Config) -> Result<()> {
    std::fs::create_dir_all(config_dir()).context("Failed to create config directory")?;
    std::fs::create_dir_all(config.logs_path()).context("Failed to create logs directory")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.http_port, 8787);
        assert_eq!(config.max_buffer_size, 100);
        assert_eq!(config.flush_interval_ms, 5000);
        assert_eq!(config.retention_days, 30);
        assert!(config.console_mirror);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.http_port, parsed.http_port);
        assert_eq!(config.logs_dir, parsed.logs_dir);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str("max_buffer_size = 10\n").unwrap();
        assert_eq!(parsed.max_buffer_size, 10);
        assert_eq!(parsed.flush_interval_ms, 5000);
        assert_eq!(parsed.http_port, 8787);
    }

    #[test]
    fn test_load_from_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(config.retention_days, 30);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "http_port = 9000\nretention_days = 7\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.retention_days, 7);
    }

    #[test]
    fn test_load_from_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "http_port = \"not a number\"").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let config = Config {
            http_port: 9100,
            console_mirror: false,
            ..Default::default()
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.http_port, 9100);
        assert!(!loaded.console_mirror);
        assert_eq!(loaded.logs_dir, config.logs_dir);
    }

    #[test]
    fn test_write_default_if_missing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        assert!(write_default_if_missing(&path).unwrap());
        assert_eq!(Config::load_from(&path).unwrap().http_port, 8787);

        std::fs::write(&path, "http_port = 9000\n").unwrap();
        assert!(!write_default_if_missing(&path).unwrap());
        assert_eq!(Config::load_from(&path).unwrap().http_port, 9000);
    }

    #[test]
    fn test_logs_path_expands_tilde() {
        let config = Config {
            logs_dir: "~/fortune-logs".to_string(),
            ..Default::default()
        };
        let path = config.logs_path();
        assert!(!path.to_string_lossy().starts_with('~') || dirs::home_dir().is_none());
        assert!(path.ends_with("fortune-logs"));
    }

    #[test]
    fn test_config_dir_does_not_panic() {
        let dir = config_dir();
        assert!(dir.ends_with(".fortune-log"));
    }

    #[test]
    fn test_categorize_io_error() {
        use std::io::{Error, ErrorKind};

        assert_eq!(
            categorize_io_error(&Error::new(ErrorKind::PermissionDenied, "x")),
            DiskErrorKind::PermissionDenied
        );
        assert_eq!(
            categorize_io_error(&Error::new(ErrorKind::NotFound, "x")),
            DiskErrorKind::NotFound
        );
        assert_eq!(
            categorize_io_error(&Error::new(ErrorKind::StorageFull, "x")),
            DiskErrorKind::DiskFull
        );
        assert_eq!(
            categorize_io_error(&Error::new(ErrorKind::Interrupted, "x")),
            DiskErrorKind::Other
        );
    }

    #[test]
    fn test_friendly_io_error_message() {
        let e = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let msg = friendly_io_error_message(&e, "Failed to write log entries");
        assert!(msg.starts_with("Failed to write log entries: permission denied"));

        let e = std::io::Error::new(std::io::ErrorKind::Interrupted, "interrupted");
        assert_eq!(
            friendly_io_error_message(&e, "Flush"),
            "Flush: interrupted"
        );
    }
}

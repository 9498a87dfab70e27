//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use pomo_core::{PomoError, TimerConfig};
use serde::{Deserialize, Serialize};

/// Where intervals are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// SQLite database at `database_path`.
    #[default]
    Sqlite,
    /// Process memory; everything is lost on exit.
    Memory,
}

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Storage backend.
    pub backend: Backend,
    /// Length of a pomodoro, in seconds.
    pub pomodoro_secs: u64,
    /// Length of a short break, in seconds.
    pub short_break_secs: u64,
    /// Length of a long break, in seconds.
    pub long_break_secs: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("backend", &self.backend)
            .field("pomodoro_secs", &self.pomodoro_secs)
            .field("short_break_secs", &self.short_break_secs)
            .field("long_break_secs", &self.long_break_secs)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let timer = TimerConfig::default();
        Self {
            database_path: data_dir.join("pomo.db"),
            backend: Backend::default(),
            pomodoro_secs: timer.pomodoro.as_secs(),
            short_break_secs: timer.short_break.as_secs(),
            long_break_secs: timer.long_break.as_secs(),
        }
    }
}

impl Config {
    /// Loads configuration from the default locations, optionally merging a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (POMO_*)
        figment = figment.merge(Env::prefixed("POMO_"));

        figment.extract()
    }

    /// Interval lengths for the timer.
    pub fn timer_config(&self) -> Result<TimerConfig, PomoError> {
        TimerConfig::new(
            Duration::from_secs(self.pomodoro_secs),
            Duration::from_secs(self.short_break_secs),
            Duration::from_secs(self.long_break_secs),
        )
    }
}

/// Returns the platform-specific config directory for pomo.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("pomo"))
}

/// Returns the platform-specific data directory for pomo.
///
/// On Linux: `~/.local/share/pomo`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("pomo"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_ends_with_pomo() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "pomo");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("pomo.db"));
        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.pomodoro_secs, 1500);
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("pomo.toml");
        std::fs::write(
            &path,
            "backend = \"memory\"\npomodoro_secs = 3000\ndatabase_path = \"/tmp/other.db\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.pomodoro_secs, 3000);
        assert_eq!(config.short_break_secs, 300);
        assert_eq!(config.database_path, PathBuf::from("/tmp/other.db"));
    }

    #[test]
    fn test_zero_duration_is_rejected() {
        let config = Config {
            short_break_secs: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.timer_config(),
            Err(PomoError::InvalidArgument(_))
        ));
    }
}

//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub color_cache: ColorCacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Query engine database
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file, or `:memory:`
    #[serde(default = "default_database_path")]
    pub path: String,
}

fn default_database_path() -> String {
    crate::engine::IN_MEMORY.to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Persisted legend color assignments
#[derive(Debug, Clone, Deserialize)]
pub struct ColorCacheConfig {
    #[serde(default = "default_color_cache_path")]
    pub path: PathBuf,

    #[serde(default = "default_color_cache_enabled")]
    pub enabled: bool,
}

fn default_color_cache_path() -> PathBuf {
    PathBuf::from("pgf_color_entries.txt")
}

fn default_color_cache_enabled() -> bool {
    true
}

impl Default for ColorCacheConfig {
    fn default() -> Self {
        Self {
            path: default_color_cache_path(),
            enabled: default_color_cache_enabled(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Parse TOML configuration text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from an explicit path, else from default locations, else defaults
    ///
    /// An explicit path that cannot be loaded is an error; broken files in
    /// the default locations are skipped with a warning.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_with_env(path);
        }
        Ok(Self::load_default())
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("sqlplot").join("config.toml")),
            Some(PathBuf::from("./sqlplot.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("SQLPLOT_DATABASE") {
            self.database.path = path;
        }

        if let Ok(path) = std::env::var("SQLPLOT_COLOR_CACHE") {
            self.color_cache.path = PathBuf::from(path);
        }

        // Logging overrides
        if let Ok(level) = std::env::var("SQLPLOT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("SQLPLOT_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Color cache file to use, if caching is enabled
    pub fn color_cache_path(&self) -> Option<PathBuf> {
        self.color_cache
            .enabled
            .then(|| self.color_cache.path.clone())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# sqlplot Configuration
#
# Environment variables override these settings:
# - SQLPLOT_DATABASE
# - SQLPLOT_COLOR_CACHE
# - SQLPLOT_LOG_LEVEL
# - SQLPLOT_LOG_FORMAT

[database]
# SQLite database for imported tables (":memory:" keeps nothing between runs)
path = ":memory:"

[color_cache]
# File mapping series names to legend styles, shared by all documents
path = "pgf_color_entries.txt"

# Read and update the cache when processing .tex documents
enabled = true

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty or json (logs always go to stderr)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.database.path, ":memory:");
        assert_eq!(
            config.color_cache_path(),
            Some(PathBuf::from("pgf_color_entries.txt"))
        );
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_generated_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.database.path, ":memory:");
        assert!(config.color_cache.enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_config() {
        let config = Config::parse("[color_cache]\nenabled = false\n").unwrap();
        assert_eq!(config.color_cache_path(), None);
        assert_eq!(config.database.path, ":memory:");
    }

    #[test]
    fn test_load_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sqlplot.toml");
        std::fs::write(&path, "[database\n").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            Config::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}

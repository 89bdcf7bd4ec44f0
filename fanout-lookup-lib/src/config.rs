//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files, reading
//! `FL_*` environment variables, and merging both with proper precedence.

use crate::error::FanOutError;
use crate::types::SourceKind;
use crate::utils::parse_duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// Default values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Lookup source ("github" or "facebook")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Override for the source's base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Per-lookup timeout (e.g. "5s", "2m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Simulated latency added after each successful fetch (e.g. "1000ms")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<String>,

    /// Print results as JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

impl DefaultsConfig {
    /// Overlay `higher` onto `self`, field by field.
    pub fn overlay(mut self, higher: DefaultsConfig) -> DefaultsConfig {
        if higher.source.is_some() {
            self.source = higher.source;
        }
        if higher.base_url.is_some() {
            self.base_url = higher.base_url;
        }
        if higher.timeout.is_some() {
            self.timeout = higher.timeout;
        }
        if higher.delay.is_some() {
            self.delay = higher.delay;
        }
        if higher.json.is_some() {
            self.json = higher.json;
        }
        self
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to report which files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, FanOutError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(FanOutError::file(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            FanOutError::file(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            FanOutError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is the lowest precedence, then the home directory, then
    /// the current directory. Files that fail to load are skipped with a
    /// warning.
    pub fn discover_and_load(&self) -> FileConfig {
        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        let mut merged_config = FileConfig::default();
        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    if self.verbose {
                        tracing::info!(path = %path.display(), "loaded config file");
                    }
                    merged_config = self.merge_configs(merged_config, config);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping config file");
                }
            }
        }

        merged_config
    }

    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./fanout-lookup.toml", "./.fanout-lookup.toml"]
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".fanout-lookup.toml", "fanout-lookup.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("fanout-lookup").join("config.toml");
        path.exists().then_some(path)
    }

    /// Values from `higher` take precedence over values from `lower`.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(lower_defaults), Some(higher_defaults)) => {
                    Some(lower_defaults.overlay(higher_defaults))
                }
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
        }
    }

    fn validate_config(&self, config: &FileConfig) -> Result<(), FanOutError> {
        let Some(defaults) = &config.defaults else {
            return Ok(());
        };

        if let Some(source) = &defaults.source {
            source.parse::<SourceKind>()?;
        }

        for (field, value) in [("timeout", &defaults.timeout), ("delay", &defaults.delay)] {
            if let Some(value) = value {
                if parse_duration(value).is_none() {
                    return Err(FanOutError::config(format!(
                        "Invalid {} format '{}'. Use format like '250ms', '5s', '2m'",
                        field, value
                    )));
                }
            }
        }

        if let Some(timeout) = &defaults.timeout {
            if parse_duration(timeout) == Some(Duration::ZERO) {
                return Err(FanOutError::config(format!(
                    "Invalid timeout '{}': must be greater than zero",
                    timeout
                )));
            }
        }

        if let Some(base_url) = &defaults.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(FanOutError::config(format!(
                    "Invalid base_url '{}': must start with http:// or https://",
                    base_url
                )));
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub source: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Option<String>,
    pub delay: Option<String>,
    pub json: Option<bool>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// View the environment values as a defaults table, for merging.
    pub fn as_defaults(&self) -> DefaultsConfig {
        DefaultsConfig {
            source: self.source.clone(),
            base_url: self.base_url.clone(),
            timeout: self.timeout.clone(),
            delay: self.delay.clone(),
            json: self.json,
        }
    }
}

/// Load configuration from `FL_*` environment variables.
///
/// Invalid values are reported as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    env_config_from(|name| env::var(name).ok())
}

/// Same as [`load_env_config`], reading variables through `lookup`.
pub fn env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(source) = lookup("FL_SOURCE") {
        match source.parse::<SourceKind>() {
            Ok(kind) => env_config.source = Some(kind.to_string()),
            Err(_) => tracing::warn!("Invalid FL_SOURCE='{}', use github/facebook", source),
        }
    }

    if let Some(base_url) = lookup("FL_BASE_URL") {
        if !base_url.trim().is_empty() {
            env_config.base_url = Some(base_url.trim().to_string());
        }
    }

    for (name, slot) in [
        ("FL_TIMEOUT", &mut env_config.timeout),
        ("FL_DELAY", &mut env_config.delay),
    ] {
        if let Some(value) = lookup(name) {
            match parse_duration(&value) {
                Some(Duration::ZERO) if name == "FL_TIMEOUT" => {
                    tracing::warn!("Ignoring FL_TIMEOUT='{}', timeout must be greater than zero", value);
                }
                Some(_) => *slot = Some(value),
                None => {
                    tracing::warn!(
                        "Invalid {}='{}', use format like '250ms', '5s', '2m'",
                        name,
                        value
                    );
                }
            }
        }
    }

    if let Some(val) = lookup("FL_JSON") {
        match parse_bool(&val) {
            Some(json) => env_config.json = Some(json),
            None => tracing::warn!("Invalid FL_JSON='{}', use true/false", val),
        }
    }

    if let Some(config_path) = lookup("FL_CONFIG") {
        if !config_path.trim().is_empty() {
            env_config.config = Some(config_path);
        }
    }

    env_config
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

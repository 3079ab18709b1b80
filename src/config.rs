//! Binding Configuration
//!
//! Handles parsing of `llvm-bind.toml` and the environment overrides that
//! select which native library the process-wide binding loads.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::binding::Version;

/// Config file searched for from the current directory upward
pub const CONFIG_FILE: &str = "llvm-bind.toml";

/// Environment variable holding an explicit library path
pub const ENV_LIBRARY: &str = "LLVM_BIND_LIBRARY";

/// Environment variable holding extra search directories
pub const ENV_SEARCH_PATH: &str = "LLVM_BIND_SEARCH_PATH";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid version requirement: {0}")]
    InvalidVersion(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure matching llvm-bind.toml.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BindingConfig {
    /// Which native library to load
    #[serde(default)]
    pub library: LibraryConfig,

    /// Version requirements checked after loading
    #[serde(default)]
    pub version: VersionConfig,
}

impl BindingConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: BindingConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Find and load configuration by searching up from the given directory.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                return Self::load(&config_path);
            }
            if !dir.pop() {
                // Reached root without finding config
                return Ok(Self::default());
            }
        }
    }

    /// Configuration for the process-wide binding: the nearest config file,
    /// then environment overrides.
    pub fn from_env() -> ConfigResult<Self> {
        let cwd = std::env::current_dir()?;
        let mut config = Self::find_and_load(&cwd)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup (normally the process env).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(ENV_LIBRARY).filter(|p| !p.is_empty()) {
            self.library.path = Some(PathBuf::from(path));
        }
        if let Some(dirs) = lookup(ENV_SEARCH_PATH) {
            // Environment directories take precedence over the file's
            let mut paths: Vec<PathBuf> = std::env::split_paths(&dirs)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            paths.append(&mut self.library.search_paths);
            self.library.search_paths = paths;
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Native library selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Library name without platform prefix/suffix
    #[serde(default = "default_library_name")]
    pub name: String,

    /// Explicit path; wins over `name`
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Directories searched before the platform defaults
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
}

fn default_library_name() -> String {
    "llvmbind".to_string()
}

impl LibraryConfig {
    /// What the loader should look for: the explicit path, else the name
    pub fn target(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => self.name.clone(),
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            name: default_library_name(),
            path: None,
            search_paths: Vec::new(),
        }
    }
}

/// Version requirements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionConfig {
    /// Oldest acceptable native library version, e.g. "14.0"
    #[serde(default)]
    pub minimum: Option<String>,
}

impl VersionConfig {
    pub fn minimum_version(&self) -> ConfigResult<Option<Version>> {
        self.minimum
            .as_deref()
            .map(|s| Version::parse(s).ok_or_else(|| ConfigError::InvalidVersion(s.to_string())))
            .transpose()
    }
}

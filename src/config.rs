//! Configuration loading and management
//!
//! Handles parsing of `.tasktree.toml` configuration files.

use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILE: &str = ".tasktree.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Task API connection
    #[serde(default)]
    pub api: ApiConfig,

    /// Output rendering
    #[serde(default)]
    pub output: OutputConfig,
}

/// Task API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL the task and project routes hang off
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent with every request
    #[serde(default)]
    pub token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Tree and summary rendering configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Spaces per tree level
    #[serde(default = "default_indent")]
    pub indent: usize,

    /// Append status counts below the tree view
    #[serde(default = "default_true")]
    pub show_counts: bool,
}

fn default_indent() -> usize {
    2
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
            show_counts: true,
        }
    }
}

impl Config {
    /// Load configuration from a `.tasktree.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Err(crate::error::Error::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `dir`, or return defaults when no file exists.
    ///
    /// Unlike [`Config::load`], a present but invalid file is an error.
    pub fn load_from_dir(dir: &Path) -> crate::error::Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply command-line / environment overrides, then re-validate.
    pub fn with_overrides(
        mut self,
        base_url: Option<String>,
        token: Option<String>,
    ) -> crate::error::Result<Self> {
        if let Some(base_url) = base_url {
            self.api.base_url = base_url;
        }
        if let Some(token) = token {
            self.api.token = Some(token);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        self.api.validate()?;
        self.output.validate()?;
        Ok(())
    }
}

impl ApiConfig {
    fn validate(&self) -> crate::error::Result<()> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "api.base_url cannot be empty".to_string(),
            ));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(crate::error::Error::InvalidConfig(format!(
                "api.base_url '{base_url}' must start with http:// or https://"
            )));
        }
        if self.timeout_secs == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "api.timeout_secs must be > 0".to_string(),
            ));
        }
        if self.timeout_secs > 600 {
            return Err(crate::error::Error::InvalidConfig(
                "api.timeout_secs must be <= 600".to_string(),
            ));
        }
        Ok(())
    }
}

impl OutputConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if !(1..=8).contains(&self.indent) {
            return Err(crate::error::Error::InvalidConfig(
                "output.indent must be between 1 and 8".to_string(),
            ));
        }
        Ok(())
    }
}

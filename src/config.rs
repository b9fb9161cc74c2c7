use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// File name of the durable completion store inside a data directory
pub const COMPLETION_FILE_NAME: &str = ".torsift-completion.json";

/// Suffix used for the temporary file the completion store is written through
pub const COMPLETION_TMP_SUFFIX: &str = ".tmp";

/// Name of the user config file
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Qualifier, organization and application used to locate the config directory
pub const PROJECT_DIRS: (&str, &str, &str) = ("", "", "torsift");

/// Which completion store the CLI opens torrents with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CompletionKind {
    Memory,
    #[default]
    Json,
}

/// Optional user configuration, read from `config.toml` in the platform config dir
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub data_dir: Option<String>,
    pub completion: CompletionKind,
}

impl UserConfig {
    /// Load the config from the default location. A missing file yields defaults.
    pub fn load() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// The configured data directory with `~` expanded
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .as_deref()
            .map(|d| PathBuf::from(shellexpand::tilde(d).to_string()))
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    let (qualifier, organization, application) = PROJECT_DIRS;
    directories::ProjectDirs::from(qualifier, organization, application)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

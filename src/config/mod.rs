//! Configuration management for jira-rest.
//!
//! The configuration is a TOML file holding global [`Settings`] and the list
//! of JIRA connection [`Profile`]s. Secrets never live in this file; see
//! [`Profile::credentials`].

mod profile;
mod settings;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub use profile::{Credentials, Profile, TOKEN_ENV_VAR};
pub use settings::Settings;

/// Name of the application directory under the platform config dir.
const APP_DIR: &str = "jira-rest";

/// Name of the configuration file.
const CONFIG_FILE: &str = "config.toml";

/// Errors raised while loading, saving or using the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform has no configuration directory.
    #[error("Could not determine configuration directory")]
    NoConfigDir,

    /// The configuration directory could not be created.
    #[error("Failed to create configuration directory: {0}")]
    CreateDirError(#[source] std::io::Error),

    /// The configuration file could not be read.
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[source] std::io::Error),

    /// The configuration file could not be written.
    #[error("Failed to write configuration file: {0}")]
    WriteError(#[source] std::io::Error),

    /// The configuration file is not valid TOML.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A value in the configuration is invalid.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// No profile with the requested name exists.
    #[error("Profile '{0}' not found")]
    ProfileNotFound(String),

    /// No secret could be found for a profile.
    #[error("No secret found for profile '{0}'")]
    MissingSecret(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// The whole configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

impl Config {
    /// Default location of the configuration file.
    pub fn config_path() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(base.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load the configuration from the default location.
    ///
    /// A missing file yields the default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load and validate the configuration from `path`.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        debug!(profiles = config.profiles.len(), "Configuration loaded");
        Ok(config)
    }

    /// Save the configuration to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Validate and save the configuration to `path`, creating parent
    /// directories when needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(ConfigError::CreateDirError)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(ConfigError::WriteError)?;
        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Validate every profile and the default profile reference.
    pub fn validate(&self) -> Result<()> {
        for (i, profile) in self.profiles.iter().enumerate() {
            profile.validate()?;
            if self.profiles[..i].iter().any(|p| p.name == profile.name) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate profile name '{}'",
                    profile.name
                )));
            }
        }
        if let Some(default) = &self.settings.default_profile {
            if !self.profiles.iter().any(|p| &p.name == default) {
                return Err(ConfigError::ValidationError(format!(
                    "default profile '{}' is not defined",
                    default
                )));
            }
        }
        Ok(())
    }

    /// Find a profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))
    }

    /// The profile to use when none is named: the configured default, else
    /// the first one.
    pub fn default_profile(&self) -> Result<&Profile> {
        match &self.settings.default_profile {
            Some(name) => self.profile(name),
            None => self
                .profiles
                .first()
                .ok_or_else(|| ConfigError::ProfileNotFound("<default>".to_string())),
        }
    }

    /// Pick `name` when given, the default profile otherwise.
    pub fn select(&self, name: Option<&str>) -> Result<&Profile> {
        match name {
            Some(name) => self.profile(name),
            None => self.default_profile(),
        }
    }
}

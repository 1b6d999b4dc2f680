//! Dispatch configuration.
//!
//! Layered with figment: built-in defaults, then `archdispatch.toml` in the
//! working directory, then `ARCHDISPATCH_*` environment variables.
//!
//! ```toml
//! naming = "folder"
//! strictness = "strict"
//! search_dir = "/opt/myapp/lib"
//! capabilities = ["SSE2", "SSE4_1"]
//! change_working_dir = true
//! ```

use crate::arch::CapabilityLevel;
use crate::caps::FixedCapabilities;
use crate::dispatcher::Strictness;
use crate::naming::NamingScheme;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "archdispatch.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "ARCHDISPATCH_";

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Extraction from figment providers failed.
    #[error("{0}")]
    Figment(Box<figment::Error>),

    /// Serializing the configuration back to TOML failed.
    #[error("serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is present but unusable.
    #[error("invalid value: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Settings shared by dispatchers and invocation helpers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// On-disk layout of the variants.
    pub naming: NamingScheme,
    /// Lookup policy for missing symbols.
    pub strictness: Strictness,
    /// Directory relative candidates are resolved against (working directory if unset).
    pub search_dir: Option<PathBuf>,
    /// Forces the detected capability set instead of probing the CPU.
    pub capabilities: Option<Vec<CapabilityLevel>>,
    /// Switch into the library's folder while opening it.
    pub change_working_dir: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            naming: NamingScheme::Suffix,
            strictness: Strictness::Lenient,
            search_dir: None,
            capabilities: None,
            change_working_dir: true,
        }
    }
}

impl DispatchConfig {
    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
    }

    /// Loads defaults, then `archdispatch.toml`, then `ARCHDISPATCH_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::defaults()
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Loads defaults overridden by the given TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::defaults()
            .merge(Toml::file(path.as_ref()))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document over the defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = Self::defaults().merge(Toml::string(toml)).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Checks values that deserialization cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dir) = &self.search_dir {
            if !dir.is_dir() {
                return Err(ConfigError::Invalid(format!(
                    "search_dir {} is not a directory",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    /// Fixed capability source when `capabilities` is set.
    #[must_use]
    pub fn capability_override(&self) -> Option<FixedCapabilities> {
        self.capabilities
            .as_deref()
            .map(FixedCapabilities::from_levels)
    }
}

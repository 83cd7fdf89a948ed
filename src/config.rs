//! Agent request configuration
//!
//! The three options that feed the request pipeline, loaded from a TOML file:
//!
//! ```toml
//! alias = ["agent.hostname:system.hostname", "fs.size[*]:vfs.fs.size[*]"]
//! user_parameter = ["vfs.dir.size[*],du -s -B 1 \"$1\" | cut -f1"]
//! unsafe_user_parameters = 0
//! ```
//!
//! Environment overrides:
//! - `AGENT_UNSAFE_USER_PARAMETERS`: `0` or `1`

use crate::alias::AliasError;
use crate::userparam::{SafetyPolicy, UserParamError};
use serde::{Deserialize, Serialize};
use std::path::Path;

const ENV_UNSAFE_USER_PARAMETERS: &str = "AGENT_UNSAFE_USER_PARAMETERS";

/// Errors from loading or applying configuration
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading the file
    Io {
        path: String,
        source: std::io::Error,
    },
    /// File is not valid TOML for this schema
    Parse {
        path: String,
        source: toml::de::Error,
    },
    /// A value is out of range
    InvalidValue {
        field: &'static str,
        value: String,
        reason: String,
    },
    /// An alias definition was rejected
    Alias(AliasError),
    /// A user parameter definition was rejected
    UserParam(UserParamError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read configuration file '{}': {}", path, source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse configuration file '{}': {}", path, source)
            }
            ConfigError::InvalidValue {
                field,
                value,
                reason,
            } => write!(f, "invalid value '{}' for {}: {}", value, field, reason),
            ConfigError::Alias(e) => write!(f, "invalid alias configuration: {}", e),
            ConfigError::UserParam(e) => write!(f, "invalid user parameter configuration: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Alias(e) => Some(e),
            ConfigError::UserParam(e) => Some(e),
            ConfigError::InvalidValue { .. } => None,
        }
    }
}

impl From<AliasError> for ConfigError {
    fn from(e: AliasError) -> Self {
        ConfigError::Alias(e)
    }
}

impl From<UserParamError> for ConfigError {
    fn from(e: UserParamError) -> Self {
        ConfigError::UserParam(e)
    }
}

/// Options consumed by the request pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// `pattern:target` alias rules
    #[serde(rename = "alias")]
    pub aliases: Vec<String>,
    /// `key,command` user parameter definitions
    #[serde(rename = "user_parameter")]
    pub user_parameters: Vec<String>,
    /// 0 rejects shell metacharacters in parameters, 1 allows them
    pub unsafe_user_parameters: i64,
}

impl AgentConfig {
    /// Load and validate a TOML configuration file, then apply environment
    /// overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path_str.clone(),
            source: e,
        })?;

        let mut config = Self::from_toml_str(&text).map_err(|e| ConfigError::Parse {
            path: path_str,
            source: e,
        })?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration text without touching the environment
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = AgentConfig::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(value) = std::env::var(ENV_UNSAFE_USER_PARAMETERS) {
            self.unsafe_user_parameters =
                value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    field: ENV_UNSAFE_USER_PARAMETERS,
                    value: value.clone(),
                    reason: "expected 0 or 1".to_string(),
                })?;
        }
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.policy().map(|_| ())
    }

    /// Safety policy selected by `unsafe_user_parameters`
    pub fn policy(&self) -> Result<SafetyPolicy, ConfigError> {
        SafetyPolicy::from_flag(self.unsafe_user_parameters).ok_or_else(|| {
            ConfigError::InvalidValue {
                field: "unsafe_user_parameters",
                value: self.unsafe_user_parameters.to_string(),
                reason: "expected 0 or 1".to_string(),
            }
        })
    }
}

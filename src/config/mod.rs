//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default body limit, matching axum's own default for extractors
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Default address for [`ServerBuilder::serve`](crate::server::ServerBuilder::serve)
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";

/// Settings applied by every validation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Largest request body the middleware will buffer, in bytes
    ///
    /// Bodies over the limit are rejected as unmappable.
    pub max_body_bytes: usize,

    /// Emit a `debug` event for each rejected request
    pub trace_rejections: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            trace_rejections: true,
        }
    }
}

/// Complete configuration for a server built with [`ServerBuilder`](crate::server::ServerBuilder)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind, e.g. `0.0.0.0:8080`
    pub bind_address: String,

    pub validation: ValidationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            validation: ValidationConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path))?;
        Self::from_yaml_str(&content).with_context(|| format!("Invalid config file '{}'", path))
    }

    /// Load configuration from a YAML string
    ///
    /// Missing keys fall back to their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but cannot work at runtime
    pub fn validate(&self) -> Result<()> {
        if self.validation.max_body_bytes == 0 {
            anyhow::bail!("validation.max_body_bytes must be greater than 0");
        }
        if self.bind_address.trim().is_empty() {
            anyhow::bail!("bind_address must not be empty");
        }
        Ok(())
    }
}

//! Console configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use c4amp_core::protocol_constants::{DEFAULT_PORT, RESPONSE_TIMEOUT_MS};
use c4amp_core::{AmpConfig, InputTable, OutputTable, TransportConfig};
use serde::Deserialize;

/// Console configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CtlConfig {
    /// Amplifier IP address or host name.
    /// Override: `AMPCTL_HOST`
    pub host: String,

    /// Amplifier UDP port.
    /// Override: `AMPCTL_PORT`
    pub port: u16,

    /// Milliseconds to wait for a reply after each command.
    /// Override: `AMPCTL_RESPONSE_TIMEOUT_MS`
    pub response_timeout_ms: u64,

    /// Wait for a reply after each command.
    pub await_responses: bool,

    /// Input labels, keyed 1..=6. Missing inputs are disabled.
    pub inputs: InputTable,

    /// Configured outputs, keyed 1..=4.
    pub outputs: OutputTable,
}

impl Default for CtlConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            response_timeout_ms: RESPONSE_TIMEOUT_MS,
            await_responses: true,
            inputs: InputTable::default(),
            outputs: OutputTable::default(),
        }
    }
}

impl CtlConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies overrides from `lookup`, normally the process environment.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("AMPCTL_HOST") {
            self.host = host;
        }

        if let Some(val) = lookup("AMPCTL_PORT") {
            match val.parse() {
                Ok(port) => self.port = port,
                Err(_) => log::warn!("Ignoring invalid AMPCTL_PORT: {}", val),
            }
        }

        if let Some(val) = lookup("AMPCTL_RESPONSE_TIMEOUT_MS") {
            match val.parse() {
                Ok(ms) => self.response_timeout_ms = ms,
                Err(_) => log::warn!("Ignoring invalid AMPCTL_RESPONSE_TIMEOUT_MS: {}", val),
            }
        }
    }

    /// Converts to c4amp-core's config type.
    pub fn to_core_config(&self) -> AmpConfig {
        AmpConfig {
            transport: TransportConfig {
                host: self.host.clone(),
                port: self.port,
                response_timeout_ms: self.response_timeout_ms,
                await_responses: self.await_responses,
            },
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
        }
    }
}

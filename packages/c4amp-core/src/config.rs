//! Configuration types for the amplifier core.
//!
//! The core does not load or persist configuration. Hosts build an
//! [`AmpConfig`] (from YAML, a settings UI, ...), validate it once, and hand it
//! in. Label tables are immutable for a controller's lifetime; a change arrives
//! as a full replacement table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::amp::topology::LogicalInput;
use crate::protocol_constants::{DEFAULT_PORT, NUM_LOGICAL_INPUTS, NUM_OUTPUTS, RESPONSE_TIMEOUT_MS};

/// Errors found while validating configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("input key {0} is outside 1..=6")]
    InvalidInputKey(u8),

    #[error("output key {0} is outside 1..=4")]
    InvalidOutputKey(u8),

    #[error("at least one output must be configured")]
    NoOutputs,

    #[error("amplifier host must not be empty")]
    EmptyHost,
}

/// Default display label for a logical input.
pub fn default_input_label(input: LogicalInput) -> String {
    match input.number() {
        n @ 1..=4 => format!("Analog Input {}", n),
        n @ 5..=6 => format!("Digital Input {}", n - 4),
        n => format!("Input {}", n),
    }
}

/// Default display label for an output.
pub fn default_output_label(output: u8) -> String {
    format!("Stereo Output {}", output)
}

// ─────────────────────────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────────────────────────

/// Where and how to send commands.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TransportConfig {
    /// Amplifier IP address or host name.
    pub host: String,

    /// Amplifier UDP port.
    pub port: u16,

    /// How long each send waits for a reply (milliseconds).
    pub response_timeout_ms: u64,

    /// Wait for a reply after each command. Replies are recorded, never trusted.
    pub await_responses: bool,
}

impl TransportConfig {
    /// Creates a config for `host` with default port and timeouts.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            response_timeout_ms: RESPONSE_TIMEOUT_MS,
            await_responses: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inputs
// ─────────────────────────────────────────────────────────────────────────────

/// Per-input settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct InputConfig {
    /// Display label. Falls back to [`default_input_label`].
    #[serde(default)]
    pub name: Option<String>,

    /// Disabled inputs are hidden from source lists.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Map from logical input (1..=6) to its settings.
///
/// Inputs missing from the table are treated as disabled.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct InputTable(BTreeMap<u8, InputConfig>);

impl InputTable {
    /// Builds a validated table.
    pub fn new(entries: BTreeMap<u8, InputConfig>) -> Result<Self, ConfigError> {
        let table = Self(entries);
        table.validate()?;
        Ok(table)
    }

    /// Validates the key range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.0.keys().find(|k| !(1..=NUM_LOGICAL_INPUTS).contains(*k)) {
            Some(&key) => Err(ConfigError::InvalidInputKey(key)),
            None => Ok(()),
        }
    }

    /// Returns true if the input is present and enabled.
    pub fn is_enabled(&self, input: LogicalInput) -> bool {
        self.0.get(&input.number()).is_some_and(|c| c.enabled)
    }

    /// Label of an enabled input.
    pub fn label_for(&self, input: LogicalInput) -> Option<String> {
        let config = self.0.get(&input.number()).filter(|c| c.enabled)?;
        Some(
            config
                .name
                .clone()
                .unwrap_or_else(|| default_input_label(input)),
        )
    }

    /// Enabled inputs with their labels, in input order.
    pub fn enabled(&self) -> Vec<(LogicalInput, String)> {
        self.0
            .keys()
            .map(|&n| LogicalInput(n))
            .filter_map(|input| self.label_for(input).map(|label| (input, label)))
            .collect()
    }

    /// Labels of enabled inputs, in input order.
    pub fn labels(&self) -> Vec<String> {
        self.enabled().into_iter().map(|(_, label)| label).collect()
    }

    /// Finds the enabled input carrying `label`.
    pub fn input_for_label(&self, label: &str) -> Option<LogicalInput> {
        self.enabled()
            .into_iter()
            .find(|(_, l)| l == label)
            .map(|(input, _)| input)
    }

    /// Lowest-numbered enabled input.
    pub fn first_enabled(&self) -> Option<LogicalInput> {
        self.enabled().first().map(|(input, _)| *input)
    }
}

impl Default for InputTable {
    fn default() -> Self {
        Self(
            (1..=NUM_LOGICAL_INPUTS)
                .map(|n| {
                    (
                        n,
                        InputConfig {
                            name: Some(default_input_label(LogicalInput(n))),
                            enabled: true,
                        },
                    )
                })
                .collect(),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outputs
// ─────────────────────────────────────────────────────────────────────────────

/// Per-output settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct OutputConfig {
    /// Display label. Falls back to [`default_output_label`].
    #[serde(default)]
    pub name: Option<String>,
}

/// Map from output (1..=4) to its settings. Only listed outputs get a zone.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct OutputTable(BTreeMap<u8, OutputConfig>);

impl OutputTable {
    /// Builds a validated table.
    pub fn new(entries: BTreeMap<u8, OutputConfig>) -> Result<Self, ConfigError> {
        let table = Self(entries);
        table.validate()?;
        Ok(table)
    }

    /// Validates the key range and that the table is non-empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.0.is_empty() {
            return Err(ConfigError::NoOutputs);
        }
        match self.0.keys().find(|k| !(1..=NUM_OUTPUTS).contains(*k)) {
            Some(&key) => Err(ConfigError::InvalidOutputKey(key)),
            None => Ok(()),
        }
    }

    /// Configured outputs with their labels, in output order.
    pub fn outputs(&self) -> Vec<(u8, String)> {
        self.0
            .iter()
            .map(|(&n, c)| (n, c.name.clone().unwrap_or_else(|| default_output_label(n))))
            .collect()
    }

    /// Highest configured output number; commands accept 1..=this.
    pub fn max_output(&self) -> u8 {
        self.0.keys().next_back().copied().unwrap_or(0)
    }
}

impl Default for OutputTable {
    fn default() -> Self {
        Self(
            (1..=NUM_OUTPUTS)
                .map(|n| {
                    (
                        n,
                        OutputConfig {
                            name: Some(default_output_label(n)),
                        },
                    )
                })
                .collect(),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Amplifier
// ─────────────────────────────────────────────────────────────────────────────

/// Everything needed to control one amplifier.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AmpConfig {
    /// Network settings.
    pub transport: TransportConfig,
    /// Input label table.
    pub inputs: InputTable,
    /// Configured outputs.
    pub outputs: OutputTable,
}

impl AmpConfig {
    /// Creates a config for `host` with default tables.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            transport: TransportConfig::new(host),
            ..Default::default()
        }
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        self.inputs.validate()?;
        self.outputs.validate()
    }
}

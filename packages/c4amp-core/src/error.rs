//! Centralized error types for the amplifier core library.
//!
//! Every error is reported to the immediate caller; none of them is allowed to
//! take down the process. Validation errors are detected before any wire
//! traffic, transport errors are surfaced once and never retried here.

use thiserror::Error;

use crate::amp::topology::TopologyError;
use crate::amp::transport::TransportError;
use crate::config::ConfigError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

impl ErrorCode for TransportError {
    fn code(&self) -> &'static str {
        match self {
            Self::SocketBind(_) => "socket_bind_failed",
            Self::Send(_) => "send_failed",
        }
    }
}

impl ErrorCode for TopologyError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unmapped(_) => "input_unmapped",
            Self::NotDigitalCapable(_) => "port_not_digital",
            Self::UnknownPort(_) => "unknown_port",
        }
    }
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidInputKey(_) => "invalid_input_key",
            Self::InvalidOutputKey(_) => "invalid_output_key",
            Self::NoOutputs => "no_outputs",
            Self::EmptyHost => "empty_host",
        }
    }
}

/// Application-wide error type for amplifier operations.
#[derive(Debug, Error)]
pub enum AmpError {
    /// Output number outside the configured outputs.
    #[error("Invalid output {output} (expected 1..={max})")]
    InvalidOutput {
        /// The rejected output.
        output: u8,
        /// Number of configured outputs.
        max: u8,
    },

    /// A numeric argument was outside the device's accepted range.
    #[error("Invalid {parameter} value {value} (expected {min}..={max})")]
    OutOfRange {
        /// Which argument was rejected.
        parameter: &'static str,
        /// The rejected value, as given.
        value: String,
        /// Lower bound.
        min: String,
        /// Upper bound.
        max: String,
    },

    /// Input could not be mapped to a physical port.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] TopologyError),

    /// No enabled input carries the requested label.
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    /// Socket or network failure.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration failed validation.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl AmpError {
    /// Builds an [`AmpError::OutOfRange`] from any displayable values.
    pub fn out_of_range<T: ToString>(parameter: &'static str, value: T, min: T, max: T) -> Self {
        Self::OutOfRange {
            parameter,
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    /// Returns true for errors raised before any wire traffic.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidOutput { .. }
                | Self::OutOfRange { .. }
                | Self::InvalidInput(_)
                | Self::UnknownSource(_)
                | Self::Configuration(_)
        )
    }
}

impl ErrorCode for AmpError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidOutput { .. } => "invalid_output",
            Self::OutOfRange { .. } => "out_of_range",
            Self::InvalidInput(e) => e.code(),
            Self::UnknownSource(_) => "unknown_source",
            Self::Transport(e) => e.code(),
            Self::Configuration(e) => e.code(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

pub use crate::amp::transport::TransportResult;

/// Convenient Result alias for amplifier operations.
pub type AmpResult<T> = Result<T, AmpError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amp::topology::LogicalInput;

    #[test]
    fn out_of_range_formats_bounds() {
        let err = AmpError::out_of_range("bass", 13, -12, 12);
        assert_eq!(err.to_string(), "Invalid bass value 13 (expected -12..=12)");
        assert_eq!(err.code(), "out_of_range");
        assert!(err.is_validation());
    }

    #[test]
    fn topology_errors_keep_their_code() {
        let err: AmpError = TopologyError::Unmapped(LogicalInput(9)).into();
        assert_eq!(err.code(), "input_unmapped");
        assert!(err.is_validation());
    }

    #[test]
    fn transport_errors_are_not_validation() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "network down");
        let err: AmpError = TransportError::Send(io).into();
        assert_eq!(err.code(), "send_failed");
        assert!(!err.is_validation());
        assert!(err.to_string().contains("network down"));
    }
}

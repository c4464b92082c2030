//! Logical input slots and their physical wiring.
//!
//! The amplifier has four physical input ports. Ports 1 and 3 can run in
//! either analog or digital mode, so each of them backs two logical inputs:
//!
//! | Logical | Kind    | Port |
//! |---------|---------|------|
//! | 1       | Analog  | 1    |
//! | 2       | Analog  | 2    |
//! | 3       | Analog  | 3    |
//! | 4       | Analog  | 4    |
//! | 5       | Digital | 1    |
//! | 6       | Digital | 3    |
//!
//! Selecting either logical input on a shared port rewrites that port's mode
//! flag, which affects every output routed to it.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol_constants::{DIGITAL_CAPABLE_PORTS, NUM_ANALOG_INPUTS};

/// Whether a physical port carries an analog or digital signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Analog,
    Digital,
}

impl SourceKind {
    /// Returns true for [`SourceKind::Digital`].
    pub fn is_digital(self) -> bool {
        matches!(self, Self::Digital)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analog => write!(f, "analog"),
            Self::Digital => write!(f, "digital"),
        }
    }
}

/// User-facing input selector, 1..=6.
///
/// [`LogicalInput::NO_INPUT`] is a distinguished value outside the table that
/// disconnects every source from an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalInput(pub u8);

impl LogicalInput {
    /// Disconnects the output from all sources.
    pub const NO_INPUT: LogicalInput = LogicalInput(0);

    /// Returns true if this is the [`LogicalInput::NO_INPUT`] sentinel.
    pub fn is_no_input(self) -> bool {
        self == Self::NO_INPUT
    }

    pub fn number(self) -> u8 {
        self.0
    }
}

impl fmt::Display for LogicalInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_no_input() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Errors resolving logical inputs to physical ports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// The logical input is not in the wiring table.
    #[error("input {0} is not mapped to a physical port")]
    Unmapped(LogicalInput),

    /// Digital addressing was requested for a port that is analog-only.
    #[error("physical port {0} is not digital-capable")]
    NotDigitalCapable(u8),

    /// The physical port does not exist.
    #[error("physical port {0} does not exist")]
    UnknownPort(u8),
}

/// The fixed wiring table, indexed by `logical - 1`.
const INPUT_MAP: [(SourceKind, u8); 6] = [
    (SourceKind::Analog, 1),
    (SourceKind::Analog, 2),
    (SourceKind::Analog, 3),
    (SourceKind::Analog, 4),
    (SourceKind::Digital, 1),
    (SourceKind::Digital, 3),
];

/// Resolves a logical input to its source kind and physical port.
///
/// [`LogicalInput::NO_INPUT`] is not in the table and fails here; callers
/// handle it as a direct port-zero routing.
pub fn resolve(logical: LogicalInput) -> Result<(SourceKind, u8), TopologyError> {
    match logical.0 {
        n @ 1..=6 => Ok(INPUT_MAP[usize::from(n - 1)]),
        _ => Err(TopologyError::Unmapped(logical)),
    }
}

/// Returns every mapped logical input in table order.
pub fn logical_inputs() -> impl Iterator<Item = LogicalInput> {
    (1..=INPUT_MAP.len() as u8).map(LogicalInput)
}

/// Returns true if `port` can be switched into digital mode.
pub fn is_digital_capable(port: u8) -> bool {
    DIGITAL_CAPABLE_PORTS.contains(&port)
}

/// Checks that `port` is addressable for the given kind.
pub fn validate_port(port: u8, kind: SourceKind) -> Result<(), TopologyError> {
    if !(1..=NUM_ANALOG_INPUTS).contains(&port) {
        return Err(TopologyError::UnknownPort(port));
    }
    if kind.is_digital() && !is_digital_capable(port) {
        return Err(TopologyError::NotDigitalCapable(port));
    }
    Ok(())
}

/// Maps a logical input to the `(port, is_digital)` pair used for gain addressing.
pub fn gain_target(logical: LogicalInput) -> Result<(u8, bool), TopologyError> {
    let (kind, port) = resolve(logical)?;
    Ok((port, kind.is_digital()))
}

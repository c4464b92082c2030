//! Event system for zone state observers.
//!
//! This module provides:
//! - [`EventEmitter`] trait for controllers to report state changes
//! - [`BroadcastEventBridge`] for fan-out to any number of subscribers
//! - Event types for zones and the amplifier link

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use serde::Serialize;

use crate::amp::topology::LogicalInput;
use crate::zone::state::PowerState;

/// Events broadcast to subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum BroadcastEvent {
    /// Changes to a single zone's recorded state.
    Zone(ZoneEvent),

    /// Amplifier lifecycle and command failures.
    Amplifier(AmplifierEvent),
}

/// Zone state changes. Emitted after the state update, never before the
/// wire commands have been sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ZoneEvent {
    /// Zone powered on or off.
    PowerChanged {
        output: u8,
        power: PowerState,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// Recorded volume changed.
    VolumeChanged {
        output: u8,
        volume: f64,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// Mute flag changed.
    MuteChanged {
        output: u8,
        muted: bool,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// Selected input changed.
    SourceChanged {
        output: u8,
        input: Option<LogicalInput>,
        /// Display label, if the input is enabled.
        label: Option<String>,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The label table was replaced.
    SourceListChanged {
        output: u8,
        sources: Vec<String>,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// State was loaded from an external snapshot.
    StateRestored {
        output: u8,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

impl ZoneEvent {
    /// Output the event belongs to.
    pub fn output(&self) -> u8 {
        match self {
            Self::PowerChanged { output, .. }
            | Self::VolumeChanged { output, .. }
            | Self::MuteChanged { output, .. }
            | Self::SourceChanged { output, .. }
            | Self::SourceListChanged { output, .. }
            | Self::StateRestored { output, .. } => *output,
        }
    }
}

/// Amplifier-level events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AmplifierEvent {
    /// Transport opened.
    Started {
        host: String,
        port: u16,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// Transport closed.
    Stopped {
        host: String,
        port: u16,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A zone operation failed and left recorded state untouched.
    CommandFailed {
        output: u8,
        /// Machine-readable error code.
        code: String,
        message: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

//! C4Amp Core - control library for Control4 multi-zone amplifiers.
//!
//! The amplifier speaks a fire-and-forget ASCII protocol over UDP and never
//! reports its state, so this crate keeps its own record of every zone and
//! updates it as commands are sent.
//!
//! # Architecture
//!
//! - [`amp`]: Wire encoding, input wiring, UDP transport and the validated
//!   command client
//! - [`zone`]: Per-zone state, power/mute policy and all-zone operations
//! - [`events`]: Observer seam for state changes
//! - [`config`]: Typed input/output tables and network settings
//! - [`bootstrap`]: Composition root for one amplifier
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`CommandTransport`](amp::CommandTransport): Sending framed commands
//! - [`AmpControl`](amp::AmpControl): Validated amplifier commands
//! - [`EventEmitter`](events::EventEmitter): Emitting zone events

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod amp;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod events;
pub mod protocol_constants;
pub mod utils;
pub mod zone;

// Re-export commonly used types at the crate root
pub use amp::{
    AmpControl, AmplifierClient, CommandTransport, LogicalInput, SourceKind, TopologyError,
    TransportError, TransportState, UdpCommandTransport,
};
pub use bootstrap::{bootstrap_amplifier, AmplifierServices};
pub use config::{
    AmpConfig, ConfigError, InputConfig, InputTable, OutputConfig, OutputTable, TransportConfig,
};
pub use error::{AmpError, AmpResult, ErrorCode, TransportResult};
pub use events::{
    AmplifierEvent, BroadcastEvent, BroadcastEventBridge, EventEmitter, LoggingEventEmitter,
    NoopEventEmitter, ZoneEvent,
};
pub use zone::{
    GroupOutcome, PowerState, ZoneController, ZoneGroup, ZoneSnapshot, ZoneState,
    ZoneStateManager,
};

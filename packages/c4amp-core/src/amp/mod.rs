//! Amplifier command path.
//!
//! # Module Structure
//!
//! - `codec` - Value encoding for command arguments
//! - `topology` - Logical input to physical port wiring
//! - `transport` - UDP framing, lazy socket lifecycle, reply wait
//! - `traits` - Trait abstraction for testability
//! - `client` - `AmplifierClient` validated command implementation

pub mod client;
pub mod codec;
pub mod topology;
pub mod traits;
pub mod transport;

pub use client::AmplifierClient;
pub use topology::{LogicalInput, SourceKind, TopologyError};
pub use traits::AmpControl;
pub use transport::{CommandTransport, TransportError, TransportState, UdpCommandTransport};

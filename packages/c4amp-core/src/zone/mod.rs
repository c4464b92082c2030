//! Per-zone state and policy.
//!
//! - `state` - Recorded zone state and power-cycle snapshots
//! - `controller` - Power, mute and source policy for one output
//! - `group` - Concurrent operations across all outputs

pub mod controller;
pub mod group;
pub mod state;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use controller::ZoneController;
pub use group::{GroupOutcome, ZoneGroup};
pub use state::{PowerState, ZoneSnapshot, ZoneState, ZoneStateManager};

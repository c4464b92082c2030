//! Trait abstraction for amplifier commands.
//!
//! Zone controllers depend on [`AmpControl`] rather than on the concrete
//! client, so their power/mute policy can be tested against a recorder.

use async_trait::async_trait;

use crate::amp::topology::LogicalInput;
use crate::error::AmpResult;

/// Command-level control of one amplifier.
///
/// Every method validates its arguments before sending anything. A returned
/// `Ok` means the commands were sent, not that the device applied them.
#[async_trait]
pub trait AmpControl: Send + Sync {
    /// Routes a logical input to an output. [`LogicalInput::NO_INPUT`]
    /// disconnects the output.
    async fn select_input(&self, output: u8, input: LogicalInput) -> AmpResult<()>;

    /// Sets the channel volume of an output (0.0–1.0).
    async fn set_volume(&self, output: u8, volume: f64) -> AmpResult<()>;

    /// Sets the L/R balance of an output.
    async fn set_balance(&self, output: u8, balance: i32) -> AmpResult<()>;

    /// Sets the gain of a physical input port (dB).
    async fn set_input_gain(&self, port: u8, gain: i32, is_digital: bool) -> AmpResult<()>;

    /// Sets the bass level of an output (dB).
    async fn set_bass(&self, output: u8, level: i32) -> AmpResult<()>;

    /// Sets the treble level of an output (dB).
    async fn set_treble(&self, output: u8, level: i32) -> AmpResult<()>;
}

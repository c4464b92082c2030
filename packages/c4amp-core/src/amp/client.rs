//! Validated command layer over a [`CommandTransport`].
//!
//! Arguments are range-checked before anything reaches the wire; a rejected
//! call is logged, returned to the caller and sends nothing.

use std::sync::Arc;

use async_trait::async_trait;

use crate::amp::codec::{encode_flag, encode_index, encode_volume};
use crate::amp::topology::{self, LogicalInput, SourceKind};
use crate::amp::traits::AmpControl;
use crate::amp::transport::{CommandTransport, TransportState};
use crate::error::{AmpError, AmpResult};
use crate::protocol_constants::{
    BALANCE_MAX, BALANCE_MIN, CMD_BALANCE, CMD_BASS, CMD_DIGITAL, CMD_INPUT_GAIN, CMD_OUTPUT,
    CMD_TREBLE, CMD_VOLUME, GAIN_MAX, GAIN_MIN, NUM_OUTPUTS, TONE_MAX, TONE_MIN,
};

/// Command client for one amplifier.
pub struct AmplifierClient {
    transport: Arc<dyn CommandTransport>,
    output_count: u8,
    await_responses: bool,
}

impl AmplifierClient {
    /// Creates a client accepting outputs `1..=output_count`.
    ///
    /// `output_count` is clamped to the device maximum.
    pub fn new(transport: Arc<dyn CommandTransport>, output_count: u8) -> Self {
        Self {
            transport,
            output_count: output_count.min(NUM_OUTPUTS),
            await_responses: true,
        }
    }

    /// Sets whether each send waits for a reply.
    #[must_use]
    pub fn with_await_responses(mut self, await_responses: bool) -> Self {
        self.await_responses = await_responses;
        self
    }

    pub fn output_count(&self) -> u8 {
        self.output_count
    }

    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    /// Opens the transport.
    pub async fn start(&self) -> AmpResult<()> {
        self.transport.open().await.map_err(|e| {
            log::error!("[Amp] Failed to open transport: {}", e);
            AmpError::from(e)
        })
    }

    /// Closes the transport. Later commands re-open it.
    pub async fn stop(&self) {
        self.transport.close().await;
    }

    /// Sets the gain of whichever physical port backs `input`.
    pub async fn set_logical_input_gain(&self, input: LogicalInput, gain: i32) -> AmpResult<()> {
        let (port, is_digital) = topology::gain_target(input)
            .map_err(AmpError::from)
            .inspect_err(log_rejection)?;
        self.set_input_gain(port, gain, is_digital).await
    }

    fn check_output(&self, output: u8) -> AmpResult<()> {
        if (1..=self.output_count).contains(&output) {
            return Ok(());
        }
        let err = AmpError::InvalidOutput {
            output,
            max: self.output_count,
        };
        log_rejection(&err);
        Err(err)
    }

    async fn send(&self, body: String) -> AmpResult<()> {
        let reply = self
            .transport
            .send(&body, self.await_responses)
            .await
            .map_err(|e| {
                log::error!("[Amp] Command '{}' failed: {}", body, e);
                AmpError::from(e)
            })?;

        if let Some(reply) = reply {
            log::debug!("[Amp] Reply to '{}': {}", body, reply.trim_end());
        }
        Ok(())
    }
}

fn check_range(parameter: &'static str, value: i32, min: i32, max: i32) -> AmpResult<()> {
    if (min..=max).contains(&value) {
        return Ok(());
    }
    let err = AmpError::out_of_range(parameter, value, min, max);
    log_rejection(&err);
    Err(err)
}

fn log_rejection(err: &AmpError) {
    log::error!("[Amp] Rejected command: {}", err);
}

#[async_trait]
impl AmpControl for AmplifierClient {
    async fn select_input(&self, output: u8, input: LogicalInput) -> AmpResult<()> {
        self.check_output(output)?;
        let out = encode_index(i32::from(output));

        if input.is_no_input() {
            return self.send(format!("{} {} 00", CMD_OUTPUT, out)).await;
        }

        let (kind, port) = topology::resolve(input)
            .and_then(|(kind, port)| topology::validate_port(port, kind).map(|_| (kind, port)))
            .map_err(AmpError::from)
            .inspect_err(log_rejection)?;
        let port = encode_index(i32::from(port));

        log::info!("[Amp] Output {} -> input {} ({} port {})", output, input, kind, port);
        self.send(format!("{} {} {}", CMD_OUTPUT, out, port)).await?;
        self.send(format!(
            "{} {} {}",
            CMD_DIGITAL,
            port,
            encode_flag(kind == SourceKind::Digital)
        ))
        .await
    }

    async fn set_volume(&self, output: u8, volume: f64) -> AmpResult<()> {
        self.check_output(output)?;
        if !volume.is_finite() || !(0.0..=1.0).contains(&volume) {
            let err = AmpError::out_of_range("volume", volume, 0.0, 1.0);
            log_rejection(&err);
            return Err(err);
        }
        self.send(format!(
            "{} {} {}",
            CMD_VOLUME,
            encode_index(i32::from(output)),
            encode_volume(volume)
        ))
        .await
    }

    async fn set_balance(&self, output: u8, balance: i32) -> AmpResult<()> {
        self.check_output(output)?;
        check_range("balance", balance, BALANCE_MIN, BALANCE_MAX)?;
        self.send(format!(
            "{} {} {}",
            CMD_BALANCE,
            encode_index(i32::from(output)),
            encode_index(balance)
        ))
        .await
    }

    async fn set_input_gain(&self, port: u8, gain: i32, is_digital: bool) -> AmpResult<()> {
        check_range("gain", gain, GAIN_MIN, GAIN_MAX)?;
        let kind = if is_digital {
            SourceKind::Digital
        } else {
            SourceKind::Analog
        };
        topology::validate_port(port, kind)
            .map_err(AmpError::from)
            .inspect_err(log_rejection)?;

        let target = if is_digital {
            format!("d{}", port)
        } else {
            port.to_string()
        };
        self.send(format!("{} {} {}", CMD_INPUT_GAIN, target, encode_index(gain)))
            .await
    }

    async fn set_bass(&self, output: u8, level: i32) -> AmpResult<()> {
        self.check_output(output)?;
        check_range("bass", level, TONE_MIN, TONE_MAX)?;
        self.send(format!(
            "{} {} {}",
            CMD_BASS,
            encode_index(i32::from(output)),
            encode_index(level)
        ))
        .await
    }

    async fn set_treble(&self, output: u8, level: i32) -> AmpResult<()> {
        self.check_output(output)?;
        check_range("treble", level, TONE_MIN, TONE_MAX)?;
        self.send(format!(
            "{} {} {}",
            CMD_TREBLE,
            encode_index(i32::from(output)),
            encode_index(level)
        ))
        .await
    }
}

//! Shared test doubles for zone tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::amp::topology::LogicalInput;
use crate::amp::traits::AmpControl;
use crate::amp::transport::TransportError;
use crate::error::{AmpError, AmpResult};
use crate::events::{AmplifierEvent, EventEmitter, ZoneEvent};

/// One recorded amplifier call.
#[derive(Debug, Clone, PartialEq)]
pub enum AmpCall {
    Input(u8, LogicalInput),
    Volume(u8, f64),
}

/// Records calls instead of sending them. Outputs listed in `failing`
/// return a transport error. Zones never touch tone or gain, so those
/// methods panic.
#[derive(Default)]
pub struct RecordingAmp {
    calls: Mutex<Vec<AmpCall>>,
    failing: Mutex<Vec<u8>>,
}

impl RecordingAmp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_output(&self, output: u8) {
        self.failing.lock().push(output);
    }

    pub fn calls(&self) -> Vec<AmpCall> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, output: u8) -> Vec<AmpCall> {
        self.calls()
            .into_iter()
            .filter(|call| match call {
                AmpCall::Input(o, _) | AmpCall::Volume(o, _) => *o == output,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, output: u8, call: AmpCall) -> AmpResult<()> {
        if self.failing.lock().contains(&output) {
            return Err(AmpError::Transport(TransportError::Send(
                std::io::Error::new(std::io::ErrorKind::Other, "network unreachable"),
            )));
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

#[async_trait]
impl AmpControl for RecordingAmp {
    async fn select_input(&self, output: u8, input: LogicalInput) -> AmpResult<()> {
        self.record(output, AmpCall::Input(output, input))
    }

    async fn set_volume(&self, output: u8, volume: f64) -> AmpResult<()> {
        self.record(output, AmpCall::Volume(output, volume))
    }

    async fn set_balance(&self, output: u8, _balance: i32) -> AmpResult<()> {
        unreachable!("zone {} sent balance", output)
    }

    async fn set_input_gain(&self, port: u8, _gain: i32, _is_digital: bool) -> AmpResult<()> {
        unreachable!("input gain sent for port {}", port)
    }

    async fn set_bass(&self, output: u8, _level: i32) -> AmpResult<()> {
        unreachable!("zone {} sent bass", output)
    }

    async fn set_treble(&self, output: u8, _level: i32) -> AmpResult<()> {
        unreachable!("zone {} sent treble", output)
    }
}

/// Collects emitted events.
#[derive(Default)]
pub struct CollectingEmitter {
    pub zone: Mutex<Vec<ZoneEvent>>,
    pub amplifier: Mutex<Vec<AmplifierEvent>>,
}

impl EventEmitter for CollectingEmitter {
    fn emit_zone(&self, event: ZoneEvent) {
        self.zone.lock().push(event);
    }

    fn emit_amplifier(&self, event: AmplifierEvent) {
        self.amplifier.lock().push(event);
    }
}

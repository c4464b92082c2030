//! Power, mute and source policy for one output zone.
//!
//! The controller sends commands through [`AmpControl`] and records the
//! result in its [`ZoneStateManager`]. State is only updated for commands
//! that were sent successfully; a reply timeout still counts as sent.
//!
//! Operations on the same zone run one at a time. Zones are independent.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::amp::topology::{LogicalInput, TopologyError};
use crate::amp::traits::AmpControl;
use crate::config::InputTable;
use crate::error::{AmpError, AmpResult, ErrorCode};
use crate::events::{AmplifierEvent, EventEmitter, ZoneEvent};
use crate::protocol_constants::DEFAULT_ZONE_VOLUME;
use crate::utils::now_millis;
use crate::zone::state::{PowerState, ZoneSnapshot, ZoneState, ZoneStateManager};

/// Controller for a single amplifier output.
pub struct ZoneController {
    output: u8,
    name: String,
    amp: Arc<dyn AmpControl>,
    inputs: RwLock<InputTable>,
    state: Mutex<ZoneStateManager>,
    emitter: Arc<dyn EventEmitter>,
    ops: tokio::sync::Mutex<()>,
}

impl ZoneController {
    pub fn new(
        output: u8,
        name: impl Into<String>,
        amp: Arc<dyn AmpControl>,
        inputs: InputTable,
        emitter: Arc<dyn EventEmitter>,
    ) -> Self {
        Self {
            output,
            name: name.into(),
            amp,
            inputs: RwLock::new(inputs),
            state: Mutex::new(ZoneStateManager::new()),
            emitter,
            ops: tokio::sync::Mutex::new(()),
        }
    }

    pub fn output(&self) -> u8 {
        self.output
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Powers the zone on, restoring the input and volume it had before the
    /// last power transition.
    ///
    /// Without a usable snapshot the first enabled input is selected at the
    /// default volume. A zone that is already on is left alone.
    pub async fn turn_on(&self) -> AmpResult<()> {
        let _op = self.ops.lock().await;
        let before = self.current();
        let result = self.power_on().await;
        self.finish(&before, result)
    }

    /// Powers the zone off by disconnecting its input.
    pub async fn turn_off(&self) -> AmpResult<()> {
        let _op = self.ops.lock().await;
        let before = self.current();
        let result = self.power_off().await;
        self.finish(&before, result)
    }

    /// Mutes or unmutes. Does nothing if the zone is already in that state.
    ///
    /// Unmuting never restores below the default volume.
    pub async fn mute(&self, mute: bool) -> AmpResult<()> {
        let _op = self.ops.lock().await;
        let before = self.current();
        let result = self.apply_mute(mute).await;
        self.finish(&before, result)
    }

    /// Selects the enabled input carrying `label` and powers the zone on.
    pub async fn select_source(&self, label: &str) -> AmpResult<()> {
        let input = self.inputs.read().input_for_label(label);
        match input {
            Some(input) => self.select_input(input).await,
            None => {
                let err = AmpError::UnknownSource(label.to_string());
                log::warn!("[Zone {}] {}", self.output, err);
                Err(err)
            }
        }
    }

    /// Routes a logical input to this zone and powers it on.
    ///
    /// [`LogicalInput::NO_INPUT`] is rejected; disconnecting is
    /// [`turn_off`](Self::turn_off)'s job.
    pub async fn select_input(&self, input: LogicalInput) -> AmpResult<()> {
        let _op = self.ops.lock().await;
        let before = self.current();
        let result = self.route(input).await;
        self.finish(&before, result)
    }

    /// Sets the volume. An explicit volume also clears mute.
    pub async fn set_volume(&self, volume: f64) -> AmpResult<()> {
        let _op = self.ops.lock().await;
        let before = self.current();
        let result = self
            .amp
            .set_volume(self.output, volume)
            .await
            .map(|()| self.state.lock().set_volume(volume));
        self.finish(&before, result)
    }

    /// Replaces the input label table.
    ///
    /// A selected input that is no longer enabled is forgotten; the device
    /// keeps playing it until the next selection.
    pub fn replace_inputs(&self, inputs: InputTable) {
        let before = self.current();
        {
            let mut state = self.state.lock();
            if let Some(input) = state.current().routed_input() {
                if !inputs.is_enabled(input) {
                    log::info!(
                        "[Zone {}] Input {} is no longer enabled, clearing selection",
                        self.output,
                        input
                    );
                    state.set_input_source(None);
                }
            }
        }
        let sources = inputs.labels();
        *self.inputs.write() = inputs;

        self.emitter.emit_zone(ZoneEvent::SourceListChanged {
            output: self.output,
            sources,
            timestamp: now_millis(),
        });
        self.publish(&before);
    }

    /// Replaces recorded state from external storage. Sends nothing.
    pub fn restore_snapshot(&self, snapshot: ZoneSnapshot) {
        self.state.lock().restore(snapshot);
        log::debug!("[Zone {}] Restored state snapshot", self.output);
        self.emitter.emit_zone(ZoneEvent::StateRestored {
            output: self.output,
            timestamp: now_millis(),
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors (no wire traffic)
    // ─────────────────────────────────────────────────────────────────────────

    pub fn volume(&self) -> f64 {
        self.state.lock().current().volume
    }

    pub fn is_muted(&self) -> bool {
        self.state.lock().current().is_muted
    }

    pub fn power(&self) -> PowerState {
        self.state.lock().current().power
    }

    pub fn is_on(&self) -> bool {
        self.power().is_on()
    }

    /// Recorded input, `Some(NO_INPUT)` once turned off.
    pub fn input(&self) -> Option<LogicalInput> {
        self.state.lock().current().input_source
    }

    /// Label of the selected input, if it is enabled.
    pub fn source(&self) -> Option<String> {
        let input = self.input()?;
        self.inputs.read().label_for(input)
    }

    /// Labels of all enabled inputs.
    pub fn source_list(&self) -> Vec<String> {
        self.inputs.read().labels()
    }

    pub fn snapshot(&self) -> ZoneSnapshot {
        self.state.lock().snapshot()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn current(&self) -> ZoneState {
        self.state.lock().current().clone()
    }

    async fn power_on(&self) -> AmpResult<()> {
        if self.is_on() {
            log::debug!("[Zone {}] Already on", self.output);
            return Ok(());
        }

        let previous = self.state.lock().previous().cloned();
        let restorable = previous
            .as_ref()
            .and_then(|prev| prev.routed_input().map(|input| (input, prev)));

        if let Some((input, prev)) = restorable {
            log::info!(
                "[Zone {}] Restoring input {} (volume {:.2}, muted {})",
                self.output,
                input,
                prev.volume,
                prev.is_muted
            );
            self.amp.select_input(self.output, input).await?;
            self.state.lock().set_input_source(Some(input));

            if prev.is_muted {
                self.amp.set_volume(self.output, 0.0).await?;
                self.state.lock().set_mute(true);
            } else {
                self.amp.set_volume(self.output, prev.volume).await?;
                self.state.lock().set_volume(prev.volume);
            }
        } else {
            let first = self.inputs.read().first_enabled();
            match first {
                Some(input) => {
                    log::info!("[Zone {}] No previous state, using input {}", self.output, input);
                    self.amp.select_input(self.output, input).await?;
                    self.state.lock().set_input_source(Some(input));

                    if !self.is_muted() {
                        self.amp.set_volume(self.output, DEFAULT_ZONE_VOLUME).await?;
                        self.state.lock().set_volume(DEFAULT_ZONE_VOLUME);
                    }
                }
                None => log::warn!(
                    "[Zone {}] No enabled inputs, powering on without a source",
                    self.output
                ),
            }
        }

        self.state.lock().set_power(true);
        Ok(())
    }

    async fn power_off(&self) -> AmpResult<()> {
        self.state.lock().set_power(false);
        self.amp
            .select_input(self.output, LogicalInput::NO_INPUT)
            .await?;
        self.state
            .lock()
            .set_input_source(Some(LogicalInput::NO_INPUT));
        Ok(())
    }

    async fn apply_mute(&self, mute: bool) -> AmpResult<()> {
        if self.is_muted() == mute {
            return Ok(());
        }

        if mute {
            self.amp.set_volume(self.output, 0.0).await?;
            self.state.lock().set_mute(true);
            return Ok(());
        }

        let restored = {
            let state = self.state.lock();
            let current = state.current();
            current.pre_mute_volume.unwrap_or(current.volume)
        };
        let volume = restored.max(DEFAULT_ZONE_VOLUME);
        self.amp.set_volume(self.output, volume).await?;

        let mut state = self.state.lock();
        state.set_mute(false);
        state.set_volume(volume);
        Ok(())
    }

    async fn route(&self, input: LogicalInput) -> AmpResult<()> {
        if input == LogicalInput::NO_INPUT {
            let err = AmpError::InvalidInput(TopologyError::Unmapped(input));
            log::warn!("[Zone {}] {}", self.output, err);
            return Err(err);
        }

        self.amp.select_input(self.output, input).await?;
        let mut state = self.state.lock();
        state.set_input_source(Some(input));
        state.set_power(true);
        Ok(())
    }

    /// Emits events for whatever changed and reports failures.
    fn finish(&self, before: &ZoneState, result: AmpResult<()>) -> AmpResult<()> {
        self.publish(before);
        if let Err(e) = &result {
            self.emitter.emit_amplifier(AmplifierEvent::CommandFailed {
                output: self.output,
                code: e.code().to_string(),
                message: e.to_string(),
                timestamp: now_millis(),
            });
        }
        result
    }

    fn publish(&self, before: &ZoneState) {
        let after = self.current();
        let timestamp = now_millis();
        let output = self.output;

        if after.input_source != before.input_source {
            let label = after
                .input_source
                .and_then(|input| self.inputs.read().label_for(input));
            self.emitter.emit_zone(ZoneEvent::SourceChanged {
                output,
                input: after.input_source,
                label,
                timestamp,
            });
        }
        if after.volume != before.volume {
            self.emitter.emit_zone(ZoneEvent::VolumeChanged {
                output,
                volume: after.volume,
                timestamp,
            });
        }
        if after.is_muted != before.is_muted {
            self.emitter.emit_zone(ZoneEvent::MuteChanged {
                output,
                muted: after.is_muted,
                timestamp,
            });
        }
        if after.power != before.power {
            log::info!("[Zone {}] Power {:?}", output, after.power);
            self.emitter.emit_zone(ZoneEvent::PowerChanged {
                output,
                power: after.power,
                timestamp,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputConfig;
    use crate::events::NoopEventEmitter;
    use crate::zone::test_fixtures::{AmpCall, CollectingEmitter, RecordingAmp};
    use std::collections::BTreeMap;

    fn zone(amp: &Arc<RecordingAmp>) -> ZoneController {
        ZoneController::new(
            1,
            "Kitchen",
            Arc::clone(amp) as Arc<dyn AmpControl>,
            InputTable::default(),
            Arc::new(NoopEventEmitter),
        )
    }

    fn inputs(enabled: &[(u8, &str)]) -> InputTable {
        InputTable::new(
            enabled
                .iter()
                .map(|&(n, name)| {
                    (
                        n,
                        InputConfig {
                            name: Some(name.to_string()),
                            enabled: true,
                        },
                    )
                })
                .collect::<BTreeMap<_, _>>(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn first_power_on_uses_first_enabled_input_and_default_volume() {
        let amp = RecordingAmp::new();
        let zone = ZoneController::new(
            2,
            "Patio",
            Arc::clone(&amp) as Arc<dyn AmpControl>,
            inputs(&[(3, "Tuner"), (5, "TV")]),
            Arc::new(NoopEventEmitter),
        );

        zone.turn_on().await.unwrap();

        assert_eq!(
            amp.calls(),
            vec![
                AmpCall::Input(2, LogicalInput(3)),
                AmpCall::Volume(2, DEFAULT_ZONE_VOLUME)
            ]
        );
        assert!(zone.is_on());
        assert_eq!(zone.source().as_deref(), Some("Tuner"));
        assert_eq!(zone.volume(), DEFAULT_ZONE_VOLUME);
    }

    #[tokio::test]
    async fn power_cycle_restores_input_and_volume() {
        let amp = RecordingAmp::new();
        let zone = zone(&amp);
        zone.select_input(LogicalInput(2)).await.unwrap();
        zone.set_volume(0.6).await.unwrap();

        zone.turn_off().await.unwrap();
        assert!(!zone.is_on());
        assert_eq!(zone.input(), Some(LogicalInput::NO_INPUT));
        assert_eq!(zone.source(), None);

        amp.clear();
        zone.turn_on().await.unwrap();

        assert_eq!(
            amp.calls(),
            vec![AmpCall::Input(1, LogicalInput(2)), AmpCall::Volume(1, 0.6)]
        );
        assert_eq!(zone.power(), PowerState::On);
        assert_eq!(zone.input(), Some(LogicalInput(2)));
        assert_eq!(zone.volume(), 0.6);
    }

    #[tokio::test]
    async fn mute_survives_power_cycle() {
        let amp = RecordingAmp::new();
        let zone = zone(&amp);
        zone.select_input(LogicalInput(1)).await.unwrap();
        zone.set_volume(0.7).await.unwrap();
        zone.mute(true).await.unwrap();

        zone.turn_off().await.unwrap();
        amp.clear();
        zone.turn_on().await.unwrap();

        assert_eq!(
            amp.calls(),
            vec![AmpCall::Input(1, LogicalInput(1)), AmpCall::Volume(1, 0.0)]
        );
        assert!(zone.is_muted());
        assert!(zone.is_on());
    }

    #[tokio::test]
    async fn turn_off_disconnects_input() {
        let amp = RecordingAmp::new();
        let zone = zone(&amp);
        zone.select_input(LogicalInput(4)).await.unwrap();
        amp.clear();

        zone.turn_off().await.unwrap();
        assert_eq!(amp.calls(), vec![AmpCall::Input(1, LogicalInput::NO_INPUT)]);
        assert_eq!(zone.snapshot().previous.unwrap().input_source, Some(LogicalInput(4)));
    }

    #[tokio::test]
    async fn turn_on_when_on_sends_nothing() {
        let amp = RecordingAmp::new();
        let zone = zone(&amp);
        zone.select_input(LogicalInput(2)).await.unwrap();
        amp.clear();

        zone.turn_on().await.unwrap();
        assert!(amp.calls().is_empty());
    }

    #[tokio::test]
    async fn mute_sends_zero_and_is_idempotent() {
        let amp = RecordingAmp::new();
        let zone = zone(&amp);
        zone.set_volume(0.5).await.unwrap();
        amp.clear();

        zone.mute(true).await.unwrap();
        zone.mute(true).await.unwrap();
        assert_eq!(amp.calls(), vec![AmpCall::Volume(1, 0.0)]);
        assert!(zone.is_muted());
        assert_eq!(zone.volume(), 0.5);
    }

    #[tokio::test]
    async fn unmute_when_unmuted_sends_nothing() {
        let amp = RecordingAmp::new();
        let zone = zone(&amp);
        zone.set_volume(0.4).await.unwrap();
        amp.clear();

        zone.mute(false).await.unwrap();
        zone.mute(false).await.unwrap();
        assert!(amp.calls().is_empty());
        assert!(!zone.is_muted());
        assert_eq!(zone.volume(), 0.4);
    }

    #[tokio::test]
    async fn unmute_restores_previous_volume() {
        let amp = RecordingAmp::new();
        let zone = zone(&amp);
        zone.set_volume(0.6).await.unwrap();
        zone.mute(true).await.unwrap();
        amp.clear();

        zone.mute(false).await.unwrap();
        assert_eq!(amp.calls(), vec![AmpCall::Volume(1, 0.6)]);
        assert!(!zone.is_muted());
        assert_eq!(zone.volume(), 0.6);
    }

    #[tokio::test]
    async fn unmute_never_restores_below_floor() {
        let amp = RecordingAmp::new();
        let zone = zone(&amp);
        zone.set_volume(0.0).await.unwrap();
        zone.mute(true).await.unwrap();
        amp.clear();

        zone.mute(false).await.unwrap();
        assert_eq!(amp.calls(), vec![AmpCall::Volume(1, DEFAULT_ZONE_VOLUME)]);
        assert_eq!(zone.volume(), DEFAULT_ZONE_VOLUME);
    }

    #[tokio::test]
    async fn select_source_by_label_powers_on() {
        let amp = RecordingAmp::new();
        let zone = zone(&amp);

        zone.select_source("Digital Input 2").await.unwrap();
        assert_eq!(amp.calls(), vec![AmpCall::Input(1, LogicalInput(6))]);
        assert!(zone.is_on());
        assert_eq!(zone.source().as_deref(), Some("Digital Input 2"));
    }

    #[tokio::test]
    async fn selecting_no_input_is_rejected() {
        let amp = RecordingAmp::new();
        let emitter = Arc::new(CollectingEmitter::default());
        let zone = ZoneController::new(
            1,
            "Kitchen",
            Arc::clone(&amp) as Arc<dyn AmpControl>,
            InputTable::default(),
            Arc::clone(&emitter) as Arc<dyn EventEmitter>,
        );

        let err = zone.select_input(LogicalInput::NO_INPUT).await.unwrap_err();
        assert_eq!(err.code(), "input_unmapped");
        assert!(amp.calls().is_empty());
        assert_eq!(zone.power(), PowerState::Off);
        assert_eq!(zone.input(), None);
        assert!(emitter.zone.lock().is_empty());
        assert_eq!(emitter.amplifier.lock().len(), 1);

        zone.turn_on().await.unwrap();
        assert_eq!(amp.calls()[0], AmpCall::Input(1, LogicalInput(1)));
        assert!(zone.is_on());
    }

    #[tokio::test]
    async fn unknown_label_is_rejected() {
        let amp = RecordingAmp::new();
        let zone = zone(&amp);
        let err = zone.select_source("Cassette").await.unwrap_err();
        assert_eq!(err.code(), "unknown_source");
        assert!(amp.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_send_leaves_state_untouched() {
        let amp = RecordingAmp::new();
        let emitter = Arc::new(CollectingEmitter::default());
        let zone = ZoneController::new(
            3,
            "Den",
            Arc::clone(&amp) as Arc<dyn AmpControl>,
            InputTable::default(),
            emitter.clone(),
        );
        amp.fail_output(3);

        assert!(zone.set_volume(0.8).await.is_err());
        assert_eq!(zone.volume(), 0.0);
        assert!(zone.select_input(LogicalInput(2)).await.is_err());
        assert!(!zone.is_on());

        assert!(emitter.zone.lock().is_empty());
        assert_eq!(emitter.amplifier.lock().len(), 2);
    }

    #[tokio::test]
    async fn events_follow_state_changes() {
        let amp = RecordingAmp::new();
        let emitter = Arc::new(CollectingEmitter::default());
        let zone = ZoneController::new(
            1,
            "Kitchen",
            Arc::clone(&amp) as Arc<dyn AmpControl>,
            InputTable::default(),
            emitter.clone(),
        );

        zone.select_input(LogicalInput(2)).await.unwrap();
        let events = emitter.zone.lock().clone();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            ZoneEvent::SourceChanged { input: Some(LogicalInput(2)), label: Some(l), .. }
                if l == "Analog Input 2"
        ));
        assert!(matches!(
            events[1],
            ZoneEvent::PowerChanged { power: PowerState::On, .. }
        ));
    }

    #[tokio::test]
    async fn replacing_inputs_clears_disabled_selection() {
        let amp = RecordingAmp::new();
        let emitter = Arc::new(CollectingEmitter::default());
        let zone = ZoneController::new(
            1,
            "Kitchen",
            Arc::clone(&amp) as Arc<dyn AmpControl>,
            InputTable::default(),
            emitter.clone(),
        );
        zone.select_input(LogicalInput(5)).await.unwrap();
        emitter.zone.lock().clear();

        zone.replace_inputs(inputs(&[(1, "Turntable"), (2, "TV")]));

        assert_eq!(zone.input(), None);
        assert_eq!(zone.source_list(), vec!["Turntable".to_string(), "TV".to_string()]);
        let events = emitter.zone.lock().clone();
        assert!(matches!(&events[0], ZoneEvent::SourceListChanged { sources, .. } if sources.len() == 2));
        assert!(matches!(events[1], ZoneEvent::SourceChanged { input: None, .. }));
    }

    #[tokio::test]
    async fn replacing_inputs_keeps_enabled_selection() {
        let amp = RecordingAmp::new();
        let zone = zone(&amp);
        zone.select_input(LogicalInput(2)).await.unwrap();

        zone.replace_inputs(inputs(&[(2, "TV")]));
        assert_eq!(zone.source().as_deref(), Some("TV"));
    }

    #[tokio::test]
    async fn snapshot_round_trip_restores_power_policy() {
        let amp = RecordingAmp::new();
        let original = zone(&amp);
        original.select_input(LogicalInput(3)).await.unwrap();
        original.set_volume(0.45).await.unwrap();
        original.turn_off().await.unwrap();

        let stored = serde_json::to_string(&original.snapshot()).unwrap();

        let restored = zone(&amp);
        restored.restore_snapshot(serde_json::from_str(&stored).unwrap());
        amp.clear();
        restored.turn_on().await.unwrap();

        assert_eq!(
            amp.calls(),
            vec![AmpCall::Input(1, LogicalInput(3)), AmpCall::Volume(1, 0.45)]
        );
    }
}

//! Recorded per-zone state with save-and-restore across power cycles.
//!
//! The amplifier never reports its state back, so this is the only record of
//! what a zone is doing. It is updated optimistically after commands are sent.

use serde::{Deserialize, Serialize};

use crate::amp::topology::LogicalInput;

/// Zone power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    #[default]
    Off,
}

impl PowerState {
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

/// Everything recorded about one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneState {
    /// Volume level, 0.0–1.0.
    pub volume: f64,
    /// Selected logical input. `Some(NO_INPUT)` while the zone is off.
    pub input_source: Option<LogicalInput>,
    pub is_muted: bool,
    /// Volume captured on the last mute. Kept after unmute.
    pub pre_mute_volume: Option<f64>,
    pub power: PowerState,
}

impl Default for ZoneState {
    fn default() -> Self {
        Self {
            volume: 0.0,
            input_source: None,
            is_muted: false,
            pre_mute_volume: None,
            power: PowerState::Off,
        }
    }
}

impl ZoneState {
    /// The recorded input, if it is a real source rather than a disconnect.
    pub fn routed_input(&self) -> Option<LogicalInput> {
        self.input_source.filter(|input| !input.is_no_input())
    }
}

/// Serialisable copy of a zone's state manager, for external storage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ZoneSnapshot {
    pub current: ZoneState,
    pub previous: Option<ZoneState>,
}

/// Current state plus the snapshot taken before the last power transition.
#[derive(Debug, Clone, Default)]
pub struct ZoneStateManager {
    current: ZoneState,
    previous: Option<ZoneState>,
}

impl ZoneStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &ZoneState {
        &self.current
    }

    /// Snapshot taken before the most recent power transition.
    pub fn previous(&self) -> Option<&ZoneState> {
        self.previous.as_ref()
    }

    /// Switches power, snapshotting first. Returns false when already there.
    pub fn set_power(&mut self, on: bool) -> bool {
        let target = if on { PowerState::On } else { PowerState::Off };
        if self.current.power == target {
            return false;
        }
        self.previous = Some(self.current.clone());
        self.current.power = target;
        true
    }

    /// Mutes or unmutes. Returns false when the flag is unchanged.
    ///
    /// Muting captures the current volume; unmuting restores it without
    /// clearing the capture.
    pub fn set_mute(&mut self, mute: bool) -> bool {
        if self.current.is_muted == mute {
            return false;
        }
        if mute {
            self.current.pre_mute_volume = Some(self.current.volume);
        } else if let Some(volume) = self.current.pre_mute_volume {
            self.current.volume = volume;
        }
        self.current.is_muted = mute;
        true
    }

    /// Records a volume. An explicit volume always unmutes.
    pub fn set_volume(&mut self, volume: f64) {
        self.current.volume = volume;
        self.current.is_muted = false;
    }

    pub fn set_input_source(&mut self, input: Option<LogicalInput>) {
        self.current.input_source = input;
    }

    pub fn snapshot(&self) -> ZoneSnapshot {
        ZoneSnapshot {
            current: self.current.clone(),
            previous: self.previous.clone(),
        }
    }

    /// Replaces both current state and snapshot, e.g. after a restart.
    pub fn restore(&mut self, snapshot: ZoneSnapshot) {
        self.current = snapshot.current;
        self.previous = snapshot.previous;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_off_and_silent() {
        let manager = ZoneStateManager::new();
        assert_eq!(manager.current(), &ZoneState::default());
        assert!(!manager.current().power.is_on());
        assert!(manager.previous().is_none());
    }

    #[test]
    fn power_transition_snapshots_first() {
        let mut manager = ZoneStateManager::new();
        manager.set_volume(0.6);
        manager.set_input_source(Some(LogicalInput(2)));

        assert!(manager.set_power(true));
        let previous = manager.previous().unwrap();
        assert_eq!(previous.power, PowerState::Off);
        assert_eq!(previous.volume, 0.6);
        assert_eq!(manager.current().power, PowerState::On);
    }

    #[test]
    fn repeated_power_is_a_no_op() {
        let mut manager = ZoneStateManager::new();
        assert!(!manager.set_power(false));
        assert!(manager.previous().is_none());

        manager.set_power(true);
        manager.set_volume(0.4);
        assert!(!manager.set_power(true));
        assert_eq!(manager.previous().unwrap().volume, 0.0);
    }

    #[test]
    fn mute_is_idempotent() {
        let mut manager = ZoneStateManager::new();
        manager.set_volume(0.5);

        assert!(manager.set_mute(true));
        let once = manager.current().clone();
        assert!(!manager.set_mute(true));
        assert_eq!(manager.current(), &once);
        assert_eq!(once.pre_mute_volume, Some(0.5));
    }

    #[test]
    fn unmute_is_idempotent() {
        let mut manager = ZoneStateManager::new();
        manager.set_volume(0.5);
        manager.set_mute(true);

        assert!(manager.set_mute(false));
        let once = manager.current().clone();
        assert!(!manager.set_mute(false));
        assert_eq!(manager.current(), &once);
        assert_eq!(once.volume, 0.5);
    }

    #[test]
    fn unmute_restores_volume_and_keeps_capture() {
        let mut manager = ZoneStateManager::new();
        manager.set_volume(0.7);
        manager.set_mute(true);

        assert!(manager.set_mute(false));
        assert_eq!(manager.current().volume, 0.7);
        assert_eq!(manager.current().pre_mute_volume, Some(0.7));
        assert!(!manager.current().is_muted);
    }

    #[test]
    fn set_volume_clears_mute() {
        let mut manager = ZoneStateManager::new();
        manager.set_mute(true);
        manager.set_volume(0.2);
        assert!(!manager.current().is_muted);
    }

    #[test]
    fn routed_input_skips_disconnect() {
        let mut state = ZoneState::default();
        assert_eq!(state.routed_input(), None);
        state.input_source = Some(LogicalInput::NO_INPUT);
        assert_eq!(state.routed_input(), None);
        state.input_source = Some(LogicalInput(5));
        assert_eq!(state.routed_input(), Some(LogicalInput(5)));
    }

    #[test]
    fn state_serializes_for_external_storage() {
        let state = ZoneState {
            volume: 0.45,
            input_source: Some(LogicalInput(3)),
            is_muted: true,
            pre_mute_volume: Some(0.45),
            power: PowerState::On,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["inputSource"], 3);
        assert_eq!(json["power"], "on");
        assert_eq!(json["isMuted"], true);

        let back: ZoneState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn snapshot_restores_both_slots() {
        let mut manager = ZoneStateManager::new();
        manager.set_input_source(Some(LogicalInput(4)));
        manager.set_power(true);
        let snapshot = manager.snapshot();

        let mut fresh = ZoneStateManager::new();
        fresh.restore(snapshot.clone());
        assert_eq!(fresh.current(), manager.current());
        assert_eq!(fresh.previous(), manager.previous());
        assert_eq!(fresh.snapshot(), snapshot);
    }
}

//! Aggregate control over every configured zone.
//!
//! Each operation runs once per zone, concurrently. Zones share the transport
//! lock, so their commands still reach the wire one at a time, in no
//! particular zone order.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;

use crate::config::InputTable;
use crate::error::{AmpError, AmpResult};
use crate::zone::controller::ZoneController;

/// Result of applying one operation to every zone.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GroupOutcome {
    /// Number of zones that succeeded.
    pub success: usize,
    /// Number of zones attempted.
    pub total: usize,
    /// (output, error) pairs for failures.
    pub failures: Vec<(u8, String)>,
}

impl GroupOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// All zones of one amplifier, addressed as a unit.
pub struct ZoneGroup {
    zones: Vec<Arc<ZoneController>>,
    inputs: RwLock<InputTable>,
}

impl ZoneGroup {
    pub fn new(zones: Vec<Arc<ZoneController>>, inputs: InputTable) -> Self {
        Self {
            zones,
            inputs: RwLock::new(inputs),
        }
    }

    pub fn zones(&self) -> &[Arc<ZoneController>] {
        &self.zones
    }

    /// Finds the zone driving `output`.
    pub fn zone(&self, output: u8) -> Option<&Arc<ZoneController>> {
        self.zones.iter().find(|zone| zone.output() == output)
    }

    pub async fn turn_on_all(&self) -> GroupOutcome {
        self.for_each(|zone| async move { zone.turn_on().await })
            .await
    }

    pub async fn turn_off_all(&self) -> GroupOutcome {
        self.for_each(|zone| async move { zone.turn_off().await })
            .await
    }

    pub async fn set_volume_all(&self, volume: f64) -> GroupOutcome {
        self.for_each(move |zone| async move { zone.set_volume(volume).await })
            .await
    }

    pub async fn mute_all(&self, mute: bool) -> GroupOutcome {
        self.for_each(move |zone| async move { zone.mute(mute).await })
            .await
    }

    /// Selects `label` on every zone. Fails without sending anything when no
    /// enabled input carries the label.
    pub async fn select_source_all(&self, label: &str) -> AmpResult<GroupOutcome> {
        if self.inputs.read().input_for_label(label).is_none() {
            return Err(AmpError::UnknownSource(label.to_string()));
        }
        let label = label.to_string();
        Ok(self
            .for_each(|zone| {
                let label = label.clone();
                async move { zone.select_source(&label).await }
            })
            .await)
    }

    /// Replaces the label table on the group and every zone.
    pub fn replace_inputs(&self, inputs: InputTable) {
        for zone in &self.zones {
            zone.replace_inputs(inputs.clone());
        }
        *self.inputs.write() = inputs;
    }

    /// True if any zone is on.
    pub fn is_on(&self) -> bool {
        self.zones.iter().any(|zone| zone.is_on())
    }

    /// Average recorded volume, `None` without zones.
    pub fn volume(&self) -> Option<f64> {
        if self.zones.is_empty() {
            return None;
        }
        let sum: f64 = self.zones.iter().map(|zone| zone.volume()).sum();
        Some(sum / self.zones.len() as f64)
    }

    /// True if every zone is muted, `None` without zones.
    pub fn is_muted(&self) -> Option<bool> {
        if self.zones.is_empty() {
            return None;
        }
        Some(self.zones.iter().all(|zone| zone.is_muted()))
    }

    /// The source label, if every zone with a source agrees on it.
    pub fn source(&self) -> Option<String> {
        let mut sources: BTreeSet<String> =
            self.zones.iter().filter_map(|zone| zone.source()).collect();
        if sources.len() == 1 {
            sources.pop_first()
        } else {
            None
        }
    }

    pub fn source_list(&self) -> Vec<String> {
        self.inputs.read().labels()
    }

    async fn for_each<F, Fut>(&self, op: F) -> GroupOutcome
    where
        F: Fn(Arc<ZoneController>) -> Fut,
        Fut: Future<Output = AmpResult<()>>,
    {
        let futures: Vec<_> = self
            .zones
            .iter()
            .map(|zone| {
                let output = zone.output();
                let fut = op(Arc::clone(zone));
                async move { fut.await.map_err(|e| (output, e.to_string())) }
            })
            .collect();

        let results = join_all(futures).await;
        let total = results.len();
        let failures: Vec<_> = results.into_iter().filter_map(Result::err).collect();

        if !failures.is_empty() {
            log::warn!(
                "[ZoneGroup] {} of {} zones failed: {:?}",
                failures.len(),
                total,
                failures
            );
        }

        GroupOutcome {
            success: total - failures.len(),
            total,
            failures,
        }
    }
}

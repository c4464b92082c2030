//! Event emitter abstraction for decoupling controllers from delivery.
//!
//! Controllers depend on the [`EventEmitter`] trait rather than concrete
//! broadcast channels, so a host application can route events anywhere.

use super::{AmplifierEvent, ZoneEvent};

/// Trait for emitting domain events without knowledge of transport.
///
/// Emission is synchronous and must not block.
pub trait EventEmitter: Send + Sync {
    /// Emits a zone state event.
    fn emit_zone(&self, event: ZoneEvent);

    /// Emits an amplifier lifecycle event.
    fn emit_amplifier(&self, event: AmplifierEvent);
}

/// No-op emitter for hosts without observers, and for tests.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_zone(&self, _event: ZoneEvent) {}

    fn emit_amplifier(&self, _event: AmplifierEvent) {}
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_zone(&self, event: ZoneEvent) {
        tracing::debug!(?event, "zone_event");
    }

    fn emit_amplifier(&self, event: AmplifierEvent) {
        tracing::debug!(?event, "amplifier_event");
    }
}

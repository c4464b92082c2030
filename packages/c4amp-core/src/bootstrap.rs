//! Amplifier bootstrap and dependency wiring.
//!
//! This is the composition root: the one place where the transport, client,
//! and zone controllers for a configured amplifier are created and wired
//! together. Each call builds an independent set of services; nothing is
//! registered globally.

use std::sync::Arc;

use crate::amp::client::AmplifierClient;
use crate::amp::traits::AmpControl;
use crate::amp::transport::{CommandTransport, UdpCommandTransport};
use crate::config::AmpConfig;
use crate::error::AmpResult;
use crate::events::{AmplifierEvent, EventEmitter};
use crate::utils::now_millis;
use crate::zone::{ZoneController, ZoneGroup};

/// Container for the services of one amplifier.
#[derive(Clone)]
pub struct AmplifierServices {
    /// Validated configuration the services were built from.
    pub config: AmpConfig,
    /// UDP transport shared by every command.
    pub transport: Arc<UdpCommandTransport>,
    /// Validated command client.
    pub client: Arc<AmplifierClient>,
    /// Zone controllers, one per configured output.
    pub zones: Arc<ZoneGroup>,
    /// Receives zone and amplifier events.
    pub emitter: Arc<dyn EventEmitter>,
}

impl AmplifierServices {
    /// Zone controller for `output`, if that output is configured.
    pub fn zone(&self, output: u8) -> Option<&Arc<ZoneController>> {
        self.zones.zone(output)
    }

    /// Opens the transport.
    pub async fn start(&self) -> AmpResult<()> {
        self.client.start().await?;
        log::info!(
            "[Bootstrap] Amplifier {}:{} ready with {} zone(s)",
            self.transport.host(),
            self.transport.port(),
            self.zones.zones().len()
        );
        self.emitter.emit_amplifier(AmplifierEvent::Started {
            host: self.transport.host().to_string(),
            port: self.transport.port(),
            timestamp: now_millis(),
        });
        Ok(())
    }

    /// Closes the transport. Zone state is kept in memory.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Shutting down amplifier {}", self.transport.host());
        self.client.stop().await;
        self.emitter.emit_amplifier(AmplifierEvent::Stopped {
            host: self.transport.host().to_string(),
            port: self.transport.port(),
            timestamp: now_millis(),
        });
    }
}

/// Builds all services for one amplifier.
///
/// The configuration is validated here; no socket is opened until
/// [`AmplifierServices::start`] or the first command.
pub fn bootstrap_amplifier(
    config: &AmpConfig,
    emitter: Arc<dyn EventEmitter>,
) -> AmpResult<AmplifierServices> {
    config.validate()?;

    let transport = Arc::new(UdpCommandTransport::from_config(&config.transport));
    let client = Arc::new(
        AmplifierClient::new(
            Arc::clone(&transport) as Arc<dyn CommandTransport>,
            config.outputs.max_output(),
        )
        .with_await_responses(config.transport.await_responses),
    );

    let zones = config
        .outputs
        .outputs()
        .into_iter()
        .map(|(output, name)| {
            Arc::new(ZoneController::new(
                output,
                name,
                Arc::clone(&client) as Arc<dyn AmpControl>,
                config.inputs.clone(),
                Arc::clone(&emitter),
            ))
        })
        .collect();

    Ok(AmplifierServices {
        config: config.clone(),
        transport,
        client,
        zones: Arc::new(ZoneGroup::new(zones, config.inputs.clone())),
        emitter,
    })
}

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    command::{parse_object, SettingsBatcher, FIELD_RESTART},
    config::{BridgeConfig, ConfigUpdate, RuntimeOptions},
    discovery::{ClimateDiscovery, DiscoveryGate, GateOutcome},
    driver::{DriverEvent, HeatPumpDriver},
    error::BridgeError,
    operating::derive_operating_state,
    packet::{CustomPacket, PacketDiagnostic, PacketDirection},
    publish::{OutboundMessage, Publisher},
    remote_temp::RemoteTempOverride,
    scheduler::PublishScheduler,
    types::{DesiredSettings, DeviceStatus, TelemetryPayload},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutcome {
    pub flushed: bool,
    pub flush_failed: bool,
    pub remote_temp: Option<f32>,
    pub custom_bytes: Option<usize>,
    pub restart_requested: bool,
    pub rejected: Vec<String>,
    pub ignored: bool,
}

/// Owns every piece of bridge state and is driven from a single loop.
///
/// Nothing in here is shared: commands, config updates and ticks must all
/// be delivered from the task that owns the bridge.
pub struct Bridge<D, P> {
    options: RuntimeOptions,
    batcher: SettingsBatcher,
    remote_temp: RemoteTempOverride,
    scheduler: PublishScheduler,
    discovery_gate: DiscoveryGate,
    discovery: ClimateDiscovery,
    driver: D,
    publisher: P,
}

impl<D, P> Bridge<D, P>
where
    D: HeatPumpDriver,
    P: Publisher,
{
    pub fn new(
        config: &BridgeConfig,
        options: RuntimeOptions,
        discovery: ClimateDiscovery,
        driver: D,
        publisher: P,
        now_ms: u64,
    ) -> Self {
        let initial = driver.settings();
        Self {
            options,
            batcher: SettingsBatcher::new(initial),
            remote_temp: RemoteTempOverride::new(config.remote_temp_timeout_ms, now_ms),
            scheduler: PublishScheduler::new(config, now_ms),
            discovery_gate: DiscoveryGate::default(),
            discovery,
            driver,
            publisher,
        }
    }

    pub fn handle_command(
        &mut self,
        payload: &[u8],
        now_ms: u64,
    ) -> Result<CommandOutcome, BridgeError> {
        let fields = parse_object(payload)?;

        if self.options.disabled {
            warn!("bridge disabled, dropping command");
            return Ok(CommandOutcome {
                ignored: true,
                restart_requested: fields
                    .get(FIELD_RESTART)
                    .and_then(|value| value.as_bool())
                    .unwrap_or(false),
                ..CommandOutcome::default()
            });
        }

        let batch = self.batcher.merge(&fields);
        let mut outcome = CommandOutcome {
            restart_requested: batch.restart,
            ..CommandOutcome::default()
        };

        for field in &batch.rejected {
            warn!("ignoring invalid value for command field '{field}'");
        }
        outcome.rejected = batch.rejected;

        if let Some(temp_c) = batch.remote_temp {
            self.remote_temp.set_remote(temp_c, now_ms);
            self.driver.set_remote_temperature(temp_c);
            debug!("remote temperature override {temp_c:.1}");
            outcome.remote_temp = Some(temp_c);
        }

        if let Some(text) = batch.custom {
            outcome.custom_bytes = self.send_custom_packet(&text);
        }

        if batch.changed {
            match self.batcher.flush(&mut self.driver) {
                Ok(()) => outcome.flushed = true,
                Err(err) => {
                    // Desired state is kept; the next flush resends all of it.
                    warn!("heat pump update failed: {err}");
                    outcome.flush_failed = true;
                }
            }
        }

        Ok(outcome)
    }

    pub fn handle_config(&mut self, payload: &[u8]) -> Result<RuntimeOptions, BridgeError> {
        let fields = parse_object(payload)?;
        let update: ConfigUpdate = serde_json::from_value(Value::Object(fields))?;
        if self.options.apply(&update) {
            info!("runtime options updated: {:?}", self.options);
        }
        Ok(self.options)
    }

    pub fn handle_driver_event(&mut self, event: DriverEvent) {
        match event {
            DriverEvent::SettingsChanged(reported) => {
                if self.options.external_update {
                    self.batcher.adopt(reported);
                }
                self.publish(OutboundMessage::Status(reported));
            }
            DriverEvent::StatusChanged(status) => {
                let reported = self.driver.settings();
                self.publish_telemetry(&reported, &status);
            }
            DriverEvent::Packet { direction, bytes } => {
                if self.options.debug {
                    self.publish(OutboundMessage::Diagnostic(PacketDiagnostic::new(
                        direction, &bytes,
                    )));
                }
            }
        }
    }

    pub fn tick(&mut self, now_ms: u64) {
        for event in self.driver.sync() {
            self.handle_driver_event(event);
        }

        let due = self.scheduler.poll(now_ms);

        if self.remote_temp.check_expiry(now_ms) {
            debug!("remote temperature stale, reverting to internal sensor");
            self.driver.use_internal_sensor();
        }

        if due.publish_status {
            self.publish(OutboundMessage::Status(*self.batcher.desired()));
        }

        if due.publish_telemetry {
            let reported = self.driver.settings();
            let status = self.driver.status();
            self.publish_telemetry(&reported, &status);
        }

        if self.options.discovery_enabled && !self.discovery_gate.is_published() {
            let discovery = &self.discovery;
            match self
                .discovery_gate
                .publish_if_needed(&mut self.publisher, || discovery.clone())
            {
                GateOutcome::AlreadyPublished => {}
                GateOutcome::Published => info!("discovery config published"),
                GateOutcome::Failed { attempt: 1, error } => {
                    warn!("discovery publish failed, retrying every tick: {error}");
                }
                GateOutcome::Failed { attempt, error } => {
                    debug!("discovery publish attempt {attempt} failed: {error}");
                }
            }
        }
    }

    fn send_custom_packet(&mut self, text: &str) -> Option<usize> {
        let parsed = CustomPacket::parse(text);
        if parsed.malformed_tokens > 0 {
            warn!(
                "custom packet had {} malformed token(s), sent as 0x00",
                parsed.malformed_tokens
            );
        }
        if parsed.dropped_tokens > 0 {
            warn!(
                "custom packet truncated, {} token(s) dropped",
                parsed.dropped_tokens
            );
        }

        let packet = parsed.packet;
        if packet.is_empty() {
            warn!("custom packet has no bytes, not sent");
            return None;
        }
        if self.options.debug {
            self.publish(OutboundMessage::Diagnostic(PacketDiagnostic::new(
                PacketDirection::Custom,
                packet.as_bytes(),
            )));
        }

        match self.driver.send_custom_packet(packet.as_bytes()) {
            Ok(()) => Some(packet.len()),
            Err(err) => {
                warn!("custom packet not sent: {err}");
                None
            }
        }
    }

    fn publish_telemetry(&mut self, reported: &DesiredSettings, status: &DeviceStatus) {
        let state = derive_operating_state(reported, status);
        self.publish(OutboundMessage::Telemetry(TelemetryPayload::new(
            status,
            state,
            &self.remote_temp,
        )));
    }

    fn publish(&mut self, message: OutboundMessage) {
        let kind = message.kind();
        if let Err(err) = self.publisher.publish(message) {
            warn!("{kind} publish failed: {err}");
        }
    }
}

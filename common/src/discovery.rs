//! Home Assistant MQTT discovery for the unit, published once per process.

use serde::Serialize;

use crate::{
    config::DeviceInfo,
    error::PublishError,
    publish::{OutboundMessage, Publisher},
    topics::Topics,
    types::{TEMPERATURE_MAX_C, TEMPERATURE_MIN_C},
};

const HA_MODES: &[&str] = &["off", "heat", "cool", "dry", "fan_only", "auto"];
const HA_FAN_MODES: &[&str] = &["auto", "quiet", "1", "2", "3", "4"];
const HA_SWING_MODES: &[&str] = &["auto", "1", "2", "3", "4", "5", "swing"];

const MODE_COMMAND_TEMPLATE: &str = r#"{% if value == 'off' %}{"power":false}{% else %}{"power":true,"mode":"{{ 'FAN' if value == 'fan_only' else value | upper }}"}{% endif %}"#;
const MODE_STATE_TEMPLATE: &str = "{% if not value_json.power %}off{% elif value_json.mode == 'FAN' %}fan_only{% else %}{{ value_json.mode | lower }}{% endif %}";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryDevice {
    pub identifiers: Vec<String>,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub sw_version: String,
}

/// Climate entity payload in the schema Home Assistant expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimateDiscovery {
    pub name: String,
    pub unique_id: String,
    pub device: DiscoveryDevice,
    pub modes: Vec<&'static str>,
    pub mode_command_topic: String,
    pub mode_command_template: &'static str,
    pub mode_state_topic: String,
    pub mode_state_template: &'static str,
    pub temperature_command_topic: String,
    pub temperature_command_template: &'static str,
    pub temperature_state_topic: String,
    pub temperature_state_template: &'static str,
    pub current_temperature_topic: String,
    pub current_temperature_template: &'static str,
    pub fan_modes: Vec<&'static str>,
    pub fan_mode_command_topic: String,
    pub fan_mode_command_template: &'static str,
    pub fan_mode_state_topic: String,
    pub fan_mode_state_template: &'static str,
    pub swing_modes: Vec<&'static str>,
    pub swing_mode_command_topic: String,
    pub swing_mode_command_template: &'static str,
    pub swing_mode_state_topic: String,
    pub swing_mode_state_template: &'static str,
    pub action_topic: String,
    pub action_template: &'static str,
    pub min_temp: f32,
    pub max_temp: f32,
    pub temp_step: f32,
    pub temperature_unit: &'static str,
}

impl ClimateDiscovery {
    pub fn new(topics: &Topics, client_id: &str, device: &DeviceInfo) -> Self {
        Self {
            name: device.name.clone(),
            unique_id: format!("{client_id}_climate"),
            device: DiscoveryDevice {
                identifiers: vec![client_id.to_string()],
                name: device.name.clone(),
                manufacturer: device.manufacturer.clone(),
                model: device.model.clone(),
                sw_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            modes: HA_MODES.to_vec(),
            mode_command_topic: topics.command.clone(),
            mode_command_template: MODE_COMMAND_TEMPLATE,
            mode_state_topic: topics.status.clone(),
            mode_state_template: MODE_STATE_TEMPLATE,
            temperature_command_topic: topics.command.clone(),
            temperature_command_template: r#"{"temperature":{{ value }}}"#,
            temperature_state_topic: topics.status.clone(),
            temperature_state_template: "{{ value_json.temperature }}",
            current_temperature_topic: topics.telemetry.clone(),
            current_temperature_template: "{{ value_json.roomTemperature }}",
            fan_modes: HA_FAN_MODES.to_vec(),
            fan_mode_command_topic: topics.command.clone(),
            fan_mode_command_template: r#"{"fan":"{{ value | upper }}"}"#,
            fan_mode_state_topic: topics.status.clone(),
            fan_mode_state_template: "{{ value_json.fan | lower }}",
            swing_modes: HA_SWING_MODES.to_vec(),
            swing_mode_command_topic: topics.command.clone(),
            swing_mode_command_template: r#"{"vane":"{{ value | upper }}"}"#,
            swing_mode_state_topic: topics.status.clone(),
            swing_mode_state_template: "{{ value_json.vane | lower }}",
            action_topic: topics.telemetry.clone(),
            action_template: "{{ value_json.operatingState }}",
            min_temp: TEMPERATURE_MIN_C,
            max_temp: TEMPERATURE_MAX_C,
            temp_step: 0.5,
            temperature_unit: "C",
        }
    }
}

/// Lets discovery through until one publish succeeds, then never again.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryGate {
    published: bool,
    failed_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    AlreadyPublished,
    Published,
    Failed { attempt: u32, error: PublishError },
}

impl DiscoveryGate {
    pub fn is_published(&self) -> bool {
        self.published
    }

    pub fn publish_if_needed<P, F>(&mut self, publisher: &mut P, build: F) -> GateOutcome
    where
        P: Publisher,
        F: FnOnce() -> ClimateDiscovery,
    {
        if self.published {
            return GateOutcome::AlreadyPublished;
        }

        match publisher.publish(OutboundMessage::Discovery(Box::new(build()))) {
            Ok(()) => {
                self.published = true;
                GateOutcome::Published
            }
            Err(error) => {
                self.failed_attempts = self.failed_attempts.saturating_add(1);
                GateOutcome::Failed {
                    attempt: self.failed_attempts,
                    error,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;

    struct FlakyPublisher {
        failures_left: u32,
        attempts: u32,
        delivered: Vec<OutboundMessage>,
    }

    impl Publisher for FlakyPublisher {
        fn publish(&mut self, message: OutboundMessage) -> Result<(), PublishError> {
            self.attempts += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(PublishError::NotConnected);
            }
            self.delivered.push(message);
            Ok(())
        }
    }

    fn descriptor() -> ClimateDiscovery {
        let network = NetworkConfig::default();
        ClimateDiscovery::new(&Topics::new(&network), &network.client_id, &DeviceInfo::default())
    }

    #[test]
    fn retries_until_first_success_then_stays_quiet() {
        let mut gate = DiscoveryGate::default();
        let mut publisher = FlakyPublisher {
            failures_left: 2,
            attempts: 0,
            delivered: Vec::new(),
        };

        assert!(matches!(
            gate.publish_if_needed(&mut publisher, descriptor),
            GateOutcome::Failed { attempt: 1, .. }
        ));
        assert!(matches!(
            gate.publish_if_needed(&mut publisher, descriptor),
            GateOutcome::Failed { attempt: 2, .. }
        ));
        assert!(!gate.is_published());

        assert_eq!(
            gate.publish_if_needed(&mut publisher, descriptor),
            GateOutcome::Published
        );
        for _ in 0..10 {
            assert_eq!(
                gate.publish_if_needed(&mut publisher, descriptor),
                GateOutcome::AlreadyPublished
            );
        }

        assert!(gate.is_published());
        assert_eq!(publisher.attempts, 3);
        assert_eq!(publisher.delivered.len(), 1);
    }

    #[test]
    fn descriptor_points_at_bridge_topics() {
        let json = serde_json::to_value(descriptor()).unwrap();

        assert_eq!(json["unique_id"], "heatpump_climate");
        assert_eq!(json["mode_command_topic"], "cmnd/heatpump");
        assert_eq!(json["current_temperature_topic"], "tele/heatpump");
        assert_eq!(json["min_temp"], 10.0);
        assert_eq!(json["max_temp"], 31.0);
        assert_eq!(json["device"]["identifiers"][0], "heatpump");
    }
}

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{
    driver::HeatPumpDriver,
    error::{BridgeError, DriverError},
    types::{clamp_temperature, DesiredSettings},
};

pub const FIELD_POWER: &str = "power";
pub const FIELD_MODE: &str = "mode";
pub const FIELD_TEMPERATURE: &str = "temperature";
pub const FIELD_FAN: &str = "fan";
pub const FIELD_VANE: &str = "vane";
pub const FIELD_WIDE_VANE: &str = "wideVane";
pub const FIELD_REMOTE_TEMP: &str = "remoteTemp";
pub const FIELD_CUSTOM: &str = "custom";
pub const FIELD_RESTART: &str = "restart";

/// What one command asked for, after the settings fields were merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandBatch {
    /// At least one settings field was applied, so a flush is owed.
    pub changed: bool,
    pub remote_temp: Option<f32>,
    pub custom: Option<String>,
    pub restart: bool,
    /// Recognized fields whose value had the wrong type or was out of range.
    pub rejected: Vec<String>,
}

pub fn parse_object(payload: &[u8]) -> Result<Map<String, Value>, BridgeError> {
    match serde_json::from_slice::<Value>(payload)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(BridgeError::NotAnObject),
    }
}

/// Sole owner of the desired settings.
#[derive(Debug, Clone)]
pub struct SettingsBatcher {
    desired: DesiredSettings,
}

impl SettingsBatcher {
    pub fn new(initial: DesiredSettings) -> Self {
        Self { desired: initial }
    }

    pub fn desired(&self) -> &DesiredSettings {
        &self.desired
    }

    /// Replaces desired state with what the unit reports, e.g. after the IR
    /// remote was used.
    pub fn adopt(&mut self, reported: DesiredSettings) {
        self.desired = reported;
    }

    pub fn merge(&mut self, fields: &Map<String, Value>) -> CommandBatch {
        let mut batch = CommandBatch::default();

        for (name, value) in fields {
            match name.as_str() {
                FIELD_POWER => match value.as_bool() {
                    Some(power) => {
                        self.desired.power = power;
                        batch.changed = true;
                    }
                    None => batch.rejected.push(name.clone()),
                },
                FIELD_MODE => apply_enum(&mut self.desired.mode, name, value, &mut batch),
                FIELD_TEMPERATURE => match finite_number(value) {
                    Some(temp_c) => {
                        self.desired.temperature = clamp_temperature(temp_c);
                        batch.changed = true;
                    }
                    None => batch.rejected.push(name.clone()),
                },
                FIELD_FAN => apply_enum(&mut self.desired.fan, name, value, &mut batch),
                FIELD_VANE => apply_enum(&mut self.desired.vane, name, value, &mut batch),
                FIELD_WIDE_VANE => apply_enum(&mut self.desired.wide_vane, name, value, &mut batch),
                FIELD_REMOTE_TEMP => match finite_number(value) {
                    Some(temp_c) => batch.remote_temp = Some(temp_c),
                    None => batch.rejected.push(name.clone()),
                },
                FIELD_CUSTOM => match value.as_str() {
                    Some(text) => batch.custom = Some(text.to_string()),
                    None => batch.rejected.push(name.clone()),
                },
                FIELD_RESTART => batch.restart = value.as_bool().unwrap_or(false),
                _ => {}
            }
        }

        batch
    }

    /// Pushes the whole desired state and commits it with a single update.
    pub fn flush<D: HeatPumpDriver>(&self, driver: &mut D) -> Result<(), DriverError> {
        let desired = &self.desired;
        driver.set_power(desired.power);
        driver.set_mode(desired.mode);
        driver.set_temperature(desired.temperature);
        driver.set_fan_speed(desired.fan);
        driver.set_vane(desired.vane);
        driver.set_wide_vane(desired.wide_vane);
        driver.update()
    }
}

fn apply_enum<T: DeserializeOwned>(
    slot: &mut T,
    name: &str,
    value: &Value,
    batch: &mut CommandBatch,
) {
    match T::deserialize(value) {
        Ok(parsed) => {
            *slot = parsed;
            batch.changed = true;
        }
        Err(_) => batch.rejected.push(name.to_string()),
    }
}

fn finite_number(value: &Value) -> Option<f32> {
    value
        .as_f64()
        .map(|number| number as f32)
        .filter(|number| number.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FanSpeed, Mode, Vane, WideVane};
    use pretty_assertions::assert_eq;

    fn fields(raw: &str) -> Map<String, Value> {
        parse_object(raw.as_bytes()).unwrap()
    }

    #[test]
    fn merges_only_present_fields() {
        let mut batcher = SettingsBatcher::new(DesiredSettings::default());

        let batch = batcher.merge(&fields(
            r#"{"power": true, "mode": "HEAT", "temperature": 23.5}"#,
        ));

        assert!(batch.changed);
        assert_eq!(
            *batcher.desired(),
            DesiredSettings {
                power: true,
                mode: Mode::Heat,
                temperature: 23.5,
                ..DesiredSettings::default()
            }
        );
    }

    #[test]
    fn applies_every_setting_field() {
        let mut batcher = SettingsBatcher::new(DesiredSettings::default());

        batcher.merge(&fields(
            r#"{"fan": "QUIET", "vane": "SWING", "wideVane": ">>", "mode": "FAN"}"#,
        ));

        let desired = batcher.desired();
        assert_eq!(desired.fan, FanSpeed::Quiet);
        assert_eq!(desired.vane, Vane::Swing);
        assert_eq!(desired.wide_vane, WideVane::RightFar);
        assert_eq!(desired.mode, Mode::Fan);
    }

    #[test]
    fn side_channel_fields_do_not_mark_changed() {
        let mut batcher = SettingsBatcher::new(DesiredSettings::default());

        let batch = batcher.merge(&fields(r#"{"remoteTemp": 19.25, "custom": "fc 41"}"#));

        assert!(!batch.changed);
        assert_eq!(batch.remote_temp, Some(19.25));
        assert_eq!(batch.custom.as_deref(), Some("fc 41"));
        assert_eq!(*batcher.desired(), DesiredSettings::default());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let mut batcher = SettingsBatcher::new(DesiredSettings::default());

        let batch = batcher.merge(&fields(r#"{"ecoMode": true, "horizontal": 3}"#));

        assert_eq!(batch, CommandBatch::default());
    }

    #[test]
    fn bad_values_are_rejected_without_spoiling_the_rest() {
        let mut batcher = SettingsBatcher::new(DesiredSettings::default());

        let batch = batcher.merge(&fields(
            r#"{"mode": "TURBO", "fan": 7, "power": "yes", "temperature": 25}"#,
        ));

        assert!(batch.changed);
        let mut rejected = batch.rejected.clone();
        rejected.sort();
        assert_eq!(rejected, vec!["fan", "mode", "power"]);
        assert_eq!(batcher.desired().mode, Mode::Auto);
        assert_eq!(batcher.desired().temperature, 25.0);
    }

    #[test]
    fn temperature_is_clamped() {
        let mut batcher = SettingsBatcher::new(DesiredSettings::default());

        batcher.merge(&fields(r#"{"temperature": 40}"#));

        assert_eq!(batcher.desired().temperature, 31.0);
    }

    #[test]
    fn restart_flag_is_reported() {
        let mut batcher = SettingsBatcher::new(DesiredSettings::default());

        assert!(batcher.merge(&fields(r#"{"restart": true}"#)).restart);
        assert!(!batcher.merge(&fields(r#"{"restart": false}"#)).restart);
    }

    #[test]
    fn rejects_non_object_payloads() {
        assert!(matches!(parse_object(b"[1, 2]"), Err(BridgeError::NotAnObject)));
        assert!(matches!(
            parse_object(b"{power"),
            Err(BridgeError::InvalidJson(_))
        ));
    }
}

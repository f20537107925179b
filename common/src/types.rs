use serde::{Deserialize, Serialize};

use crate::remote_temp::{RemoteTempOverride, SensorSource};

pub const TEMPERATURE_MIN_C: f32 = 10.0;
pub const TEMPERATURE_MAX_C: f32 = 31.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Heat,
    Dry,
    Cool,
    Fan,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FanSpeed {
    #[serde(rename = "AUTO")]
    Auto,
    #[serde(rename = "QUIET")]
    Quiet,
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vane {
    #[serde(rename = "AUTO")]
    Auto,
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "SWING")]
    Swing,
}

/// Horizontal louvre position. The wire names are the arrow glyphs the unit's
/// own remote uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WideVane {
    #[serde(rename = "<<")]
    LeftFar,
    #[serde(rename = "<")]
    Left,
    #[serde(rename = "|")]
    Center,
    #[serde(rename = ">")]
    Right,
    #[serde(rename = ">>")]
    RightFar,
    #[serde(rename = "<>")]
    LeftRight,
    #[serde(rename = "SWING")]
    Swing,
}

/// Settings the bridge wants the unit to run with. Serialized as-is for the
/// status record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DesiredSettings {
    pub power: bool,
    pub mode: Mode,
    pub temperature: f32,
    pub fan: FanSpeed,
    pub vane: Vane,
    #[serde(rename = "wideVane")]
    pub wide_vane: WideVane,
}

impl Default for DesiredSettings {
    fn default() -> Self {
        Self {
            power: false,
            mode: Mode::Auto,
            temperature: 22.0,
            fan: FanSpeed::Auto,
            vane: Vane::Auto,
            wide_vane: WideVane::Center,
        }
    }
}

pub fn clamp_temperature(temp_c: f32) -> f32 {
    temp_c.clamp(TEMPERATURE_MIN_C, TEMPERATURE_MAX_C)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimerMode {
    #[default]
    None,
    Off,
    On,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStatus {
    pub mode: TimerMode,
    pub on_minutes_set: u16,
    pub on_minutes_remaining: u16,
    pub off_minutes_set: u16,
    pub off_minutes_remaining: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub room_temperature: f32,
    pub operating: bool,
    pub compressor_frequency: Option<f32>,
    pub timers: TimerStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingState {
    Off,
    Idle,
    Heating,
    Cooling,
    Drying,
    /// Operating in FAN mode; the unit gives no heating/cooling signal here.
    Unknown,
}

impl OperatingState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Idle => "idle",
            Self::Heating => "heating",
            Self::Cooling => "cooling",
            Self::Drying => "drying",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TelemetryPayload {
    #[serde(rename = "roomTemperature")]
    pub room_temperature: f32,
    pub operating: bool,
    #[serde(rename = "compressorFrequency")]
    pub compressor_frequency: Option<f32>,
    #[serde(rename = "operatingState")]
    pub operating_state: &'static str,
    pub timers: TimerStatus,
    #[serde(rename = "sensorSource")]
    pub sensor_source: SensorSource,
    #[serde(rename = "remoteTemperature")]
    pub remote_temperature: Option<f32>,
}

impl TelemetryPayload {
    pub fn new(
        status: &DeviceStatus,
        operating_state: OperatingState,
        sensor: &RemoteTempOverride,
    ) -> Self {
        Self {
            room_temperature: status.room_temperature,
            operating: status.operating,
            compressor_frequency: status.compressor_frequency,
            operating_state: operating_state.as_str(),
            timers: status.timers,
            sensor_source: sensor.source(),
            remote_temperature: sensor.last_value(),
        }
    }
}

//! In-process stand-in for the serial heat pump driver.
//!
//! Staged settings only take effect on `update`, the room drifts toward the
//! setpoint while the unit runs, and a supplied remote temperature replaces
//! the internal reading until it is cleared.

use heatpump_common::{
    remote_temp::USE_INTERNAL_SENSOR, DesiredSettings, DeviceStatus, DriverError, DriverEvent,
    FanSpeed, HeatPumpDriver, Mode, PacketDirection, Vane, WideVane,
};

const SYNCS_PER_DRIFT_STEP: u32 = 50;
const DRIFT_STEP_C: f32 = 0.1;
const OPERATING_BAND_C: f32 = 0.5;
const START_ROOM_TEMP_C: f32 = 20.0;
const PACKET_HEADER: u8 = 0xFC;
const SET_SETTINGS_ACK: u8 = 0x61;

pub struct SimulatedHeatPump {
    applied: DesiredSettings,
    staged: DesiredSettings,
    internal_temp_c: f32,
    remote_temp_c: Option<f32>,
    status: DeviceStatus,
    syncs_since_drift: u32,
    pending: Vec<DriverEvent>,
}

impl SimulatedHeatPump {
    pub fn new() -> Self {
        let applied = DesiredSettings::default();
        let mut pump = Self {
            applied,
            staged: applied,
            internal_temp_c: START_ROOM_TEMP_C,
            remote_temp_c: None,
            status: DeviceStatus::default(),
            syncs_since_drift: 0,
            pending: Vec::new(),
        };
        pump.refresh_status();
        pump
    }

    fn room_temp_c(&self) -> f32 {
        self.remote_temp_c.unwrap_or(self.internal_temp_c)
    }

    /// Recomputes the status mirror and queues a change event if it moved.
    fn refresh_status(&mut self) {
        let room = self.room_temp_c();
        let target = self.applied.temperature;
        let operating = self.applied.power
            && match self.applied.mode {
                Mode::Heat => room < target - OPERATING_BAND_C,
                Mode::Cool | Mode::Dry => room > target + OPERATING_BAND_C,
                Mode::Auto => (room - target).abs() > OPERATING_BAND_C,
                Mode::Fan => true,
            };

        let next = DeviceStatus {
            room_temperature: room,
            operating,
            compressor_frequency: Some(if operating && self.applied.mode != Mode::Fan {
                42.0
            } else {
                0.0
            }),
            timers: self.status.timers,
        };

        if next != self.status {
            self.status = next;
            self.pending.push(DriverEvent::StatusChanged(next));
        }
    }

    fn drift(&mut self) {
        if !self.status.operating || self.applied.mode == Mode::Fan {
            return;
        }
        let target = self.applied.temperature;
        if self.internal_temp_c < target {
            self.internal_temp_c = (self.internal_temp_c + DRIFT_STEP_C).min(target);
        } else {
            self.internal_temp_c = (self.internal_temp_c - DRIFT_STEP_C).max(target);
        }
    }
}

impl Default for SimulatedHeatPump {
    fn default() -> Self {
        Self::new()
    }
}

impl HeatPumpDriver for SimulatedHeatPump {
    fn settings(&self) -> DesiredSettings {
        self.applied
    }

    fn status(&self) -> DeviceStatus {
        self.status
    }

    fn set_power(&mut self, power: bool) {
        self.staged.power = power;
    }

    fn set_mode(&mut self, mode: Mode) {
        self.staged.mode = mode;
    }

    fn set_temperature(&mut self, temp_c: f32) {
        self.staged.temperature = temp_c;
    }

    fn set_fan_speed(&mut self, fan: FanSpeed) {
        self.staged.fan = fan;
    }

    fn set_vane(&mut self, vane: Vane) {
        self.staged.vane = vane;
    }

    fn set_wide_vane(&mut self, wide_vane: WideVane) {
        self.staged.wide_vane = wide_vane;
    }

    fn set_remote_temperature(&mut self, temp_c: f32) {
        self.remote_temp_c = if temp_c == USE_INTERNAL_SENSOR {
            None
        } else {
            Some(temp_c)
        };
        self.refresh_status();
    }

    fn send_custom_packet(&mut self, bytes: &[u8]) -> Result<(), DriverError> {
        if bytes.is_empty() {
            return Err(DriverError::EmptyPacket);
        }
        self.pending.push(DriverEvent::Packet {
            direction: PacketDirection::Sent,
            bytes: bytes.to_vec(),
        });
        Ok(())
    }

    fn update(&mut self) -> Result<(), DriverError> {
        let changed = self.staged != self.applied;
        self.applied = self.staged;

        self.pending.push(DriverEvent::Packet {
            direction: PacketDirection::Received,
            bytes: ack_frame(SET_SETTINGS_ACK),
        });
        if changed {
            self.pending.push(DriverEvent::SettingsChanged(self.applied));
        }
        self.refresh_status();
        Ok(())
    }

    fn sync(&mut self) -> Vec<DriverEvent> {
        self.syncs_since_drift += 1;
        if self.syncs_since_drift >= SYNCS_PER_DRIFT_STEP {
            self.syncs_since_drift = 0;
            self.drift();
            self.refresh_status();
        }
        std::mem::take(&mut self.pending)
    }
}

/// Five header bytes, sixteen zero data bytes and the checksum.
fn ack_frame(kind: u8) -> Vec<u8> {
    let mut frame = vec![PACKET_HEADER, kind, 0x01, 0x30, 0x10];
    frame.extend_from_slice(&[0u8; 16]);
    let sum = frame.iter().fold(0u8, |acc, byte| acc.wrapping_add(*byte));
    frame.push(0xFCu8.wrapping_sub(sum));
    frame
}

use crate::{
    error::DriverError,
    packet::PacketDirection,
    remote_temp::USE_INTERNAL_SENSOR,
    types::{DesiredSettings, DeviceStatus, FanSpeed, Mode, Vane, WideVane},
};

/// Change notifications from the unit, drained once per tick.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    SettingsChanged(DesiredSettings),
    StatusChanged(DeviceStatus),
    Packet {
        direction: PacketDirection,
        bytes: Vec<u8>,
    },
}

/// Boundary to the serial driver that talks to the indoor unit.
///
/// Setters only stage values; nothing reaches the unit until [`update`]
/// is called. No method may block.
///
/// [`update`]: HeatPumpDriver::update
pub trait HeatPumpDriver {
    fn settings(&self) -> DesiredSettings;
    fn status(&self) -> DeviceStatus;

    fn set_power(&mut self, power: bool);
    fn set_mode(&mut self, mode: Mode);
    fn set_temperature(&mut self, temp_c: f32);
    fn set_fan_speed(&mut self, fan: FanSpeed);
    fn set_vane(&mut self, vane: Vane);
    fn set_wide_vane(&mut self, wide_vane: WideVane);

    fn set_remote_temperature(&mut self, temp_c: f32);
    fn send_custom_packet(&mut self, bytes: &[u8]) -> Result<(), DriverError>;
    fn update(&mut self) -> Result<(), DriverError>;

    fn sync(&mut self) -> Vec<DriverEvent>;

    fn use_internal_sensor(&mut self) {
        self.set_remote_temperature(USE_INTERNAL_SENSOR);
    }
}

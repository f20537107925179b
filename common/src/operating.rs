use crate::types::{DesiredSettings, DeviceStatus, Mode, OperatingState};

/// Labels what the unit is doing right now. Must be re-derived on every status
/// change; nothing here is cached.
pub fn operating_state(
    power: bool,
    mode: Mode,
    operating: bool,
    room_temp_c: f32,
    target_temp_c: f32,
) -> OperatingState {
    if !power {
        return OperatingState::Off;
    }
    if !operating {
        return OperatingState::Idle;
    }

    match mode {
        Mode::Heat => OperatingState::Heating,
        Mode::Cool => OperatingState::Cooling,
        Mode::Dry => OperatingState::Drying,
        Mode::Auto => {
            if room_temp_c > target_temp_c {
                OperatingState::Cooling
            } else if room_temp_c < target_temp_c {
                OperatingState::Heating
            } else {
                OperatingState::Idle
            }
        }
        Mode::Fan => OperatingState::Unknown,
    }
}

pub fn derive_operating_state(settings: &DesiredSettings, status: &DeviceStatus) -> OperatingState {
    operating_state(
        settings.power,
        settings.mode,
        status.operating,
        status.room_temperature,
        settings.temperature,
    )
}

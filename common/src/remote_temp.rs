use serde::Serialize;

/// Value that tells the unit to go back to its own return-air sensor.
pub const USE_INTERNAL_SENSOR: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SensorSource {
    Local,
    Remote,
}

/// Tracks an externally supplied room temperature and when it goes stale.
///
/// The expiry check fires once every `timeout_ms` without a fresh value, in
/// either state. Each firing restarts the window so the unit is told to use
/// its internal sensor at most once per timeout.
#[derive(Debug, Clone)]
pub struct RemoteTempOverride {
    timeout_ms: u64,
    source: SensorSource,
    last_value: Option<f32>,
    last_timestamp_ms: u64,
}

impl RemoteTempOverride {
    pub fn new(timeout_ms: u64, now_ms: u64) -> Self {
        Self {
            timeout_ms,
            source: SensorSource::Local,
            last_value: None,
            last_timestamp_ms: now_ms,
        }
    }

    pub fn source(&self) -> SensorSource {
        self.source
    }

    /// The override currently fed to the unit, cleared once it expires.
    pub fn last_value(&self) -> Option<f32> {
        self.last_value
    }

    pub fn set_remote(&mut self, value: f32, now_ms: u64) {
        self.source = SensorSource::Remote;
        self.last_value = Some(value);
        self.last_timestamp_ms = now_ms;
    }

    /// Returns `true` when the window elapsed and the unit must revert to its
    /// internal sensor.
    pub fn check_expiry(&mut self, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.last_timestamp_ms) < self.timeout_ms {
            return false;
        }

        self.source = SensorSource::Local;
        self.last_value = None;
        self.last_timestamp_ms = now_ms;
        true
    }
}

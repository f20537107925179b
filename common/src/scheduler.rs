use crate::config::BridgeConfig;

#[derive(Debug, Clone, Copy)]
pub struct IntervalTimer {
    interval_ms: u64,
    last_fired_ms: u64,
}

impl IntervalTimer {
    pub fn new(interval_ms: u64, now_ms: u64) -> Self {
        Self {
            interval_ms,
            last_fired_ms: now_ms,
        }
    }

    /// Fires at most once per call; only a firing moves the reference point.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.last_fired_ms) >= self.interval_ms {
            self.last_fired_ms = now_ms;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DueTasks {
    pub publish_status: bool,
    pub publish_telemetry: bool,
}

#[derive(Debug, Clone)]
pub struct PublishScheduler {
    status: IntervalTimer,
    telemetry: IntervalTimer,
}

impl PublishScheduler {
    pub fn new(config: &BridgeConfig, now_ms: u64) -> Self {
        Self {
            status: IntervalTimer::new(config.status_publish_interval_ms, now_ms),
            telemetry: IntervalTimer::new(config.telemetry_publish_interval_ms, now_ms),
        }
    }

    pub fn poll(&mut self, now_ms: u64) -> DueTasks {
        // Every timer is polled on every tick, whatever the others report.
        let publish_status = self.status.poll(now_ms);
        let publish_telemetry = self.telemetry.poll(now_ms);

        DueTasks {
            publish_status,
            publish_telemetry,
        }
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub status_publish_interval_ms: u64,
    pub telemetry_publish_interval_ms: u64,
    pub remote_temp_timeout_ms: u64,
    pub tick_interval_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            status_publish_interval_ms: 60_000,
            telemetry_publish_interval_ms: 60_000,
            remote_temp_timeout_ms: 300_000,
            tick_interval_ms: 100,
        }
    }
}

impl BridgeConfig {
    pub fn sanitize(&mut self) {
        self.status_publish_interval_ms = self.status_publish_interval_ms.max(1_000);
        self.telemetry_publish_interval_ms = self.telemetry_publish_interval_ms.max(1_000);
        self.remote_temp_timeout_ms = self.remote_temp_timeout_ms.max(10_000);
        self.tick_interval_ms = self.tick_interval_ms.clamp(10, 1_000);
    }
}

/// Toggles set at runtime through the config topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeOptions {
    pub debug: bool,
    pub disabled: bool,
    pub external_update: bool,
    pub discovery_enabled: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            debug: false,
            disabled: false,
            external_update: false,
            discovery_enabled: true,
        }
    }
}

/// Sparse payload of the config topic; absent keys keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub debug: Option<bool>,
    #[serde(default)]
    pub disable: Option<bool>,
    #[serde(rename = "externalUpdate", default)]
    pub external_update: Option<bool>,
    #[serde(default)]
    pub discovery: Option<bool>,
}

impl RuntimeOptions {
    pub fn apply(&mut self, update: &ConfigUpdate) -> bool {
        let before = *self;
        if let Some(debug) = update.debug {
            self.debug = debug;
        }
        if let Some(disable) = update.disable {
            self.disabled = disable;
        }
        if let Some(external_update) = update.external_update {
            self.external_update = external_update;
        }
        if let Some(discovery) = update.discovery {
            self.discovery_enabled = discovery;
        }
        before != *self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
    pub client_id: String,
    #[serde(default)]
    pub topic_prefix: Option<String>,
    #[serde(default)]
    pub topic_suffix: Option<String>,
    pub discovery_prefix: String,
    pub http_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mqtt_host: "127.0.0.1".to_string(),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
            client_id: "heatpump".to_string(),
            topic_prefix: None,
            topic_suffix: None,
            discovery_prefix: "homeassistant".to_string(),
            http_port: 8080,
        }
    }
}

impl NetworkConfig {
    pub fn sanitize(&mut self) {
        if self.client_id.trim().is_empty() {
            self.client_id = "heatpump".to_string();
        }
        if self.mqtt_port == 0 {
            self.mqtt_port = 1883;
        }
        if self.discovery_prefix.trim().is_empty() {
            self.discovery_prefix = "homeassistant".to_string();
        }
        self.topic_prefix = self.topic_prefix.take().filter(|p| !p.trim().is_empty());
        self.topic_suffix = self.topic_suffix.take().filter(|s| !s.trim().is_empty());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub manufacturer: String,
    pub model: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            name: "Heat Pump".to_string(),
            manufacturer: "Mitsubishi Electric".to_string(),
            model: "CN105 serial".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub bridge: BridgeConfig,
    pub network: NetworkConfig,
    #[serde(default)]
    pub device: DeviceInfo,
    #[serde(default)]
    pub options: RuntimeOptions,
}

impl RuntimeConfig {
    pub fn sanitize(&mut self) {
        self.bridge.sanitize();
        self.network.sanitize();
    }
}

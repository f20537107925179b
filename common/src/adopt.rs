//! Adoption document: firmware identity plus the JSON schemas of the config
//! and command topics, so a controller can render and validate both.

use serde_json::{json, Value};

use crate::{
    config::NetworkConfig,
    types::{TEMPERATURE_MAX_C, TEMPERATURE_MIN_C},
};

pub const FIRMWARE_NAME: &str = "Heat Pump Bridge";
pub const FIRMWARE_SHORT_NAME: &str = "heatpump-bridge";
pub const FIRMWARE_MAKER: &str = "Nicholas Kocher";
const JSON_SCHEMA_VERSION: &str = "http://json-schema.org/draft-07/schema#";

pub fn firmware_json() -> Value {
    json!({
        "name": FIRMWARE_NAME,
        "shortName": FIRMWARE_SHORT_NAME,
        "maker": FIRMWARE_MAKER,
        "version": env!("CARGO_PKG_VERSION"),
    })
}

pub fn config_schema_json() -> Value {
    json!({
        "$schema": JSON_SCHEMA_VERSION,
        "title": FIRMWARE_SHORT_NAME,
        "type": "object",
        "properties": {
            "debug": { "type": "boolean" },
            "disable": { "type": "boolean" },
            "externalUpdate": { "type": "boolean" },
            "discovery": { "type": "boolean" },
        },
    })
}

pub fn command_schema_json() -> Value {
    json!({
        "$schema": JSON_SCHEMA_VERSION,
        "title": FIRMWARE_SHORT_NAME,
        "type": "object",
        "properties": {
            "power": { "type": "boolean" },
            "mode": {
                "type": "string",
                "enum": ["HEAT", "DRY", "COOL", "FAN", "AUTO"],
            },
            "temperature": {
                "type": "number",
                "minimum": TEMPERATURE_MIN_C,
                "maximum": TEMPERATURE_MAX_C,
            },
            "fan": {
                "type": "string",
                "enum": ["AUTO", "QUIET", "1", "2", "3", "4"],
            },
            "vane": {
                "type": "string",
                "enum": ["AUTO", "1", "2", "3", "4", "5", "SWING"],
            },
            "wideVane": {
                "type": "string",
                "enum": ["<<", "<", "|", ">", ">>", "<>", "SWING"],
            },
            "remoteTemp": { "type": "number" },
            "custom": { "type": "string" },
            "restart": { "type": "boolean" },
        },
    })
}

/// Process facts for the host build, where flash and heap figures do not
/// apply.
pub fn system_json() -> Value {
    json!({
        "os": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
        "pid": std::process::id(),
        "cpus": std::thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(1),
    })
}

pub fn adoption_json(network: &NetworkConfig) -> Value {
    json!({
        "firmware": firmware_json(),
        "system": system_json(),
        "network": {
            "mode": "host",
            "clientId": network.client_id,
            "mqttHost": network.mqtt_host,
            "mqttPort": network.mqtt_port,
            "httpPort": network.http_port,
        },
        "configSchema": config_schema_json(),
        "commandSchema": command_schema_json(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_schema_lists_every_command_key() {
        let schema = command_schema_json();
        let properties = schema["properties"].as_object().unwrap();

        for key in [
            "power",
            "mode",
            "temperature",
            "fan",
            "vane",
            "wideVane",
            "remoteTemp",
            "custom",
            "restart",
        ] {
            assert!(properties.contains_key(key), "missing {key}");
        }
        assert_eq!(schema["properties"]["temperature"]["maximum"], 31.0);
    }

    #[test]
    fn adoption_carries_client_identity() {
        let network = NetworkConfig {
            client_id: "c0ffee".to_string(),
            ..NetworkConfig::default()
        };

        let adopt = adoption_json(&network);

        assert_eq!(adopt["network"]["clientId"], "c0ffee");
        assert_eq!(adopt["firmware"]["shortName"], FIRMWARE_SHORT_NAME);
        assert!(adopt["configSchema"]["properties"]["debug"].is_object());
    }

    #[test]
    fn adoption_reports_host_system() {
        let adopt = adoption_json(&NetworkConfig::default());

        assert_eq!(adopt["system"]["os"], std::env::consts::OS);
        assert_eq!(adopt["system"]["pid"], std::process::id());
        assert!(adopt["system"]["cpus"].as_u64().unwrap() >= 1);
    }
}

use crate::config::NetworkConfig;

pub const TOPIC_KIND_CONFIG: &str = "conf";
pub const TOPIC_KIND_COMMAND: &str = "cmnd";
pub const TOPIC_KIND_STATUS: &str = "stat";
pub const TOPIC_KIND_TELEMETRY: &str = "tele";
pub const TOPIC_KIND_ADOPT: &str = "adopt";
pub const TOPIC_KIND_LOG: &str = "log";

/// Topic layout: `[prefix/]<kind>/<client id>[/suffix]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub config: String,
    pub command: String,
    pub status: String,
    pub telemetry: String,
    pub adopt: String,
    pub log: String,
    pub discovery: String,
}

impl Topics {
    pub fn new(network: &NetworkConfig) -> Self {
        let build = |kind: &str| {
            let mut topic = String::new();
            if let Some(prefix) = &network.topic_prefix {
                topic.push_str(prefix);
                topic.push('/');
            }
            topic.push_str(kind);
            topic.push('/');
            topic.push_str(&network.client_id);
            if let Some(suffix) = &network.topic_suffix {
                topic.push('/');
                topic.push_str(suffix);
            }
            topic
        };

        Self {
            config: build(TOPIC_KIND_CONFIG),
            command: build(TOPIC_KIND_COMMAND),
            status: build(TOPIC_KIND_STATUS),
            telemetry: build(TOPIC_KIND_TELEMETRY),
            adopt: build(TOPIC_KIND_ADOPT),
            log: build(TOPIC_KIND_LOG),
            discovery: format!(
                "{}/climate/{}/config",
                network.discovery_prefix, network.client_id
            ),
        }
    }
}

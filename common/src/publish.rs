use crate::{
    discovery::ClimateDiscovery,
    error::PublishError,
    packet::PacketDiagnostic,
    topics::Topics,
    types::{DesiredSettings, TelemetryPayload},
};

#[derive(Debug, Clone)]
pub enum OutboundMessage {
    Status(DesiredSettings),
    Telemetry(TelemetryPayload),
    Diagnostic(PacketDiagnostic),
    Discovery(Box<ClimateDiscovery>),
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Telemetry(_) => "telemetry",
            Self::Diagnostic(_) => "diagnostic",
            Self::Discovery(_) => "discovery",
        }
    }

    pub fn topic<'a>(&self, topics: &'a Topics) -> &'a str {
        match self {
            Self::Status(_) => &topics.status,
            Self::Telemetry(_) => &topics.telemetry,
            Self::Diagnostic(_) => &topics.log,
            Self::Discovery(_) => &topics.discovery,
        }
    }

    pub fn retain(&self) -> bool {
        matches!(self, Self::Discovery(_))
    }

    pub fn payload(&self) -> Result<Vec<u8>, PublishError> {
        let result = match self {
            Self::Status(settings) => serde_json::to_vec(settings),
            Self::Telemetry(telemetry) => serde_json::to_vec(telemetry),
            Self::Diagnostic(diagnostic) => return Ok(diagnostic.log_line().into_bytes()),
            Self::Discovery(discovery) => serde_json::to_vec(discovery),
        };

        result.map_err(|err| PublishError::Serialize {
            kind: self.kind(),
            reason: err.to_string(),
        })
    }
}

/// Outbound side of the message bus. Implementations must not block; a
/// returned `Ok` means the message was accepted for delivery.
pub trait Publisher {
    fn publish(&mut self, message: OutboundMessage) -> Result<(), PublishError>;
}

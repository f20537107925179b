use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("payload is not valid json: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("payload must be a json object")]
    NotAnObject,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("heat pump is not connected")]
    NotConnected,

    #[error("heat pump did not acknowledge the update")]
    NotAcknowledged,

    #[error("custom packet is empty")]
    EmptyPacket,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("message bus is not connected")]
    NotConnected,

    #[error("failed to serialize {kind} payload: {reason}")]
    Serialize { kind: &'static str, reason: String },

    #[error("publish failed: {0}")]
    Transport(String),
}

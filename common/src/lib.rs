pub mod adopt;
pub mod bridge;
pub mod command;
pub mod config;
pub mod discovery;
pub mod driver;
pub mod error;
pub mod operating;
pub mod packet;
pub mod publish;
pub mod remote_temp;
pub mod scheduler;
pub mod topics;
pub mod types;

pub use bridge::{Bridge, CommandOutcome};
pub use config::{BridgeConfig, ConfigUpdate, DeviceInfo, NetworkConfig, RuntimeConfig, RuntimeOptions};
pub use discovery::ClimateDiscovery;
pub use driver::{DriverEvent, HeatPumpDriver};
pub use error::{BridgeError, DriverError, PublishError};
pub use packet::{CustomPacket, PacketDiagnostic, PacketDirection};
pub use publish::{OutboundMessage, Publisher};
pub use remote_temp::SensorSource;
pub use topics::Topics;
pub use types::{
    DesiredSettings, DeviceStatus, FanSpeed, Mode, OperatingState, TelemetryPayload, TimerMode,
    TimerStatus, Vane, WideVane,
};

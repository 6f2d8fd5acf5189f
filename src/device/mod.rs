pub mod handle;
pub mod http;
pub mod log_sink;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransmissionError;

pub use handle::{DeviceHandle, DispatchStats};
pub use http::HttpDeviceSink;
pub use log_sink::LogSink;

/// What the playback engine asks of the actuator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceCommand {
    /// Move to a normalized position (0.0 deep .. 1.0 shallow) over `ramp_ms`.
    Move { position: f64, ramp_ms: u32 },
    /// Return to the neutral/home position and hold.
    Neutral { ramp_ms: u32 },
    /// Leave the neutral hold and accept moves again.
    Resume,
    /// Bridge speed factor; above 1.0 shortens every stroke.
    SetSpeed(f64),
}

impl DeviceCommand {
    pub fn is_move(&self) -> bool {
        matches!(self, DeviceCommand::Move { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub last_position: f64,
}

/// Downstream link to the actuator. Implementations must not retry: a stale
/// position delivered late is worse than one never delivered.
#[async_trait]
pub trait DeviceSink: Send + Sync {
    async fn send(&self, command: &DeviceCommand) -> Result<(), TransmissionError>;

    async fn status(&self) -> Result<DeviceStatus, TransmissionError>;
}

//! Client for the local device bridge that relays commands to the stroker.
//!
//! Endpoints: `/move/{pos}?duration={ms}`, `/pause`, `/resume`,
//! `/speed/{x}` and `/status`. Requests carry a short timeout and are never
//! retried.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransmissionError;

use super::{DeviceCommand, DeviceSink, DeviceStatus};

const REQUEST_TIMEOUT: Duration = Duration::from_millis(500);

pub const MIN_BRIDGE_SPEED: f64 = 0.25;
pub const MAX_BRIDGE_SPEED: f64 = 2.0;

pub struct HttpDeviceSink {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDeviceSink {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransmissionError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, TransmissionError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransmissionError::HttpStatus(status.as_u16()));
        }
        Ok(response)
    }
}

/// Request path for a command, relative to the bridge base URL.
pub fn command_path(command: &DeviceCommand) -> String {
    match command {
        DeviceCommand::Move { position, ramp_ms } => {
            format!("/move/{:.2}?duration={}", position.clamp(0.0, 1.0), ramp_ms)
        }
        DeviceCommand::Neutral { ramp_ms } => format!("/pause?duration={}", ramp_ms),
        DeviceCommand::Resume => "/resume".to_string(),
        DeviceCommand::SetSpeed(speed) => {
            format!("/speed/{:.2}", speed.clamp(MIN_BRIDGE_SPEED, MAX_BRIDGE_SPEED))
        }
    }
}

#[async_trait]
impl DeviceSink for HttpDeviceSink {
    async fn send(&self, command: &DeviceCommand) -> Result<(), TransmissionError> {
        self.get(&command_path(command)).await.map(|_| ())
    }

    async fn status(&self) -> Result<DeviceStatus, TransmissionError> {
        let response = self.get("/status").await?;
        Ok(response.json::<DeviceStatus>().await?)
    }
}

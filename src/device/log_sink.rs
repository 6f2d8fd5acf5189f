use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use log::{debug, info};

use crate::error::TransmissionError;

use super::{DeviceCommand, DeviceSink, DeviceStatus};

/// Dry-run sink: logs every command and reports itself as connected.
#[derive(Debug)]
pub struct LogSink {
    last_position: AtomicU64,
    speed: AtomicU64,
    paused: AtomicBool,
}

impl LogSink {
    pub fn new() -> Self {
        Self {
            last_position: AtomicU64::new(0f64.to_bits()),
            speed: AtomicU64::new(1f64.to_bits()),
            paused: AtomicBool::new(true),
        }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceSink for LogSink {
    async fn send(&self, command: &DeviceCommand) -> Result<(), TransmissionError> {
        match *command {
            DeviceCommand::Move { position, ramp_ms } => {
                debug!("[dry-run] move {:.2} over {} ms", position, ramp_ms);
                self.last_position.store(position.to_bits(), Ordering::Relaxed);
            }
            DeviceCommand::Neutral { ramp_ms } => {
                info!("[dry-run] neutral over {} ms", ramp_ms);
                self.last_position.store(0f64.to_bits(), Ordering::Relaxed);
                self.paused.store(true, Ordering::Relaxed);
            }
            DeviceCommand::Resume => {
                info!("[dry-run] resume");
                self.paused.store(false, Ordering::Relaxed);
            }
            DeviceCommand::SetSpeed(speed) => {
                info!("[dry-run] speed x{:.2}", speed);
                self.speed.store(speed.to_bits(), Ordering::Relaxed);
            }
        }
        Ok(())
    }

    async fn status(&self) -> Result<DeviceStatus, TransmissionError> {
        Ok(DeviceStatus {
            connected: true,
            paused: self.paused.load(Ordering::Relaxed),
            speed: f64::from_bits(self.speed.load(Ordering::Relaxed)),
            device: Some("dry-run".to_string()),
            last_position: f64::from_bits(self.last_position.load(Ordering::Relaxed)),
        })
    }
}

pub mod arousal;
pub mod chaining;
pub mod device;
pub mod error;
pub mod library;
pub mod models;
pub mod playback;
pub mod selection;
pub mod session;
pub mod settings;
pub mod utils;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use device::{DeviceHandle, DeviceSink, HttpDeviceSink, LogSink};
use library::SegmentLibrary;
use playback::{PlaybackConfig, PlaybackController};
use session::{SessionConfig, SessionController};
use settings::SettingsStore;

pub use arousal::ArousalCurve;
pub use chaining::{chain, ChainedSequence};
pub use models::{Keyframe, Segment};
pub use selection::SegmentSelector;

const DEFAULT_SETTINGS_PATH: &str = "handyflow.json";
const DEFAULT_PEAKS: u32 = 3;
const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Everything a front end needs to drive a running player.
pub struct AppState {
    pub settings: SettingsStore,
    pub library: Arc<SegmentLibrary>,
    pub device: DeviceHandle,
    pub session: SessionController,
    pub playback: PlaybackController,
}

impl AppState {
    pub fn new(settings: SettingsStore) -> Result<Self> {
        let current = settings.get()?;

        let library = Arc::new(library::load_or_empty(&current.library_path));
        let summary = library.summary();
        info!(
            "Library: {} segments ({} gentle, {} medium, {} intense; {} holds, {} transitions)",
            summary.total,
            summary.gentle,
            summary.medium,
            summary.intense,
            summary.holds,
            summary.transitions
        );

        let sink: Arc<dyn DeviceSink> = if current.dry_run {
            info!("Dry run: device commands are logged only");
            Arc::new(LogSink::new())
        } else {
            Arc::new(
                HttpDeviceSink::new(current.server_url.clone())
                    .context("failed to build device client")?,
            )
        };
        let device = DeviceHandle::spawn(sink);

        let session = SessionController::new(SessionConfig::default()).with_device(device.clone());
        let playback = PlaybackController::new(
            library.clone(),
            session.clone(),
            device.clone(),
            PlaybackConfig::default(),
            current.playback_options(),
        );

        Ok(Self {
            settings,
            library,
            device,
            session,
            playback,
        })
    }

    pub fn set_range(&self, min: u8, max: u8) -> Result<()> {
        let applied = self.settings.update_range(min, max)?;
        self.playback.set_range(applied.min, applied.max);
        Ok(())
    }

    pub fn set_slow_mode(&self, enabled: bool) -> Result<()> {
        self.settings.update_slow_mode(enabled)?;
        self.playback.set_slow_mode(enabled);
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.playback.stop().await?;
        let snapshot = self.session.stop_session().await?;
        info!(
            "Stopped after {:.0}s of session time",
            snapshot.progress.elapsed_s
        );
        Ok(())
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

async fn poll_device_status(device: DeviceHandle, cancel_token: CancellationToken) {
    let mut ticker = tokio::time::interval(STATUS_POLL_INTERVAL);
    let mut reachable = true;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match device.status().await {
                    Ok(status) => {
                        if !reachable {
                            info!("Device reachable again");
                        }
                        reachable = true;
                        debug!(
                            "Device status: connected={} paused={} speed={:.2}",
                            status.connected, status.paused, status.speed
                        );
                    }
                    Err(err) => {
                        if reachable {
                            warn!("Device status unavailable: {}", err);
                        }
                        reachable = false;
                    }
                }
            }
            _ = cancel_token.cancelled() => break,
        }
    }
}

async fn run_player(state: AppState) -> Result<()> {
    if let Ok(duration) = std::env::var("HANDYFLOW_SESSION") {
        let peaks = std::env::var("HANDYFLOW_PEAKS")
            .ok()
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(DEFAULT_PEAKS);
        let snapshot = state.session.start_session_str(&duration, peaks).await?;
        info!(
            "Session of {}s with {} peaks",
            snapshot.state.session_length_s, snapshot.state.peak_count
        );
    }

    state.playback.start().await?;

    let cancel_token = CancellationToken::new();
    let poller = tokio::spawn(poll_device_status(
        state.device.clone(),
        cancel_token.clone(),
    ));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("Interrupted, returning to neutral");

    cancel_token.cancel();
    poller.await.context("status poll task failed to join")?;
    state.shutdown().await?;

    let status = state.playback.status().await;
    info!(
        "Sent {} commands ({} failed, {} dropped)",
        status.dispatch.sent, status.dispatch.failed, status.dispatch.dropped
    );
    Ok(())
}

pub fn run() -> Result<()> {
    let level = if env_flag("HANDYFLOW_DEBUG") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    info!("handyflow starting up...");

    let settings_path = std::env::var("HANDYFLOW_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_SETTINGS_PATH));

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async move {
        let settings = SettingsStore::new(settings_path)?;
        let state = AppState::new(settings)?;
        run_player(state).await
    })
}

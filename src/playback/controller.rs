use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::chaining::{ComposeConfig, PatternComposer};
use crate::device::{DeviceCommand, DeviceHandle, DispatchStats};
use crate::library::SegmentLibrary;
use crate::selection::{SegmentSelector, SelectorConfig};
use crate::session::SessionController;

use super::config::{PlaybackConfig, PlaybackOptions, StrokeRange};
use super::loop_worker::{producer_loop, scheduler_loop};
use super::queue::{pending_queue, QueueProducer};
use super::scheduler::{PlaybackScheduler, SchedulerStatus, StopKind};

struct ActivePlayback {
    scheduler_handle: JoinHandle<()>,
    producer_handle: JoinHandle<()>,
    cancel_token: CancellationToken,
    stop_tx: watch::Sender<Option<StopKind>>,
    status_rx: watch::Receiver<SchedulerStatus>,
    queue: QueueProducer,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatus {
    pub active: bool,
    pub scheduler: SchedulerStatus,
    pub queued: usize,
    pub options: PlaybackOptions,
    pub dispatch: DispatchStats,
}

/// Starts and stops the scheduler and production loops, and holds the live
/// options they read.
pub struct PlaybackController {
    library: Arc<SegmentLibrary>,
    session: SessionController,
    device: DeviceHandle,
    config: PlaybackConfig,
    compose_config: ComposeConfig,
    selector_config: SelectorConfig,
    options_tx: watch::Sender<PlaybackOptions>,
    active: Mutex<Option<ActivePlayback>>,
    last_status: Mutex<SchedulerStatus>,
}

impl PlaybackController {
    pub fn new(
        library: Arc<SegmentLibrary>,
        session: SessionController,
        device: DeviceHandle,
        config: PlaybackConfig,
        options: PlaybackOptions,
    ) -> Self {
        let (options_tx, _) = watch::channel(options);
        Self {
            library,
            session,
            device,
            config,
            compose_config: ComposeConfig::default(),
            selector_config: SelectorConfig::default(),
            options_tx,
            active: Mutex::new(None),
            last_status: Mutex::new(SchedulerStatus::default()),
        }
    }

    pub fn with_compose_config(mut self, compose_config: ComposeConfig) -> Self {
        self.compose_config = compose_config;
        self
    }

    pub fn with_selector_config(mut self, selector_config: SelectorConfig) -> Self {
        self.selector_config = selector_config;
        self
    }

    pub async fn start(&self) -> Result<()> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            bail!("playback already active");
        }
        if self.library.is_empty() {
            bail!("segment library is empty, nothing to play");
        }

        self.device.dispatch(DeviceCommand::Resume);

        let (producer, consumer) = pending_queue(self.config.queue_capacity);
        let selector = SegmentSelector::new(self.library.clone(), &self.selector_config);
        let composer = PatternComposer::new(selector, self.compose_config.clone());

        let cancel_token = CancellationToken::new();
        let producer_handle = tokio::spawn(producer_loop(
            composer,
            producer.clone(),
            self.session.clone(),
            self.config.low_water,
            self.config.produce_interval,
            self.config.home_position,
            cancel_token.clone(),
        ));

        let (stop_tx, stop_rx) = watch::channel(None);
        let (status_tx, status_rx) = watch::channel(SchedulerStatus::default());
        let scheduler = PlaybackScheduler::new(&self.config, *self.options_tx.borrow());
        let scheduler_handle = tokio::spawn(scheduler_loop(
            scheduler,
            consumer,
            self.device.clone(),
            self.options_tx.subscribe(),
            stop_rx,
            status_tx,
            self.config.tick_interval,
        ));

        *active = Some(ActivePlayback {
            scheduler_handle,
            producer_handle,
            cancel_token,
            stop_tx,
            status_rx,
            queue: producer,
        });
        info!("Playback started with {} segments", self.library.len());
        Ok(())
    }

    /// Returns to neutral over the regular ramp.
    pub async fn stop(&self) -> Result<()> {
        self.stop_with(StopKind::Normal).await
    }

    /// Neutral over the short ramp. Sent even if nothing is playing.
    pub async fn emergency_stop(&self) -> Result<()> {
        self.stop_with(StopKind::Emergency).await
    }

    async fn stop_with(&self, kind: StopKind) -> Result<()> {
        let Some(active) = self.active.lock().await.take() else {
            if kind == StopKind::Emergency {
                warn!("Emergency stop with no active playback; sending neutral anyway");
                self.device.dispatch_urgent(DeviceCommand::Neutral {
                    ramp_ms: self.config.emergency_ramp_ms,
                });
            }
            return Ok(());
        };

        let _ = active.stop_tx.send(Some(kind));
        active.cancel_token.cancel();

        active
            .scheduler_handle
            .await
            .context("scheduler loop task failed to join")?;
        active
            .producer_handle
            .await
            .context("production loop task failed to join")?;

        *self.last_status.lock().await = active.status_rx.borrow().clone();
        Ok(())
    }

    pub async fn is_active(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// Applies to the next emitted command.
    pub fn set_range(&self, min: u8, max: u8) -> StrokeRange {
        let range = StrokeRange::clamped(min, max);
        self.options_tx.send_modify(|options| options.range = range);
        info!("Stroke range set to {}-{}", range.min, range.max);
        range
    }

    pub fn set_slow_mode(&self, enabled: bool) {
        self.options_tx
            .send_modify(|options| options.slow_mode = enabled);
    }

    pub fn options(&self) -> PlaybackOptions {
        *self.options_tx.borrow()
    }

    pub async fn status(&self) -> PlaybackStatus {
        let active = self.active.lock().await;
        let (scheduler, queued) = match active.as_ref() {
            Some(active) => (active.status_rx.borrow().clone(), active.queue.len()),
            None => (self.last_status.lock().await.clone(), 0),
        };
        PlaybackStatus {
            active: active.is_some(),
            scheduler,
            queued,
            options: self.options(),
            dispatch: self.device.stats(),
        }
    }
}

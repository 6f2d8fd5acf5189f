use std::time::Instant;

use tokio::sync::watch;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::chaining::{ComposeMode, PatternComposer};
use crate::device::DeviceHandle;
use crate::session::SessionController;

use super::config::PlaybackOptions;
use super::queue::{QueueConsumer, QueueProducer};
use super::scheduler::{PlaybackScheduler, SchedulerStatus, StopKind};

// Set to false to silence the playback loops
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Drives the scheduler on a fixed tick and forwards its commands to the
/// device. A stop request is observed within one tick.
pub async fn scheduler_loop(
    mut scheduler: PlaybackScheduler,
    mut source: QueueConsumer,
    device: DeviceHandle,
    options_rx: watch::Receiver<PlaybackOptions>,
    mut stop_rx: watch::Receiver<Option<StopKind>>,
    status_tx: watch::Sender<SchedulerStatus>,
    tick_interval: Duration,
) {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    scheduler.start();
    log_info!("scheduler loop started ({} ms tick)", tick_interval.as_millis());

    loop {
        tokio::select! {
            biased;
            changed = stop_rx.changed() => {
                let kind = match changed {
                    Ok(()) => *stop_rx.borrow_and_update(),
                    // controller dropped without asking: treat as a regular stop
                    Err(_) => Some(StopKind::Normal),
                };
                if let Some(kind) = kind {
                    device.dispatch_urgent(scheduler.stop(kind));
                    status_tx.send_replace(scheduler.status());
                    break;
                }
            }
            _ = ticker.tick() => {
                scheduler.set_options(*options_rx.borrow());
                for command in scheduler.tick(Instant::now(), &mut source) {
                    device.dispatch(command);
                }
                status_tx.send_replace(scheduler.status());
            }
        }
    }

    log_info!("scheduler loop shutting down");
}

/// Keeps the pending queue above its low-water mark. Runs in arousal mode
/// while a session is active and in position-continuity mode otherwise.
pub async fn producer_loop(
    mut composer: PatternComposer,
    queue: QueueProducer,
    session: SessionController,
    low_water: usize,
    check_interval: Duration,
    home_position: u8,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(check_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut position = home_position;
    let mut starved = false;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if queue.len() >= low_water {
                    continue;
                }

                let mode = match session.arousal_for_selection().await {
                    Some(arousal) => ComposeMode::Arousal(arousal),
                    None => ComposeMode::Continuity,
                };

                let Some(sequence) = composer.compose(mode, position) else {
                    if !starved {
                        log_warn!("nothing to queue: no playable segments");
                        starved = true;
                    }
                    continue;
                };
                starved = false;
                position = sequence.end_position().unwrap_or(position);
                log_debug!(
                    "queued {} ms sequence ({:?}, {} segments, {} bridges)",
                    sequence.duration_ms(),
                    mode,
                    sequence.sources.len(),
                    sequence.bridges
                );

                tokio::select! {
                    pushed = queue.push(sequence) => {
                        if let Err(err) = pushed {
                            log_warn!("production loop stopping: {err}");
                            break;
                        }
                    }
                    _ = cancel_token.cancelled() => break,
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("production loop shutting down");
                break;
            }
        }
    }
}

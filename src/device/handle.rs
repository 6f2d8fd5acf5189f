use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};

use crate::error::TransmissionError;

use super::{DeviceCommand, DeviceSink, DeviceStatus};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_warn};

const SEND_TIMEOUT_MS: u64 = 500;
/// Regular commands waiting for the sender task. Anything beyond this is
/// dropped rather than delivered late.
pub const DISPATCH_CAPACITY: usize = 32;

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchStats {
    pub sent: u64,
    pub failed: u64,
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Shared {
    counters: Counters,
    /// Bumped by every urgent command; queued moves from an older generation
    /// are discarded.
    generation: AtomicU64,
    /// Held for the duration of one sink call so deliveries never interleave.
    delivery: Mutex<()>,
}

impl Shared {
    fn is_stale(&self, queued: &Queued) -> bool {
        queued.command.is_move() && queued.generation < self.generation.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
struct Queued {
    command: DeviceCommand,
    generation: u64,
}

/// Non-blocking front for a [`DeviceSink`]. Regular commands are delivered in
/// order by one sender task; urgent ones skip the line and void any moves
/// still waiting behind it.
#[derive(Clone)]
pub struct DeviceHandle {
    tx: mpsc::Sender<Queued>,
    sink: Arc<dyn DeviceSink>,
    shared: Arc<Shared>,
}

impl DeviceHandle {
    /// Must be called from within a tokio runtime.
    pub fn spawn(sink: Arc<dyn DeviceSink>) -> Self {
        let (tx, rx) = mpsc::channel(DISPATCH_CAPACITY);
        let shared = Arc::new(Shared::default());

        tokio::spawn(sender_loop(rx, sink.clone(), shared.clone()));

        Self { tx, sink, shared }
    }

    /// Queues a command without waiting for delivery. A full queue drops the
    /// command.
    pub fn dispatch(&self, command: DeviceCommand) {
        let queued = Queued {
            command,
            generation: self.shared.generation.load(Ordering::Acquire),
        };
        match self.tx.try_send(queued) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(queued)) => {
                self.shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
                log_debug!("device queue full, dropping {:?}", queued.command);
            }
            Err(mpsc::error::TrySendError::Closed(queued)) => {
                self.shared.counters.failed.fetch_add(1, Ordering::Relaxed);
                log_error!("device dispatcher closed, dropping {:?}", queued.command);
            }
        }
    }

    /// Delivers on a detached task so a backlog of regular commands cannot
    /// delay it. Moves queued before this call are never sent afterwards.
    pub fn dispatch_urgent(&self, command: DeviceCommand) {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        let sink = self.sink.clone();
        let shared = self.shared.clone();
        tokio::spawn(async move {
            let _guard = shared.delivery.lock().await;
            deliver(sink.as_ref(), &command, &shared.counters).await;
        });
    }

    pub async fn status(&self) -> Result<DeviceStatus, TransmissionError> {
        tokio::time::timeout(Duration::from_millis(SEND_TIMEOUT_MS), self.sink.status())
            .await
            .map_err(|_| TransmissionError::Timeout(SEND_TIMEOUT_MS))?
    }

    pub fn stats(&self) -> DispatchStats {
        let counters = &self.shared.counters;
        DispatchStats {
            sent: counters.sent.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            dropped: counters.dropped.load(Ordering::Relaxed),
        }
    }
}

async fn sender_loop(
    mut rx: mpsc::Receiver<Queued>,
    sink: Arc<dyn DeviceSink>,
    shared: Arc<Shared>,
) {
    while let Some(queued) = rx.recv().await {
        if shared.is_stale(&queued) {
            shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
            continue;
        }

        let _guard = shared.delivery.lock().await;
        // An urgent command may have gone out while we waited for the lock.
        if shared.is_stale(&queued) {
            shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
            continue;
        }
        deliver(sink.as_ref(), &queued.command, &shared.counters).await;
    }
    log_debug!("device sender loop finished");
}

async fn deliver(sink: &dyn DeviceSink, command: &DeviceCommand, counters: &Counters) {
    let result = tokio::time::timeout(Duration::from_millis(SEND_TIMEOUT_MS), sink.send(command))
        .await
        .unwrap_or(Err(TransmissionError::Timeout(SEND_TIMEOUT_MS)));

    match result {
        Ok(()) => {
            counters.sent.fetch_add(1, Ordering::Relaxed);
        }
        Err(err) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            log_warn!("device command {:?} dropped: {}", command, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FlakySink {
        seen: Mutex<Vec<DeviceCommand>>,
    }

    #[async_trait]
    impl DeviceSink for FlakySink {
        async fn send(&self, command: &DeviceCommand) -> Result<(), TransmissionError> {
            self.seen.lock().unwrap().push(*command);
            match command {
                DeviceCommand::SetSpeed(_) => Err(TransmissionError::HttpStatus(500)),
                _ => Ok(()),
            }
        }

        async fn status(&self) -> Result<DeviceStatus, TransmissionError> {
            Ok(DeviceStatus {
                connected: true,
                ..DeviceStatus::default()
            })
        }
    }

    /// Accepts everything but takes its time, like a bridge on a busy link.
    #[derive(Default)]
    struct SlowSink {
        seen: Mutex<Vec<DeviceCommand>>,
    }

    #[async_trait]
    impl DeviceSink for SlowSink {
        async fn send(&self, command: &DeviceCommand) -> Result<(), TransmissionError> {
            tokio::time::sleep(Duration::from_millis(40)).await;
            self.seen.lock().unwrap().push(*command);
            Ok(())
        }

        async fn status(&self) -> Result<DeviceStatus, TransmissionError> {
            Ok(DeviceStatus::default())
        }
    }

    fn stroke(i: u32) -> DeviceCommand {
        DeviceCommand::Move {
            position: if i % 2 == 0 { 0.1 } else { 0.9 },
            ramp_ms: 40,
        }
    }

    async fn wait_for(handle: &DeviceHandle, total: u64) {
        for _ in 0..100 {
            let stats = handle.stats();
            if stats.sent + stats.failed >= total {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn delivers_in_order_and_counts_failures() {
        let sink = Arc::new(FlakySink::default());
        let handle = DeviceHandle::spawn(sink.clone());

        handle.dispatch(DeviceCommand::Resume);
        handle.dispatch(DeviceCommand::Move {
            position: 0.5,
            ramp_ms: 100,
        });
        handle.dispatch(DeviceCommand::SetSpeed(1.5));
        wait_for(&handle, 3).await;

        assert_eq!(
            handle.stats(),
            DispatchStats {
                sent: 2,
                failed: 1,
                dropped: 0
            }
        );
        let seen = sink.seen.lock().unwrap().clone();
        assert_eq!(seen[0], DeviceCommand::Resume);
        assert!(seen[1].is_move());
        assert!(handle.status().await.unwrap().connected);
    }

    #[tokio::test]
    async fn urgent_commands_are_delivered() {
        let sink = Arc::new(FlakySink::default());
        let handle = DeviceHandle::spawn(sink.clone());

        handle.dispatch_urgent(DeviceCommand::Neutral { ramp_ms: 500 });
        wait_for(&handle, 1).await;

        assert_eq!(
            sink.seen.lock().unwrap().as_slice(),
            &[DeviceCommand::Neutral { ramp_ms: 500 }]
        );
    }

    #[tokio::test]
    async fn backlog_is_discarded_once_neutral_is_sent() {
        let sink = Arc::new(SlowSink::default());
        let handle = DeviceHandle::spawn(sink.clone());

        for i in 0..10 {
            handle.dispatch(stroke(i));
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.dispatch_urgent(DeviceCommand::Neutral { ramp_ms: 500 });
        tokio::time::sleep(Duration::from_millis(300)).await;

        let seen = sink.seen.lock().unwrap().clone();
        let neutral = seen
            .iter()
            .position(|c| *c == DeviceCommand::Neutral { ramp_ms: 500 })
            .expect("neutral delivered");
        assert!(seen[neutral + 1..].iter().all(|c| !c.is_move()), "{seen:?}");
        assert!(neutral <= 2, "neutral waited behind {neutral} moves");
        assert!(handle.stats().dropped >= 7);
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_lagging() {
        let sink = Arc::new(SlowSink::default());
        let handle = DeviceHandle::spawn(sink.clone());

        for i in 0..(DISPATCH_CAPACITY as u32 + 20) {
            handle.dispatch(stroke(i));
        }

        assert!(handle.stats().dropped >= 19, "{:?}", handle.stats());
    }

    #[tokio::test]
    async fn moves_after_neutral_still_play() {
        let sink = Arc::new(SlowSink::default());
        let handle = DeviceHandle::spawn(sink.clone());

        handle.dispatch_urgent(DeviceCommand::Neutral { ramp_ms: 1000 });
        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.dispatch(stroke(1));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(
            sink.seen.lock().unwrap().as_slice(),
            &[DeviceCommand::Neutral { ramp_ms: 1000 }, stroke(1)]
        );
    }
}

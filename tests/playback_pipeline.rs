use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use handyflow_lib::chaining::ChainedSequence;
use handyflow_lib::device::{DeviceCommand, DeviceHandle, DeviceSink, DeviceStatus};
use handyflow_lib::error::TransmissionError;
use handyflow_lib::library::SegmentLibrary;
use handyflow_lib::models::{Keyframe, Segment};
use handyflow_lib::playback::{
    pending_queue, scheduler_loop, PlaybackConfig, PlaybackController, PlaybackOptions,
    PlaybackScheduler, PlayerState, StopKind,
};
use handyflow_lib::session::{SessionConfig, SessionController};
use tokio::sync::watch;

#[derive(Default)]
struct RecordingSink {
    commands: Mutex<Vec<DeviceCommand>>,
}

impl RecordingSink {
    fn commands(&self) -> Vec<DeviceCommand> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceSink for RecordingSink {
    async fn send(&self, command: &DeviceCommand) -> Result<(), TransmissionError> {
        self.commands.lock().unwrap().push(*command);
        Ok(())
    }

    async fn status(&self) -> Result<DeviceStatus, TransmissionError> {
        Ok(DeviceStatus {
            connected: true,
            ..DeviceStatus::default()
        })
    }
}

/// Records like [`RecordingSink`] but needs longer per command than a dense
/// segment leaves between keyframes.
#[derive(Default)]
struct LaggingSink {
    commands: Mutex<Vec<DeviceCommand>>,
}

#[async_trait]
impl DeviceSink for LaggingSink {
    async fn send(&self, command: &DeviceCommand) -> Result<(), TransmissionError> {
        tokio::time::sleep(Duration::from_millis(60)).await;
        self.commands.lock().unwrap().push(*command);
        Ok(())
    }

    async fn status(&self) -> Result<DeviceStatus, TransmissionError> {
        Ok(DeviceStatus::default())
    }
}

fn keyframes(points: &[(u64, u8)]) -> Vec<Keyframe> {
    points
        .iter()
        .map(|(offset, position)| Keyframe::new(*offset, *position).unwrap())
        .collect()
}

fn stroke_segment(name: &str, step_ms: u64) -> Segment {
    let points: Vec<(u64, u8)> = (0..20)
        .map(|i| (i * step_ms, if i % 2 == 0 { 10 } else { 90 }))
        .collect();
    Segment::new(name, keyframes(&points)).unwrap()
}

fn moves(commands: &[DeviceCommand]) -> Vec<f64> {
    commands
        .iter()
        .filter_map(|command| match command {
            DeviceCommand::Move { position, .. } => Some(*position),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn queued_sequence_reaches_device_in_order() {
    let sink = Arc::new(RecordingSink::default());
    let device = DeviceHandle::spawn(sink.clone());
    let config = PlaybackConfig::default();

    let (producer, consumer) = pending_queue(config.queue_capacity);
    producer
        .push(ChainedSequence {
            keyframes: keyframes(&[(0, 0), (50, 100), (100, 0), (150, 100)]),
            sources: vec!["strokes".into()],
            bridges: 0,
        })
        .await
        .unwrap();

    let (_options_tx, options_rx) = watch::channel(PlaybackOptions::default());
    let (stop_tx, stop_rx) = watch::channel(None);
    let (status_tx, status_rx) = watch::channel(Default::default());
    let scheduler = PlaybackScheduler::new(&config, PlaybackOptions::default());
    let worker = tokio::spawn(scheduler_loop(
        scheduler,
        consumer,
        device.clone(),
        options_rx,
        stop_rx,
        status_tx,
        config.tick_interval,
    ));

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(moves(&sink.commands()), vec![0.0, 1.0, 0.0, 1.0]);

    stop_tx.send(Some(StopKind::Normal)).unwrap();
    worker.await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        sink.commands().last(),
        Some(&DeviceCommand::Neutral { ramp_ms: 1000 })
    );
    assert_eq!(status_rx.borrow().state, PlayerState::Stopped);
}

#[tokio::test]
async fn controller_plays_library_and_stops_to_neutral() {
    let sink = Arc::new(RecordingSink::default());
    let device = DeviceHandle::spawn(sink.clone());
    let library = Arc::new(SegmentLibrary::from_segments(vec![
        stroke_segment("fast", 60),
        stroke_segment("slow", 120),
        stroke_segment("medium", 90),
    ]));
    let session = SessionController::new(SessionConfig::default()).with_device(device.clone());
    let playback = PlaybackController::new(
        library,
        session,
        device,
        PlaybackConfig::default(),
        PlaybackOptions::default(),
    );

    playback.start().await.unwrap();
    assert!(playback.start().await.is_err());
    tokio::time::sleep(Duration::from_millis(600)).await;

    let status = playback.status().await;
    assert!(status.active);
    assert_eq!(status.scheduler.state, PlayerState::Playing);

    playback.stop().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!playback.is_active().await);

    let commands = sink.commands();
    assert_eq!(commands.first(), Some(&DeviceCommand::Resume));
    let positions = moves(&commands);
    assert!(positions.len() >= 3, "only {} moves sent", positions.len());
    assert!(positions.iter().all(|p| (0.0..=1.0).contains(p)));
    assert!(commands.contains(&DeviceCommand::Neutral { ramp_ms: 1000 }));
}

#[tokio::test]
async fn emergency_stop_sends_short_neutral_even_when_idle() {
    let sink = Arc::new(RecordingSink::default());
    let device = DeviceHandle::spawn(sink.clone());
    let session = SessionController::new(SessionConfig::default());
    let playback = PlaybackController::new(
        Arc::new(SegmentLibrary::empty()),
        session,
        device,
        PlaybackConfig::default(),
        PlaybackOptions::default(),
    );

    assert!(playback.start().await.is_err());
    playback.emergency_stop().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        sink.commands(),
        vec![DeviceCommand::Neutral { ramp_ms: 500 }]
    );
}

#[tokio::test]
async fn no_move_follows_emergency_neutral_on_a_lagging_link() {
    let sink = Arc::new(LaggingSink::default());
    let device = DeviceHandle::spawn(sink.clone());
    let library = Arc::new(SegmentLibrary::from_segments(vec![
        stroke_segment("dense-a", 25),
        stroke_segment("dense-b", 30),
    ]));
    let playback = PlaybackController::new(
        library,
        SessionController::new(SessionConfig::default()),
        device.clone(),
        PlaybackConfig::default(),
        PlaybackOptions::default(),
    );

    playback.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    playback.emergency_stop().await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    let commands = sink.commands.lock().unwrap().clone();
    let neutral = commands
        .iter()
        .position(|c| *c == DeviceCommand::Neutral { ramp_ms: 500 })
        .expect("emergency neutral delivered");
    assert!(
        commands[neutral + 1..].iter().all(|c| !c.is_move()),
        "moves after neutral: {commands:?}"
    );
    assert!(device.stats().dropped > 0, "{:?}", device.stats());
}

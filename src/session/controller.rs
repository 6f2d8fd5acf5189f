use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use chrono::Utc;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::{sync::Mutex, task::JoinHandle, time};
use uuid::Uuid;

use crate::arousal::{device_speed, speed_multiplier, ArousalCurve};
use crate::device::{DeviceCommand, DeviceHandle};

use super::state::{ArousalOverride, SessionState, SessionStatus};
use super::time_parse::parse_session_time;
use super::SessionConfig;

/// Multiplier changes smaller than this are not worth a device round trip.
const SPEED_EPSILON: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    pub elapsed_s: f64,
    pub remaining_s: f64,
    pub fraction: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub progress: SessionProgress,
    pub target_arousal: f64,
    pub effective_arousal: f64,
    pub manual_override: bool,
}

/// Owns the session timeline: curve generation, progress, manual arousal and
/// the once-per-second auto-update.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<SessionState>>,
    manual: Arc<ArousalOverride>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
    device: Option<DeviceHandle>,
}

impl SessionController {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            manual: Arc::new(ArousalOverride::new(config.override_cooldown)),
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: config.tick_interval,
            device: None,
        }
    }

    /// Speed multiplier changes are pushed to this device while a session runs.
    pub fn with_device(mut self, device: DeviceHandle) -> Self {
        self.device = Some(device);
        self
    }

    pub async fn start_session(&self, session_length_s: u64, peak_count: u32) -> Result<SessionSnapshot> {
        if session_length_s == 0 {
            bail!("session length must be greater than zero");
        }

        let mut rng = StdRng::from_entropy();
        let curve = ArousalCurve::generate(session_length_s, peak_count, &mut rng);
        let session_id = Uuid::new_v4().to_string();

        {
            let mut state = self.state.lock().await;
            if state.status == SessionStatus::Running {
                bail!("session already active");
            }
            state.begin_session(session_id.clone(), curve, Utc::now(), Instant::now());
            info!(
                "Session {} started: {} s, {} peaks",
                session_id, state.session_length_s, state.peak_count
            );
        }
        self.manual.clear();

        self.spawn_ticker().await;
        Ok(self.snapshot().await)
    }

    /// `duration` in `M:SS`-style notation; malformed input means five minutes.
    pub async fn start_session_str(&self, duration: &str, peak_count: u32) -> Result<SessionSnapshot> {
        self.start_session(parse_session_time(duration), peak_count).await
    }

    pub async fn stop_session(&self) -> Result<SessionSnapshot> {
        self.cancel_ticker().await;
        let snapshot = self.snapshot().await;
        {
            let mut state = self.state.lock().await;
            if state.status != SessionStatus::Idle {
                info!("Session {:?} stopped", state.session_id);
            }
            state.reset();
        }
        self.manual.clear();
        Ok(snapshot)
    }

    /// Returns the clamped value actually applied.
    pub fn set_manual_arousal(&self, value: f64) -> f64 {
        let applied = self.manual.set(value, Instant::now());
        info!("Manual arousal set to {:.0}", applied);
        applied
    }

    pub async fn seek(&self, fraction: f64) {
        let mut state = self.state.lock().await;
        state.seek(fraction, Instant::now());
    }

    pub async fn get_progress(&self) -> SessionProgress {
        let state = self.state.lock().await;
        let (elapsed_s, remaining_s, fraction) = state.progress(Instant::now());
        SessionProgress {
            elapsed_s,
            remaining_s,
            fraction,
        }
    }

    pub async fn get_target_arousal(&self, elapsed_s: f64) -> f64 {
        self.state.lock().await.curve.get_target(elapsed_s)
    }

    /// Manual value during its cooldown, otherwise the last curve value.
    pub async fn current_arousal(&self) -> f64 {
        if let Some(manual) = self.manual.active_value(Instant::now()) {
            return manual;
        }
        self.state.lock().await.current_arousal
    }

    /// Arousal that should steer selection, or `None` when no session runs.
    pub async fn arousal_for_selection(&self) -> Option<f64> {
        let running = self.state.lock().await.status == SessionStatus::Running;
        if running {
            Some(self.current_arousal().await)
        } else {
            None
        }
    }

    pub async fn status(&self) -> SessionStatus {
        self.state.lock().await.status
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let now = Instant::now();
        let state = self.state.lock().await;
        let (elapsed_s, remaining_s, fraction) = state.progress(now);
        let manual = self.manual.active_value(now);
        SessionSnapshot {
            progress: SessionProgress {
                elapsed_s,
                remaining_s,
                fraction,
            },
            target_arousal: state.target_arousal(now),
            effective_arousal: manual.unwrap_or(state.current_arousal),
            manual_override: manual.is_some(),
            state: state.clone(),
        }
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let state = self.state.clone();
        let manual = self.manual.clone();
        let device = self.device.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            let mut last_speed: Option<f64> = None;
            loop {
                interval.tick().await;
                let now = Instant::now();

                let (current, target) = {
                    let mut guard = state.lock().await;
                    if guard.status != SessionStatus::Running {
                        break;
                    }
                    if guard.is_finished(now) {
                        guard.complete();
                        info!("Session {:?} completed", guard.session_id);
                        break;
                    }
                    let target = guard.target_arousal(now);
                    if manual.active_value(now).is_none() {
                        guard.current_arousal = target;
                    }
                    (manual.active_value(now).unwrap_or(guard.current_arousal), target)
                };

                let multiplier = speed_multiplier(current, target);
                let changed =
                    last_speed.map_or(true, |last| (last - multiplier).abs() > SPEED_EPSILON);
                if changed {
                    last_speed = Some(multiplier);
                    let speed = device_speed(multiplier);
                    match &device {
                        Some(device) => device.dispatch(DeviceCommand::SetSpeed(speed)),
                        None => debug!("No device attached; speed x{:.2} not sent", speed),
                    }
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}

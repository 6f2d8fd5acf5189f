use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::arousal::{ArousalCurve, DEFAULT_AROUSAL};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
    Completed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub status: SessionStatus,
    pub session_id: Option<String>,
    pub session_length_s: u64,
    pub peak_count: u32,
    pub started_at: Option<DateTime<Utc>>,
    /// Last arousal value taken from the curve by the auto-update path.
    pub current_arousal: f64,
    #[serde(skip)]
    pub curve: ArousalCurve,
    /// Wall-clock point that corresponds to elapsed = 0; moved by seeks.
    #[serde(skip)]
    pub running_anchor: Option<Instant>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            session_id: None,
            session_length_s: 0,
            peak_count: 0,
            started_at: None,
            current_arousal: DEFAULT_AROUSAL,
            curve: ArousalCurve::default(),
            running_anchor: None,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_session(
        &mut self,
        session_id: String,
        curve: ArousalCurve,
        start_at: DateTime<Utc>,
        now: Instant,
    ) {
        let current_arousal = curve.get_target(0.0);
        *self = Self {
            status: SessionStatus::Running,
            session_id: Some(session_id),
            session_length_s: curve.session_length_s(),
            peak_count: curve.peak_count(),
            started_at: Some(start_at),
            current_arousal,
            curve,
            running_anchor: Some(now),
        };
    }

    pub fn elapsed_s(&self, now: Instant) -> f64 {
        match (self.status, self.running_anchor) {
            (SessionStatus::Running, Some(anchor)) => now
                .saturating_duration_since(anchor)
                .as_secs_f64()
                .min(self.session_length_s as f64),
            (SessionStatus::Completed, _) => self.session_length_s as f64,
            _ => 0.0,
        }
    }

    /// (elapsed, remaining, fraction complete)
    pub fn progress(&self, now: Instant) -> (f64, f64, f64) {
        if self.session_length_s == 0 {
            return (0.0, 0.0, 0.0);
        }
        let length = self.session_length_s as f64;
        let elapsed = self.elapsed_s(now);
        (elapsed, (length - elapsed).max(0.0), elapsed / length)
    }

    pub fn target_arousal(&self, now: Instant) -> f64 {
        self.curve.get_target(self.elapsed_s(now))
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        self.status == SessionStatus::Running
            && self.elapsed_s(now) >= self.session_length_s as f64
    }

    /// Jumps the timeline to `fraction` of the session.
    pub fn seek(&mut self, fraction: f64, now: Instant) {
        if self.status != SessionStatus::Running || !fraction.is_finite() {
            return;
        }
        let offset = Duration::from_secs_f64(fraction.clamp(0.0, 1.0) * self.session_length_s as f64);
        self.running_anchor = Some(now.checked_sub(offset).unwrap_or(now));
        self.current_arousal = self.target_arousal(now);
    }

    pub fn complete(&mut self) {
        self.status = SessionStatus::Completed;
        self.running_anchor = None;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Manual arousal setting shared by the control surface and the auto-update
/// ticker. Two scalars, so plain atomics rather than a lock.
#[derive(Debug)]
pub struct ArousalOverride {
    value_bits: AtomicU64,
    /// Milliseconds since `origin` plus one; zero means no override.
    set_at: AtomicU64,
    origin: Instant,
    cooldown: Duration,
}

impl ArousalOverride {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            value_bits: AtomicU64::new(DEFAULT_AROUSAL.to_bits()),
            set_at: AtomicU64::new(0),
            origin: Instant::now(),
            cooldown,
        }
    }

    /// Stores the clamped value and restarts the cooldown.
    pub fn set(&self, value: f64, now: Instant) -> f64 {
        let clamped = if value.is_finite() {
            value.clamp(0.0, 100.0)
        } else {
            DEFAULT_AROUSAL
        };
        self.value_bits.store(clamped.to_bits(), Ordering::Relaxed);
        let stamp = now.saturating_duration_since(self.origin).as_millis() as u64 + 1;
        self.set_at.store(stamp, Ordering::Release);
        clamped
    }

    /// The manual value while its cooldown has not yet run out.
    pub fn active_value(&self, now: Instant) -> Option<f64> {
        let stamp = self.set_at.load(Ordering::Acquire);
        if stamp == 0 {
            return None;
        }
        let set_at = self.origin + Duration::from_millis(stamp - 1);
        if now.saturating_duration_since(set_at) < self.cooldown {
            Some(f64::from_bits(self.value_bits.load(Ordering::Relaxed)))
        } else {
            None
        }
    }

    pub fn clear(&self) {
        self.set_at.store(0, Ordering::Release);
    }
}

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use log::{debug, info};
use serde::Serialize;

use crate::chaining::ChainedSequence;
use crate::device::DeviceCommand;

use super::config::{PlaybackConfig, PlaybackOptions};
use super::cursor::PlaybackCursor;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerState {
    #[default]
    Idle,
    /// Waiting for the next sequence while playback should continue.
    Loading,
    Playing,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StopKind {
    Normal,
    Emergency,
}

/// Where the scheduler pulls its next sequence from.
pub trait SequenceSource {
    fn try_next(&mut self) -> Option<ChainedSequence>;
}

impl SequenceSource for VecDeque<ChainedSequence> {
    fn try_next(&mut self) -> Option<ChainedSequence> {
        self.pop_front()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub state: PlayerState,
    pub emitted: u64,
    pub last_position: Option<f64>,
    pub keyframe_index: usize,
    pub keyframe_count: usize,
    pub sources: Vec<String>,
}

/// Turns queued sequences into timed device commands. Time only enters
/// through `tick(now)`, so the caller owns the clock.
pub struct PlaybackScheduler {
    state: PlayerState,
    cursor: Option<PlaybackCursor>,
    options: PlaybackOptions,
    min_interval: Duration,
    last_ramp_ms: u32,
    stop_ramp_ms: u32,
    emergency_ramp_ms: u32,
    slow_mode_factor: f64,
    last_emit: Option<Instant>,
    last_sent: Option<f64>,
    continuous: bool,
    emitted: u64,
}

impl PlaybackScheduler {
    pub fn new(config: &PlaybackConfig, options: PlaybackOptions) -> Self {
        Self {
            state: PlayerState::Idle,
            cursor: None,
            options,
            min_interval: config.min_command_interval,
            last_ramp_ms: config.last_ramp_ms,
            stop_ramp_ms: config.stop_ramp_ms,
            emergency_ramp_ms: config.emergency_ramp_ms,
            slow_mode_factor: config.slow_mode_factor,
            last_emit: None,
            last_sent: None,
            continuous: false,
            emitted: 0,
        }
    }

    /// Playback should run until stopped; an empty queue means Loading, not
    /// Idle.
    pub fn start(&mut self) {
        self.continuous = true;
        if matches!(self.state, PlayerState::Idle | PlayerState::Stopped) {
            self.state = PlayerState::Loading;
        }
    }

    pub fn set_options(&mut self, options: PlaybackOptions) {
        self.options = options;
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Emits every keyframe that is due, at most one per minimum interval.
    /// Late keyframes are sent late rather than skipped.
    pub fn tick(&mut self, now: Instant, source: &mut dyn SequenceSource) -> Vec<DeviceCommand> {
        let mut commands = Vec::new();
        if self.state == PlayerState::Stopped || !self.ensure_cursor(now, source) {
            return commands;
        }

        while let Some(cursor) = self.cursor.as_mut() {
            let Some(keyframe) = cursor.due(now) else {
                break;
            };
            if let Some(last) = self.last_emit {
                if now.saturating_duration_since(last) < self.min_interval {
                    break;
                }
            }

            let ramp = cursor.ramp_to_next().unwrap_or(self.last_ramp_ms as u64);
            let ramp_ms = scale_ramp(ramp, self.options.slow_mode, self.slow_mode_factor);
            let position = self.options.range.normalize(keyframe.position);
            commands.push(DeviceCommand::Move { position, ramp_ms });
            cursor.advance();
            self.last_emit = Some(now);
            self.last_sent = Some(position);
            self.emitted += 1;

            if cursor.is_exhausted() {
                self.ensure_cursor(now, source);
            }
        }

        commands
    }

    /// Bypasses the rate limiter: the neutral command is meant to go out now.
    pub fn stop(&mut self, kind: StopKind) -> DeviceCommand {
        self.state = PlayerState::Stopped;
        self.cursor = None;
        self.continuous = false;
        let ramp_ms = match kind {
            StopKind::Normal => self.stop_ramp_ms,
            StopKind::Emergency => self.emergency_ramp_ms,
        };
        info!("Playback stopped ({:?}), returning to neutral over {} ms", kind, ramp_ms);
        DeviceCommand::Neutral { ramp_ms }
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            state: self.state,
            emitted: self.emitted,
            last_position: self.last_sent,
            keyframe_index: self.cursor.as_ref().map_or(0, PlaybackCursor::index),
            keyframe_count: self.cursor.as_ref().map_or(0, PlaybackCursor::len),
            sources: self
                .cursor
                .as_ref()
                .map(|cursor| cursor.sources().to_vec())
                .unwrap_or_default(),
        }
    }

    /// Makes sure a cursor with keyframes left is loaded; updates the state
    /// either way.
    fn ensure_cursor(&mut self, now: Instant, source: &mut dyn SequenceSource) -> bool {
        if self.cursor.as_ref().is_some_and(|cursor| !cursor.is_exhausted()) {
            return true;
        }

        while let Some(sequence) = source.try_next() {
            if sequence.is_empty() {
                continue;
            }
            debug!(
                "Loaded sequence of {} keyframes ({} ms) from {:?}",
                sequence.len(),
                sequence.duration_ms(),
                sequence.sources
            );
            self.cursor = Some(PlaybackCursor::new(sequence, now));
            self.state = PlayerState::Playing;
            return true;
        }

        self.cursor = None;
        self.state = if self.continuous {
            PlayerState::Loading
        } else {
            PlayerState::Idle
        };
        false
    }
}

fn scale_ramp(ramp_ms: u64, slow_mode: bool, factor: f64) -> u32 {
    let scaled = if slow_mode {
        (ramp_ms as f64 * factor).round() as u64
    } else {
        ramp_ms
    };
    scaled.min(u32::MAX as u64) as u32
}

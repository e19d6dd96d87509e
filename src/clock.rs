//! Simulation clock and play/pause control.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_SPEED: f64 = 0.1;
pub const MAX_SPEED: f64 = 20.0;
/// Default longest raw frame accepted by [`Clock::advance`] (seconds).
pub const MAX_FRAME_DELTA: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockState {
    Stopped,
    Running,
    Paused,
}

/// Display label of the whole-second counter.
///
/// One simulated second is one unit either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarUnit {
    Day,
    Week,
}

impl fmt::Display for CalendarUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day => write!(f, "day"),
            Self::Week => write!(f, "week"),
        }
    }
}

/// Copy of the clock fields handed to listeners and readers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockSnapshot {
    pub state: ClockState,
    pub speed: f64,
    pub elapsed: f64,
    pub ticks: u64,
    pub days: u64,
    pub unit: CalendarUnit,
}

type Listener = Box<dyn FnMut(&ClockSnapshot)>;

/// Process-wide simulation clock.
///
/// Gates every update: [`Clock::advance`] only yields a time step while running.
pub struct Clock {
    state: ClockState,
    speed: f64,
    elapsed: f64,
    ticks: u64,
    days: u64,
    unit: CalendarUnit,
    max_frame_delta: f64,
    listeners: Vec<Listener>,
}

impl Clock {
    pub fn new(speed: f64, unit: CalendarUnit) -> Self {
        Self {
            state: ClockState::Stopped,
            speed: clamp_speed(speed),
            elapsed: 0.0,
            ticks: 0,
            days: 0,
            unit,
            max_frame_delta: MAX_FRAME_DELTA,
            listeners: Vec::new(),
        }
    }

    /// Cap raw frames at `max_frame_delta` seconds.
    pub fn with_max_frame_delta(mut self, max_frame_delta: f64) -> Self {
        if max_frame_delta.is_finite() && max_frame_delta > 0.0 {
            self.max_frame_delta = max_frame_delta;
        }
        self
    }

    /// Register a listener notified synchronously after every state change.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&ClockSnapshot) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn play(&mut self) {
        if self.state != ClockState::Running {
            self.state = ClockState::Running;
            self.notify();
        }
    }

    pub fn pause(&mut self) {
        if self.state == ClockState::Running {
            self.state = ClockState::Paused;
            self.notify();
        }
    }

    pub fn toggle(&mut self) {
        match self.state {
            ClockState::Running => self.pause(),
            ClockState::Paused | ClockState::Stopped => self.play(),
        }
    }

    /// Stop and zero the counters. The speed multiplier is kept.
    pub fn reset(&mut self) {
        self.state = ClockState::Stopped;
        self.elapsed = 0.0;
        self.ticks = 0;
        self.days = 0;
        self.notify();
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = clamp_speed(speed);
        self.notify();
    }

    /// Advance by one frame of `raw_dt` seconds.
    ///
    /// Returns the speed-scaled time step, or `None` when the clock is not running.
    /// Non-finite frames count as zero and long frames are capped at the maximum frame delta.
    pub fn advance(&mut self, raw_dt: f64) -> Option<f64> {
        if self.state != ClockState::Running {
            return None;
        }
        let raw_dt = if raw_dt.is_finite() {
            raw_dt.clamp(0.0, self.max_frame_delta)
        } else {
            0.0
        };
        let dt = raw_dt * self.speed;
        self.elapsed += dt;
        self.ticks += 1;
        self.days = self.elapsed.floor() as u64;
        self.notify();
        Some(dt)
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn days(&self) -> u64 {
        self.days
    }

    pub fn unit(&self) -> CalendarUnit {
        self.unit
    }

    pub fn max_frame_delta(&self) -> f64 {
        self.max_frame_delta
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot {
            state: self.state,
            speed: self.speed,
            elapsed: self.elapsed,
            ticks: self.ticks,
            days: self.days,
            unit: self.unit,
        }
    }

    fn notify(&mut self) {
        let snapshot = self.snapshot();
        for listener in &mut self.listeners {
            listener(&snapshot);
        }
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock")
            .field("state", &self.state)
            .field("speed", &self.speed)
            .field("elapsed", &self.elapsed)
            .field("ticks", &self.ticks)
            .field("days", &self.days)
            .field("unit", &self.unit)
            .field("max_frame_delta", &self.max_frame_delta)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn clamp_speed(speed: f64) -> f64 {
    // NaN would slip through clamp.
    if speed.is_nan() {
        1.0
    } else {
        speed.clamp(MIN_SPEED, MAX_SPEED)
    }
}

/// Fixed one-second cadence accumulated from variable time steps.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cadence {
    acc: f64,
}

impl Cadence {
    pub const PERIOD: f64 = 1.0;

    pub fn new() -> Self {
        Self { acc: 0.0 }
    }

    /// Start partway through the period so agents born together do not fire together.
    pub fn with_offset(offset: f64) -> Self {
        Self {
            acc: offset.clamp(0.0, Self::PERIOD),
        }
    }

    /// Accumulate `dt` and return how many whole periods have elapsed.
    pub fn tick(&mut self, dt: f64) -> u32 {
        if dt.is_finite() && dt > 0.0 {
            self.acc += dt;
        }
        let periods = (self.acc / Self::PERIOD).floor();
        self.acc = (self.acc - periods * Self::PERIOD).clamp(0.0, Self::PERIOD);
        // Float to int casts saturate.
        periods as u32
    }
}

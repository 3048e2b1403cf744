//! Millisecond time sources.
//!
//! Every cooldown and animation timer in the engine compares "now" against a
//! stored start time. The session asks its clock for "now" exactly once per
//! tick, after calling [`Clock::tick`], so all entities in a tick see the same
//! timestamp.

use std::time::Instant;

/// Monotonic millisecond time source.
pub trait Clock {
    /// Current time in milliseconds.
    fn now_ms(&self) -> u64;

    /// Called once at the start of every simulation tick.
    fn tick(&mut self);
}

/// Deterministic clock driven by a frame counter.
///
/// `now_ms` is `frame * 1000 / fps`, computed in integers so that replays
/// produce identical timestamps on every platform.
#[derive(Debug, Clone)]
pub struct FrameClock {
    fps: u32,
    frame: u64,
}

impl FrameClock {
    /// Creates a clock at frame zero. An `fps` of zero is treated as one.
    #[must_use]
    pub fn new(fps: u32) -> Self {
        Self {
            fps: fps.max(1),
            frame: 0,
        }
    }

    /// Frames elapsed so far.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Configured frame rate.
    #[must_use]
    pub fn fps(&self) -> u32 {
        self.fps
    }
}

impl Clock for FrameClock {
    fn now_ms(&self) -> u64 {
        self.frame * 1000 / u64::from(self.fps)
    }

    fn tick(&mut self) {
        self.frame += 1;
    }
}

/// Clock advanced by hand, with an optional fixed step per tick.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: u64,
    step_ms: u64,
}

impl ManualClock {
    /// Creates a clock at `start` that advances `step_ms` on every tick.
    #[must_use]
    pub fn new(start: u64, step_ms: u64) -> Self {
        Self {
            now: start,
            step_ms,
        }
    }

    /// Moves time forward by `ms`.
    pub fn advance(&mut self, ms: u64) {
        self.now += ms;
    }

    /// Changes the per-tick step.
    pub fn set_step(&mut self, step_ms: u64) {
        self.step_ms = step_ms;
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now
    }

    fn tick(&mut self) {
        self.now += self.step_ms;
    }
}

/// Wall-clock time since construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Starts counting from now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn tick(&mut self) {}
}

//! Per-frame timing.

use web_time::{Duration, Instant};

/// Measures the time between frames and counts them.
#[derive(Debug)]
pub struct FrameClock {
    last_tick: Instant,
    frame_count: u64,
    total: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
            frame_count: 0,
            total: Duration::ZERO,
        }
    }

    /// Starts a new frame and returns the time since the previous one.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now.duration_since(self.last_tick);
        self.last_tick = now;
        self.frame_count += 1;
        self.total += delta;
        delta
    }

    /// Frames started so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Average frame time, or zero before the first tick.
    pub fn average_frame_time(&self) -> Duration {
        match u32::try_from(self.frame_count) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(frames) => self.total / frames,
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

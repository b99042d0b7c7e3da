// Frame pacing and recognition frame-skipping.
//
// Inference is only needed at ~30 Hz. Above that, every `skip + 1`-th frame
// is submitted and the others reuse the last published observation.

use std::thread;
use std::time::{Duration, Instant};

/// Recognition cadence the skip factor is computed against.
pub const RECOGNITION_FPS: u32 = 30;

/// Upper bound for the submission counter before it wraps.
const COUNTER_WRAP: u64 = 1_000_000;

/// `max(0, floor(fps_cap / 30) - 1)`: 30 fps -> 0, 60 fps -> 1, 90 fps -> 2.
pub fn skip_factor(fps_cap: u32) -> u32 {
    (fps_cap / RECOGNITION_FPS).saturating_sub(1)
}

/// Target time per loop iteration for `fps_cap`.
pub fn frame_interval(fps_cap: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / fps_cap.max(1) as u64)
}

#[derive(Debug)]
pub struct FramePacer {
    period: u64, // skip + 1
    wrap: u64,   // multiple of `period` so wrapping keeps the phase
    counter: u64,
    interval: Duration,
    last_tick: Option<Instant>,
}

impl FramePacer {
    pub fn new(fps_cap: u32) -> Self {
        let period = skip_factor(fps_cap) as u64 + 1;
        Self {
            period,
            wrap: COUNTER_WRAP - COUNTER_WRAP % period,
            counter: 0,
            interval: frame_interval(fps_cap),
            last_tick: None,
        }
    }

    /// Whether the current frame goes to the recognizer. Advances the counter.
    pub fn should_submit(&mut self) -> bool {
        let submit = self.counter % self.period == 0;
        self.counter = (self.counter + 1) % self.wrap;
        submit
    }

    pub fn skip(&self) -> u32 {
        (self.period - 1) as u32
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Sleep off whatever is left of this frame's time budget.
    /// The camera read usually dominates; this only caps a faster source.
    pub fn wait_for_next(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last_tick {
            let spent = now.saturating_duration_since(last);
            if spent < self.interval {
                thread::sleep(self.interval - spent);
            }
        }
        self.last_tick = Some(Instant::now());
    }

    #[cfg(test)]
    fn with_counter(fps_cap: u32, counter: u64) -> Self {
        let mut p = Self::new(fps_cap);
        p.counter = counter;
        p
    }
}

/// Rolling frames-per-second estimate, refreshed once per second.
#[derive(Debug)]
pub struct FpsCounter {
    window_start: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self { window_start: now, frames: 0, fps: 0.0 }
    }

    pub fn tick(&mut self, now: Instant) -> f32 {
        self.frames += 1;
        let secs = now.saturating_duration_since(self.window_start).as_secs_f32();
        if secs >= 1.0 {
            self.fps = self.frames as f32 / secs;
            self.frames = 0;
            self.window_start = now;
        }
        self.fps
    }
}

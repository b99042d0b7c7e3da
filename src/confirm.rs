// Hold-to-confirm save gate.
//
// A save needs ThumbUp held at a valid distance, uninterrupted, for the
// configured duration, and a stroke of at least `min_points`. Any other
// gesture or an invalid-distance frame drops the hold. After a commit (or a
// failed attempt) a frame-counted cooldown blocks a new hold from starting.

use std::time::{Duration, Instant};

use crate::config::Thresholds;
use crate::types::GestureCategory;

/// Frames after a commit during which no new hold may start (~1 s at 30 fps).
pub const COMMIT_COOLDOWN_FRAMES: u32 = 30;

/// How long the "saved" banner stays up; no new commit while it shows.
pub const SAVED_BANNER: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmState {
    Idle,
    Holding { since: Instant },
}

/// Per-frame verdict of the gate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GateDecision {
    /// Not a valid ThumbUp frame; any hold was dropped.
    Inactive,
    /// ThumbUp is held but the post-commit cooldown has not run out.
    CoolingDown { remaining: u32 },
    /// Hold in progress, `progress` in 0..=1.
    Holding { progress: f32 },
    /// Held long enough but the stroke is too short.
    NeedMorePoints { missing: usize },
    /// Persist now, then report back with `record_commit` or `record_failed_commit`.
    Commit,
}

#[derive(Debug)]
pub struct ConfirmGate {
    state: ConfirmState,
    cooldown_frames: u32,
    last_commit: Option<Instant>,
}

impl Default for ConfirmGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfirmGate {
    pub fn new() -> Self {
        Self { state: ConfirmState::Idle, cooldown_frames: 0, last_commit: None }
    }

    pub fn evaluate(
        &mut self,
        category: GestureCategory,
        distance_valid: bool,
        point_count: usize,
        thresholds: &Thresholds,
        now: Instant,
    ) -> GateDecision {
        if category != GestureCategory::ThumbUp || !distance_valid {
            self.state = ConfirmState::Idle;
            return GateDecision::Inactive;
        }

        let since = match self.state {
            ConfirmState::Idle if self.cooldown_frames > 0 => {
                return GateDecision::CoolingDown { remaining: self.cooldown_frames };
            }
            ConfirmState::Idle => {
                self.state = ConfirmState::Holding { since: now };
                return GateDecision::Holding { progress: 0.0 };
            }
            ConfirmState::Holding { since } => since,
        };

        let elapsed = now.saturating_duration_since(since);
        let duration = thresholds.confirm_duration;
        if elapsed < duration {
            let progress = elapsed.as_secs_f32() / duration.as_secs_f32();
            return GateDecision::Holding { progress };
        }
        if point_count < thresholds.min_points {
            return GateDecision::NeedMorePoints { missing: thresholds.min_points - point_count };
        }
        if self.saved_banner_visible(now) {
            return GateDecision::Holding { progress: 1.0 };
        }
        GateDecision::Commit
    }

    /// The signature was written: drop the hold, start cooldown and the banner.
    pub fn record_commit(&mut self, now: Instant) {
        self.state = ConfirmState::Idle;
        self.cooldown_frames = COMMIT_COOLDOWN_FRAMES;
        self.last_commit = Some(now);
    }

    /// The write failed: the user must hold again (after the cooldown) to retry.
    pub fn record_failed_commit(&mut self) {
        self.state = ConfirmState::Idle;
        self.cooldown_frames = COMMIT_COOLDOWN_FRAMES;
    }

    /// Called once per processed frame, whatever the gesture.
    pub fn tick_cooldown(&mut self) {
        self.cooldown_frames = self.cooldown_frames.saturating_sub(1);
    }

    /// Drop any hold in progress (ThumbDown / explicit clear).
    pub fn cancel_hold(&mut self) {
        self.state = ConfirmState::Idle;
    }

    /// Forget everything, including cooldown and banner (session teardown).
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn saved_banner_visible(&self, now: Instant) -> bool {
        self.last_commit
            .is_some_and(|t| now.saturating_duration_since(t) < SAVED_BANNER)
    }

    pub fn state(&self) -> ConfirmState {
        self.state
    }

    pub fn cooldown_frames(&self) -> u32 {
        self.cooldown_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds(min_points: usize) -> Thresholds {
        Thresholds { min_points, ..Thresholds::default() }
    }

    #[test]
    fn first_valid_thumb_up_starts_the_hold() {
        let mut gate = ConfirmGate::new();
        let t0 = Instant::now();
        let d = gate.evaluate(GestureCategory::ThumbUp, true, 0, &thresholds(200), t0);
        assert_eq!(d, GateDecision::Holding { progress: 0.0 });
        assert_eq!(gate.state(), ConfirmState::Holding { since: t0 });
    }

    #[test]
    fn progress_grows_then_commits() {
        let mut gate = ConfirmGate::new();
        let th = thresholds(10);
        let t0 = Instant::now();
        gate.evaluate(GestureCategory::ThumbUp, true, 10, &th, t0);
        match gate.evaluate(GestureCategory::ThumbUp, true, 10, &th, t0 + Duration::from_millis(1500)) {
            GateDecision::Holding { progress } => assert!((progress - 0.5).abs() < 1e-3),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            gate.evaluate(GestureCategory::ThumbUp, true, 10, &th, t0 + Duration::from_secs(3)),
            GateDecision::Commit
        );
    }

    #[test]
    fn short_stroke_reports_missing_points() {
        let mut gate = ConfirmGate::new();
        let th = thresholds(200);
        let t0 = Instant::now();
        gate.evaluate(GestureCategory::ThumbUp, true, 50, &th, t0);
        assert_eq!(
            gate.evaluate(GestureCategory::ThumbUp, true, 50, &th, t0 + Duration::from_secs(4)),
            GateDecision::NeedMorePoints { missing: 150 }
        );
    }

    #[test]
    fn interruption_resets_progress() {
        let mut gate = ConfirmGate::new();
        let th = thresholds(1);
        let t0 = Instant::now();
        gate.evaluate(GestureCategory::ThumbUp, true, 5, &th, t0);
        assert_eq!(
            gate.evaluate(GestureCategory::ThumbUp, false, 5, &th, t0 + Duration::from_secs(2)),
            GateDecision::Inactive
        );
        // restarts from zero
        assert_eq!(
            gate.evaluate(GestureCategory::ThumbUp, true, 5, &th, t0 + Duration::from_millis(2500)),
            GateDecision::Holding { progress: 0.0 }
        );
        assert!(matches!(
            gate.evaluate(GestureCategory::ThumbUp, true, 5, &th, t0 + Duration::from_secs(4)),
            GateDecision::Holding { .. }
        ));
    }

    #[test]
    fn cooldown_blocks_a_new_hold() {
        let mut gate = ConfirmGate::new();
        let th = thresholds(1);
        let t0 = Instant::now();
        gate.record_commit(t0);
        gate.tick_cooldown();
        assert_eq!(
            gate.evaluate(GestureCategory::ThumbUp, true, 5, &th, t0),
            GateDecision::CoolingDown { remaining: COMMIT_COOLDOWN_FRAMES - 1 }
        );
        for _ in 0..COMMIT_COOLDOWN_FRAMES {
            gate.tick_cooldown();
        }
        assert_eq!(gate.cooldown_frames(), 0);
        assert_eq!(
            gate.evaluate(GestureCategory::ThumbUp, true, 5, &th, t0),
            GateDecision::Holding { progress: 0.0 }
        );
    }

    #[test]
    fn banner_holds_off_a_second_commit() {
        let mut gate = ConfirmGate::new();
        let th = Thresholds { min_points: 1, confirm_duration: Duration::from_millis(100), ..Thresholds::default() };
        let t0 = Instant::now();
        gate.record_commit(t0);
        for _ in 0..COMMIT_COOLDOWN_FRAMES {
            gate.tick_cooldown();
        }
        gate.evaluate(GestureCategory::ThumbUp, true, 5, &th, t0 + Duration::from_millis(500));
        assert_eq!(
            gate.evaluate(GestureCategory::ThumbUp, true, 5, &th, t0 + Duration::from_millis(700)),
            GateDecision::Holding { progress: 1.0 }
        );
        assert_eq!(
            gate.evaluate(GestureCategory::ThumbUp, true, 5, &th, t0 + Duration::from_millis(2100)),
            GateDecision::Commit
        );
    }

    #[test]
    fn failed_commit_needs_a_fresh_hold() {
        let mut gate = ConfirmGate::new();
        gate.record_failed_commit();
        assert_eq!(gate.state(), ConfirmState::Idle);
        assert_eq!(gate.cooldown_frames(), COMMIT_COOLDOWN_FRAMES);
        assert!(!gate.saved_banner_visible(Instant::now()));
    }
}

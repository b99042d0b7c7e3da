// Hand-to-camera distance gate.
//
// The index fingertip's depth is turned into a 0-100 "closeness" score,
// `(1 - |z|) * 100`, and compared with the configured bounds. The score is a
// monotonic proxy, not a calibrated distance, so the bounds are tuned by feel.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::Thresholds;
use crate::types::GestureObservation;

/// How long a distance warning stays on screen after the last offending frame.
pub const WARNING_DISPLAY: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceReason {
    TooClose,
    TooFar,
    NoHand,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceState {
    Valid,
    Invalid(DistanceReason),
}

impl DistanceState {
    pub fn is_valid(&self) -> bool {
        matches!(self, DistanceState::Valid)
    }

    pub fn reason(&self) -> Option<DistanceReason> {
        match self {
            DistanceState::Valid => None,
            DistanceState::Invalid(r) => Some(*r),
        }
    }
}

/// Closeness score for a fingertip depth value.
pub fn closeness_score(z: f32) -> f32 {
    (1.0 - z.abs()) * 100.0
}

/// Pure classification of a score against `(min, max)`.
pub fn classify(score: f32, min_distance: f32, max_distance: f32) -> DistanceState {
    if score < min_distance {
        DistanceState::Invalid(DistanceReason::TooClose)
    } else if score > max_distance {
        DistanceState::Invalid(DistanceReason::TooFar)
    } else {
        DistanceState::Valid
    }
}

/// A warning raised by a too-close / too-far frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DistanceWarning {
    pub reason: DistanceReason,
    pub raised_at: Instant,
}

impl DistanceWarning {
    pub fn message(&self) -> &'static str {
        match self.reason {
            DistanceReason::TooClose => "Too close to camera! Please move back.",
            DistanceReason::TooFar => "Too far from camera! Please move closer.",
            DistanceReason::NoHand => "No hand detected",
        }
    }
}

/// Classifies each frame and remembers the last warning for the overlay.
#[derive(Debug, Default)]
pub struct DistanceValidator {
    warning: Option<DistanceWarning>,
    last_score: Option<f32>,
}

impl DistanceValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify the current observation. A missing observation or one without
    /// landmarks is `NoHand`, which does not raise a warning.
    pub fn check(
        &mut self,
        observation: Option<&GestureObservation>,
        thresholds: &Thresholds,
        now: Instant,
    ) -> DistanceState {
        let Some(tip) = observation.and_then(|o| o.index_tip()) else {
            self.last_score = None;
            return DistanceState::Invalid(DistanceReason::NoHand);
        };

        let score = closeness_score(tip.z);
        self.last_score = Some(score);
        let state = classify(score, thresholds.min_distance, thresholds.max_distance);
        if let DistanceState::Invalid(reason) = state {
            debug!(score, ?reason, "hand outside distance bounds");
            self.warning = Some(DistanceWarning { reason, raised_at: now });
        }
        state
    }

    /// The warning to display at `now`, expiring it once its time is up.
    pub fn active_warning(&mut self, now: Instant) -> Option<DistanceWarning> {
        match self.warning {
            Some(w) if now.saturating_duration_since(w.raised_at) < WARNING_DISPLAY => Some(w),
            Some(_) => {
                self.warning = None;
                None
            }
            None => None,
        }
    }

    /// Score computed on the last frame that had a hand (developer readout).
    pub fn last_score(&self) -> Option<f32> {
        self.last_score
    }

    pub fn reset(&mut self) {
        self.warning = None;
        self.last_score = None;
    }
}

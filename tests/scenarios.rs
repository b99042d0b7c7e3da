// End-to-end frame sequences through CaptureSession, with a fake clock.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use airsign::config::Thresholds;
use airsign::confirm::GateDecision;
use airsign::distance::{classify, closeness_score, DistanceReason, DistanceState};
use airsign::drawing::StrokeUpdate;
use airsign::persist::SignatureSink;
use airsign::session::{CaptureSession, FrameOutcome, SessionEvent};
use airsign::types::{
    FrameBuffer, GestureCategory, GestureObservation, Landmark, INDEX_FINGER_TIP, LANDMARK_COUNT,
};

const W: usize = 640;
const H: usize = 480;
const FRAME: Duration = Duration::from_micros(33_334);
const VALID_Z: f32 = 0.05; // score 95

#[derive(Default)]
struct CountingSink {
    saves: usize,
}

impl SignatureSink for CountingSink {
    fn persist(&mut self, canvas: &FrameBuffer) -> airsign::Result<PathBuf> {
        assert!(!canvas.is_blank(), "committed an empty canvas");
        self.saves += 1;
        Ok(PathBuf::from(format!("signature_{}.png", self.saves)))
    }
}

struct Harness {
    session: CaptureSession,
    sink: CountingSink,
    thresholds: Thresholds,
    now: Instant,
    frames: usize,
}

impl Harness {
    fn new(thresholds: Thresholds) -> Self {
        let now = Instant::now();
        Self {
            session: CaptureSession::new(W, H, now),
            sink: CountingSink::default(),
            thresholds,
            now,
            frames: 0,
        }
    }

    fn step(&mut self, observation: Option<GestureObservation>) -> FrameOutcome {
        let mut frame = FrameBuffer::blank(W, H);
        let out = self.session.process_frame(
            &mut frame,
            observation.as_ref(),
            &self.thresholds,
            false,
            &mut self.sink,
            self.now,
        );
        self.now += FRAME;
        self.frames += 1;
        out
    }

    fn points(&self) -> usize {
        self.session.drawing().point_count()
    }
}

fn hand(category: GestureCategory, x: f32, y: f32, z: f32) -> GestureObservation {
    let mut landmarks = [Landmark::new(x, y + 0.2, z); LANDMARK_COUNT];
    landmarks[INDEX_FINGER_TIP] = Landmark::new(x, y, z);
    GestureObservation::new(category, Some(landmarks), 0)
}

/// A point on a wobbly path so successive points differ.
fn path_point(i: usize) -> (f32, f32) {
    let t = i as f32 / 300.0;
    (0.1 + 0.8 * t, 0.5 + 0.1 * (i as f32 * 0.3).sin())
}

fn draw_points(h: &mut Harness, n: usize) {
    for i in 0..n {
        let (x, y) = path_point(i);
        h.step(Some(hand(GestureCategory::PointingUp, x, y, VALID_Z)));
    }
}

fn thumb_up() -> Option<GestureObservation> {
    Some(hand(GestureCategory::ThumbUp, 0.5, 0.5, VALID_Z))
}

fn saved(out: &FrameOutcome) -> bool {
    matches!(out.event, Some(SessionEvent::Saved(_)))
}

#[test]
fn scenario_a_long_stroke_and_full_hold_saves_once() {
    let mut h = Harness::new(Thresholds::default());
    draw_points(&mut h, 250);
    assert_eq!(h.points(), 250);

    let mut saves = 0;
    // 3 s of ThumbUp at ~30 fps, plus some extra holding afterwards
    for _ in 0..=110 {
        if saved(&h.step(thumb_up())) {
            saves += 1;
        }
    }
    assert_eq!(saves, 1);
    assert_eq!(h.sink.saves, 1);
    assert_eq!(h.points(), 0);
    assert!(h.session.drawing().canvas().is_blank());
}

#[test]
fn scenario_a_commit_lands_when_duration_elapses() {
    let mut h = Harness::new(Thresholds::default());
    draw_points(&mut h, 250);
    let start = h.now;
    loop {
        let t = h.now;
        let out = h.step(thumb_up());
        if saved(&out) {
            assert!(t.duration_since(start) >= Duration::from_secs(3));
            assert!(t.duration_since(start) < Duration::from_secs(3) + FRAME * 2);
            break;
        }
        assert!(t.duration_since(start) < Duration::from_secs(4), "never committed");
    }
}

#[test]
fn scenario_b_short_stroke_never_saves() {
    let mut h = Harness::new(Thresholds::default());
    draw_points(&mut h, 50);

    let start = h.now;
    let mut hinted_frames = 0;
    while h.now.duration_since(start) < Duration::from_secs(5) {
        let t = h.now;
        let out = h.step(thumb_up());
        assert!(out.event.is_none());
        if t.duration_since(start) >= Duration::from_secs(3) {
            assert_eq!(out.gate, GateDecision::NeedMorePoints { missing: 150 });
            hinted_frames += 1;
        }
    }
    assert!(hinted_frames > 50);
    assert_eq!(h.sink.saves, 0);
    assert_eq!(h.points(), 50);
}

#[test]
fn scenario_c_pause_and_resume_keeps_both_segments() {
    let mut h = Harness::new(Thresholds::default());
    for i in 0..10 {
        h.step(Some(hand(GestureCategory::PointingUp, 0.1 + i as f32 * 0.02, 0.3, VALID_Z)));
    }
    let out = h.step(Some(hand(GestureCategory::Other, 0.5, 0.5, VALID_Z)));
    assert_eq!(out.stroke, StrokeUpdate::ChainBreak);

    let mut first_after_gap = None;
    for i in 0..10 {
        let out = h.step(Some(hand(GestureCategory::PointingUp, 0.6 + i as f32 * 0.02, 0.7, VALID_Z)));
        first_after_gap.get_or_insert(out.stroke);
    }

    assert_eq!(h.points(), 20);
    assert!(matches!(first_after_gap, Some(StrokeUpdate::Appended { segment: false, .. })));

    let stroke = h.session.drawing().stroke();
    let (a, b) = (stroke[9], stroke[10]);
    let mid = ((a.x + b.x) / 2, (a.y + b.y) / 2);
    let canvas = h.session.drawing().canvas();
    assert_eq!(canvas.pixel(mid.0 as usize, mid.1 as usize), Some(0), "gap was bridged");
    // both segments were drawn
    assert_ne!(canvas.pixel(a.x as usize, a.y as usize), Some(0));
    assert_ne!(canvas.pixel(b.x as usize, b.y as usize), Some(0));
}

#[test]
fn scenario_d_thumb_down_wipes_everything() {
    let mut h = Harness::new(Thresholds::default());
    draw_points(&mut h, 40);
    assert!(!h.session.drawing().canvas().is_blank());

    // out of range distance does not matter for a clear
    let out = h.step(Some(hand(GestureCategory::ThumbDown, 0.5, 0.5, 0.5)));
    assert_eq!(out.stroke, StrokeUpdate::Cleared);
    assert!(h.session.drawing().stroke().is_empty());
    assert!(h.session.drawing().canvas().pixels.iter().all(|&p| p == 0));
    assert!(!h.session.drawing().is_drawing());
}

#[test]
fn scenario_e_distance_classification() {
    let (min, max) = (90.0, 99.5);
    assert_eq!(classify(85.0, min, max), DistanceState::Invalid(DistanceReason::TooClose));
    assert_eq!(classify(99.9, min, max), DistanceState::Invalid(DistanceReason::TooFar));
    assert_eq!(classify(95.0, min, max), DistanceState::Valid);

    // the same through landmark depth and the session
    let mut h = Harness::new(Thresholds::default());
    for (z, expected) in [
        (0.15, DistanceState::Invalid(DistanceReason::TooClose)),
        (0.001, DistanceState::Invalid(DistanceReason::TooFar)),
        (0.05, DistanceState::Valid),
        (-0.15, DistanceState::Invalid(DistanceReason::TooClose)),
    ] {
        assert_eq!(classify(closeness_score(z), min, max), expected);
        assert_eq!(h.step(Some(hand(GestureCategory::Other, 0.5, 0.5, z))).distance, expected);
    }
    assert_eq!(h.step(None).distance, DistanceState::Invalid(DistanceReason::NoHand));
}

#[test]
fn pointing_too_close_does_not_draw() {
    let mut h = Harness::new(Thresholds::default());
    for i in 0..5 {
        let (x, y) = path_point(i);
        let out = h.step(Some(hand(GestureCategory::PointingUp, x, y, 0.2)));
        assert_eq!(out.stroke, StrokeUpdate::ChainBreak);
    }
    assert_eq!(h.points(), 0);
}

#[test]
fn interrupted_hold_needs_a_full_new_hold() {
    let mut h = Harness::new(Thresholds::default());
    draw_points(&mut h, 250);

    // 2.9 s, one too-close frame, 2.9 s again: no save
    let hold = |h: &mut Harness, d: Duration| {
        let start = h.now;
        let mut any = false;
        while h.now.duration_since(start) < d {
            any |= saved(&h.step(thumb_up()));
        }
        any
    };
    assert!(!hold(&mut h, Duration::from_millis(2900)));
    h.step(Some(hand(GestureCategory::ThumbUp, 0.5, 0.5, 0.3)));
    assert!(!hold(&mut h, Duration::from_millis(2900)));
    assert_eq!(h.sink.saves, 0);
    // keep holding past the full duration
    assert!(hold(&mut h, Duration::from_millis(300)));
    assert_eq!(h.sink.saves, 1);
}

#[test]
fn no_second_commit_within_cooldown_even_when_held() {
    let thresholds = Thresholds {
        min_points: 5,
        confirm_duration: Duration::from_millis(100),
        ..Thresholds::default()
    };
    let mut h = Harness::new(thresholds);
    let mut commit_frames = Vec::new();

    for round in 0..3 {
        draw_points(&mut h, 5);
        for _ in 0..200 {
            let frame_no = h.frames;
            if saved(&h.step(thumb_up())) {
                commit_frames.push(frame_no);
                break;
            }
        }
        assert_eq!(commit_frames.len(), round + 1, "round {round} never committed");
    }
    for pair in commit_frames.windows(2) {
        assert!(pair[1] - pair[0] >= 30, "commits {pair:?} closer than the cooldown");
    }
}

#[test]
fn stroke_length_only_drops_on_clear_or_commit() {
    let thresholds = Thresholds {
        min_points: 20,
        confirm_duration: Duration::from_millis(300),
        ..Thresholds::default()
    };
    let mut h = Harness::new(thresholds);
    let mut seed: u32 = 0x1234_5678;
    let mut prev = 0;

    for i in 0..3_000 {
        seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let roll = seed >> 24;
        // runs of 25 frames so holds can complete
        let category = match (i / 25) % 6 {
            0 | 1 | 2 => GestureCategory::PointingUp,
            3 => GestureCategory::ThumbUp,
            4 => GestureCategory::Other,
            _ if roll % 7 == 0 => GestureCategory::ThumbDown,
            _ => GestureCategory::None,
        };
        let z = if roll % 11 == 0 { 0.4 } else { VALID_Z };
        let (x, y) = path_point(i % 300);
        let out = h.step(Some(hand(category, x, y, z)));

        let len = h.points();
        let reset = out.stroke == StrokeUpdate::Cleared || saved(&out);
        if reset {
            assert_eq!(len, 0);
            assert!(h.session.drawing().canvas().is_blank());
        } else {
            assert!(len >= prev, "stroke shrank from {prev} to {len} at frame {i}");
        }
        prev = len;
    }
    assert!(h.sink.saves > 0, "sequence never exercised a commit");
}

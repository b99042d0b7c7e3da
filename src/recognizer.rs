// The gesture recognizer seam.
//
// The capture loop hands frames to a `Recognizer` and never waits for an
// answer; results show up later in the shared `ObservationSlot`. A real
// landmark model plugs in behind the trait. `SimRecognizer` stands in for
// one: it runs on its own thread and turns mouse/keyboard state into
// observations with a synthetic 21-point hand.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::observation::ObservationSlot;
use crate::types::{FrameBuffer, GestureCategory, GestureObservation, Landmark, LANDMARK_COUNT};

/// Asynchronous gesture classifier.
pub trait Recognizer: Send {
    /// Queue `frame` for recognition. Must not block the caller.
    fn submit(&mut self, frame: &FrameBuffer, timestamp_ms: u64);
}

/// What the simulated hand is doing right now. Written by the UI thread.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimHand {
    /// Fingertip in normalized frame coordinates; `None` = no hand in view.
    pub pointer: Option<(f32, f32)>,
    pub category: GestureCategory,
    /// Fingertip depth; closeness score is `(1 - |depth|) * 100`.
    pub depth: f32,
}

impl Default for SimHand {
    fn default() -> Self {
        Self { pointer: None, category: GestureCategory::None, depth: 0.05 }
    }
}

pub type SharedSimHand = Arc<Mutex<SimHand>>;

/// Landmark offsets from the index tip for a hand pointing up.
const HAND_SHAPE: [(f32, f32); LANDMARK_COUNT] = [
    (0.00, 0.30),                                             // wrist
    (-0.05, 0.27), (-0.09, 0.23), (-0.11, 0.19), (-0.12, 0.16), // thumb
    (-0.02, 0.15), (-0.01, 0.10), (0.00, 0.05), (0.00, 0.00),   // index
    (0.02, 0.15), (0.03, 0.12), (0.03, 0.15), (0.02, 0.17),     // middle
    (0.05, 0.16), (0.06, 0.13), (0.06, 0.16), (0.05, 0.18),     // ring
    (0.08, 0.18), (0.09, 0.15), (0.09, 0.18), (0.08, 0.20),     // pinky
];

/// Build a plausible 21-point hand around `tip`.
pub fn synthetic_hand(tip: (f32, f32), depth: f32) -> [Landmark; LANDMARK_COUNT] {
    let mut out = [Landmark::default(); LANDMARK_COUNT];
    for (l, (dx, dy)) in out.iter_mut().zip(HAND_SHAPE) {
        *l = Landmark::new(tip.0 + dx, tip.1 + dy, depth);
    }
    out
}

/// Turn the current simulated input into an observation.
pub fn observe(hand: &SimHand, timestamp_ms: u64) -> GestureObservation {
    match hand.pointer {
        Some(tip) => GestureObservation::new(hand.category, Some(synthetic_hand(tip, hand.depth)), timestamp_ms),
        None => GestureObservation::new(GestureCategory::None, None, timestamp_ms),
    }
}

pub struct SimRecognizer {
    tx: Option<Sender<u64>>,
    worker: Option<JoinHandle<()>>,
}

impl SimRecognizer {
    /// Start the inference thread. `latency` mimics model run time.
    pub fn spawn(hand: SharedSimHand, slot: Arc<ObservationSlot>, latency: Duration) -> Self {
        // Tiny queue: if inference falls behind, new submissions are dropped.
        let (tx, rx) = bounded::<u64>(2);
        let worker = thread::Builder::new()
            .name("sim-recognizer".into())
            .spawn(move || {
                for timestamp_ms in rx {
                    if !latency.is_zero() {
                        thread::sleep(latency);
                    }
                    let snapshot = *hand.lock();
                    slot.publish(observe(&snapshot, timestamp_ms));
                    trace!(timestamp_ms, category = snapshot.category.as_str(), "observation published");
                }
                debug!("sim recognizer stopped");
            })
            .inspect_err(|e| warn!(error = %e, "sim recognizer thread did not start; no observations will be published"))
            .ok();
        Self { tx: Some(tx), worker }
    }
}

impl Recognizer for SimRecognizer {
    fn submit(&mut self, _frame: &FrameBuffer, timestamp_ms: u64) {
        let Some(tx) = &self.tx else { return };
        match tx.try_send(timestamp_ms) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => trace!(timestamp_ms, "recognizer busy, frame dropped"),
            Err(TrySendError::Disconnected(_)) => self.tx = None,
        }
    }
}

impl Drop for SimRecognizer {
    fn drop(&mut self) {
        // Closing the channel ends the worker's loop.
        self.tx.take();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

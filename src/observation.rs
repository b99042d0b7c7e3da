// Single-slot "latest wins" cell between the recognizer thread and the
// capture loop.
//
// The recognizer publishes whenever its inference completes; the loop reads
// whatever is newest when it renders. Only the newest observation matters,
// so this is a replace-in-place slot rather than a queue.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::GestureObservation;

#[derive(Default)]
pub struct ObservationSlot {
    latest: Mutex<Option<Arc<GestureObservation>>>,
}

impl ObservationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held observation. The lock covers a pointer swap only.
    pub fn publish(&self, observation: GestureObservation) {
        let next = Arc::new(observation);
        *self.latest.lock() = Some(next);
    }

    /// Most recently published observation, or `None` before the first result.
    pub fn latest(&self) -> Option<Arc<GestureObservation>> {
        self.latest.lock().clone()
    }

    /// Forget the held observation (used when a session restarts).
    pub fn clear(&self) {
        *self.latest.lock() = None;
    }
}

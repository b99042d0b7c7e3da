// Hand-off of rendered frames from the capture worker to the UI thread.
//
// A single-slot mailbox: if the UI has not picked up the previous frame,
// it is discarded in favour of the new one. There is never a backlog.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::types::FrameBuffer;

/// What the display sink receives.
#[derive(Clone, Debug, PartialEq)]
pub enum DisplayFrame {
    Frame(FrameBuffer),
    /// No active capture: clear the view.
    Empty,
}

#[derive(Clone)]
pub struct FrameMailbox {
    tx: Sender<DisplayFrame>,
    rx: Receiver<DisplayFrame>,
}

impl Default for FrameMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameMailbox {
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self { tx, rx }
    }

    /// Deliver `frame`, replacing any frame the consumer has not taken yet.
    pub fn present(&self, frame: DisplayFrame) {
        let mut pending = frame;
        loop {
            match self.tx.try_send(pending) {
                Ok(()) => return,
                Err(TrySendError::Full(back)) => {
                    // Drop the stale one; the consumer may have raced us to it.
                    let _ = self.rx.try_recv();
                    pending = back;
                }
                // Both ends live in `self`, so this cannot happen.
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    /// Wait up to `timeout` for the next frame.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<DisplayFrame> {
        match self.rx.recv_timeout(timeout) {
            Ok(f) => Some(f),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Take the pending frame, if any, without waiting.
    pub fn try_latest(&self) -> Option<DisplayFrame> {
        self.rx.try_recv().ok()
    }
}

// airsign: draw a signature in the air.
//
// A camera loop follows the index fingertip reported by a hand-landmark
// recognizer. Pointing up at a valid distance draws, thumbs-down clears,
// and a held thumbs-up saves the stroke as a transparent PNG.
//
// The recognizer publishes asynchronously into `observation::ObservationSlot`.
// The capture worker in `session` reads the newest observation every frame,
// runs the state machines, renders the overlay and hands the frame to the
// window through the drop-to-latest `display::FrameMailbox`.

pub mod camera;
pub mod cli;
pub mod config;
pub mod confirm;
pub mod display;
pub mod distance;
pub mod draw;
pub mod drawing;
pub mod error;
pub mod observation;
pub mod overlay;
pub mod pacing;
pub mod persist;
pub mod recognizer;
pub mod session;
pub mod types;

pub use error::{Error, Result};

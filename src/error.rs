// One error type for the whole crate.
// Every variant states *where* things went wrong.
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Window init error: {0}")]
    WindowInit(String), // Creating the window failed
    #[error("Window update error: {0}")]
    WindowUpdate(String), // Updating the window buffer failed
    #[error("Camera init error: {0}")]
    CameraInit(String), // Every device in the fallback chain refused to open
    #[error("Camera frame error: {0}")]
    CameraFrame(String), // Grabbing/decoding a frame failed (transient)
    #[error("Could not save signature to {path}: {reason}")]
    Persist { path: PathBuf, reason: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Capture worker error: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, Error>;

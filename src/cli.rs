use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{
    CaptureSettings, Thresholds, DEFAULT_MAX_DISTANCE, DEFAULT_MIN_DISTANCE,
    DEFAULT_MIN_SIGNATURE_POINTS,
};

/// Command line configuration for the signature capture window.
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about,
    long_about = "Draw a signature in the air: point your index finger up to draw, \
                  thumbs-down to clear, hold a thumbs-up to save it as a transparent PNG."
)]
pub struct AppArgs {
    /// Camera device index.
    #[arg(long, default_value_t = 0)]
    pub camera: u32,
    /// Frame rate cap; above 30 fps only every Nth frame goes to the recognizer.
    #[arg(long, default_value_t = 30)]
    pub fps_cap: u32,
    /// Requested capture resolution, e.g. 1280x720.
    #[arg(long, default_value = "640x480", value_parser = parse_resolution)]
    pub resolution: (u32, u32),
    /// Draw the hand skeleton, FPS and closeness score.
    #[arg(long, default_value_t = false)]
    pub developer_mode: bool,
    /// Closeness scores below this are "too close" (0-100).
    #[arg(long, default_value_t = DEFAULT_MIN_DISTANCE)]
    pub min_distance: f32,
    /// Closeness scores above this are "too far" (0-100).
    #[arg(long, default_value_t = DEFAULT_MAX_DISTANCE)]
    pub max_distance: f32,
    /// Points a signature needs before it may be saved.
    #[arg(long, default_value_t = DEFAULT_MIN_SIGNATURE_POINTS)]
    pub min_points: usize,
    /// Seconds the thumbs-up must be held to save.
    #[arg(long, default_value_t = 3.0)]
    pub confirm_secs: f32,
    /// Directory saved signatures are written to.
    #[arg(long, default_value = "signatures")]
    pub output_dir: PathBuf,
    /// Simulated recognizer latency in milliseconds.
    #[arg(long, default_value_t = 15)]
    pub recognizer_latency_ms: u64,
    /// Enable debug logging.
    #[arg(short, long)]
    pub debug: bool,
}

impl AppArgs {
    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            camera_index: self.camera,
            fps_cap: self.fps_cap,
            resolution: self.resolution,
        }
    }

    /// Thresholds as given; validation happens when they are installed.
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            min_distance: self.min_distance,
            max_distance: self.max_distance,
            min_points: self.min_points,
            confirm_duration: Duration::try_from_secs_f32(self.confirm_secs).unwrap_or(Duration::ZERO),
        }
    }
}

fn parse_resolution(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("bad width {w:?}: {e}"))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("bad height {h:?}: {e}"))?;
    if w == 0 || h == 0 {
        return Err("resolution must be non-zero".into());
    }
    Ok((w, h))
}

// Writing a committed signature to disk.
//
// The canvas is black wherever nothing was drawn. The saved PNG keeps the
// stroke colors and derives alpha from luminance: pixels brighter than
// `ALPHA_LUMA_THRESHOLD` are opaque, everything else transparent.

use std::path::PathBuf;

use chrono::Local;
use image::{Rgba, RgbaImage};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::types::FrameBuffer;

/// Luma (0..255) above which a canvas pixel counts as ink.
pub const ALPHA_LUMA_THRESHOLD: u8 = 10;

/// Where committed signatures go.
pub trait SignatureSink: Send {
    /// Persist `canvas`, returning the path written.
    fn persist(&mut self, canvas: &FrameBuffer) -> Result<PathBuf>;
}

/// Rec.601 luma of a 0x00RRGGBB pixel.
#[inline]
fn luma(px: u32) -> u8 {
    let r = ((px >> 16) & 0xFF) as f32;
    let g = ((px >> 8) & 0xFF) as f32;
    let b = (px & 0xFF) as f32;
    (0.299 * r + 0.587 * g + 0.114 * b).round().clamp(0.0, 255.0) as u8
}

/// Convert the canvas to RGBA with the luminance-derived alpha channel.
pub fn signature_rgba(canvas: &FrameBuffer) -> RgbaImage {
    let mut img = RgbaImage::new(canvas.width as u32, canvas.height as u32);
    for (x, y, out) in img.enumerate_pixels_mut() {
        let px = canvas.pixels[y as usize * canvas.width + x as usize];
        let alpha = if luma(px) > ALPHA_LUMA_THRESHOLD { 255 } else { 0 };
        *out = Rgba([
            ((px >> 16) & 0xFF) as u8,
            ((px >> 8) & 0xFF) as u8,
            (px & 0xFF) as u8,
            alpha,
        ]);
    }
    img
}

/// Saves `signature_YYYYMMDD_HHMMSS.png` files into a directory.
pub struct PngSignatureStore {
    dir: PathBuf,
}

impl PngSignatureStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Timestamped path that does not exist yet; a suffix breaks same-second ties.
    fn next_path(&self) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let first = self.dir.join(format!("signature_{stamp}.png"));
        if !first.exists() {
            return first;
        }
        (1u32..)
            .map(|n| self.dir.join(format!("signature_{stamp}_{n}.png")))
            .find(|p| !p.exists())
            .unwrap_or(first)
    }
}

impl SignatureSink for PngSignatureStore {
    fn persist(&mut self, canvas: &FrameBuffer) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Error::Persist {
            path: self.dir.clone(),
            reason: e.to_string(),
        })?;

        let path = self.next_path();
        signature_rgba(canvas).save(&path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "signature write failed");
            Error::Persist { path: path.clone(), reason: e.to_string() }
        })?;

        info!(path = %path.display(), "signature saved");
        Ok(path)
    }
}

// Tunable thresholds and capture settings.
//
// Thresholds live in `SharedSettings` so a controller (window key handler,
// future settings panel) can change them while the capture worker runs. Each
// value is an independent atomic; the worker takes one `Thresholds`
// snapshot per frame. Every setter validates before storing, so a rejected
// update leaves the previous values in place.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{Error, Result};

pub const DEFAULT_MIN_DISTANCE: f32 = 90.0;
pub const DEFAULT_MAX_DISTANCE: f32 = 99.5;
pub const DEFAULT_MIN_SIGNATURE_POINTS: usize = 200;
pub const DEFAULT_CONFIRM_DURATION: Duration = Duration::from_secs(3);

pub const DEFAULT_FPS_CAP: u32 = 30;
pub const DEFAULT_RESOLUTION: (u32, u32) = (640, 480);

/// Per-frame view of the gating thresholds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    /// Closeness scores below this are "too close" (score units, 0..=100).
    pub min_distance: f32,
    /// Closeness scores above this are "too far" (score units, 0..=100).
    pub max_distance: f32,
    /// Stroke length required before a hold may commit.
    pub min_points: usize,
    /// How long ThumbUp must be held to commit.
    pub confirm_duration: Duration,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_distance: DEFAULT_MIN_DISTANCE,
            max_distance: DEFAULT_MAX_DISTANCE,
            min_points: DEFAULT_MIN_SIGNATURE_POINTS,
            confirm_duration: DEFAULT_CONFIRM_DURATION,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<()> {
        validate_distance_bounds(self.min_distance, self.max_distance)?;
        validate_min_points(self.min_points)?;
        validate_confirm_duration(self.confirm_duration)
    }
}

fn validate_distance_bounds(min: f32, max: f32) -> Result<()> {
    if !min.is_finite() || !max.is_finite() {
        return Err(Error::InvalidConfig("distance bounds must be finite".into()));
    }
    if !(0.0..=100.0).contains(&min) || !(0.0..=100.0).contains(&max) {
        return Err(Error::InvalidConfig(format!(
            "distance bounds must lie in 0..=100 (got {min}..{max})"
        )));
    }
    if min >= max {
        return Err(Error::InvalidConfig(format!(
            "min_distance ({min}) must be below max_distance ({max})"
        )));
    }
    Ok(())
}

fn validate_min_points(points: usize) -> Result<()> {
    if points == 0 {
        return Err(Error::InvalidConfig("min_signature_points must be at least 1".into()));
    }
    Ok(())
}

fn validate_confirm_duration(duration: Duration) -> Result<()> {
    // Stored with millisecond resolution; anything shorter would read back as 0.
    if duration < Duration::from_millis(1) {
        return Err(Error::InvalidConfig(format!(
            "confirm_duration must be at least 1 ms (got {duration:?})"
        )));
    }
    Ok(())
}

fn confirm_millis(duration: Duration) -> u64 {
    (duration.as_millis() as u64).max(1)
}

/// Live thresholds + developer mode, shared between controller and worker.
pub struct SharedSettings {
    min_distance: AtomicU32, // f32 bits
    max_distance: AtomicU32, // f32 bits
    min_points: AtomicUsize,
    confirm_ms: AtomicU64,
    developer_mode: AtomicBool,
}

impl Default for SharedSettings {
    fn default() -> Self {
        Self::new(Thresholds::default(), false)
    }
}

impl SharedSettings {
    /// Build from already-validated thresholds. Use [`SharedSettings::try_new`]
    /// for values coming from the outside.
    pub fn new(thresholds: Thresholds, developer_mode: bool) -> Self {
        Self {
            min_distance: AtomicU32::new(thresholds.min_distance.to_bits()),
            max_distance: AtomicU32::new(thresholds.max_distance.to_bits()),
            min_points: AtomicUsize::new(thresholds.min_points),
            confirm_ms: AtomicU64::new(confirm_millis(thresholds.confirm_duration)),
            developer_mode: AtomicBool::new(developer_mode),
        }
    }

    pub fn try_new(thresholds: Thresholds, developer_mode: bool) -> Result<Self> {
        thresholds.validate()?;
        Ok(Self::new(thresholds, developer_mode))
    }

    /// One consistent-enough read per frame; each field is independent.
    pub fn snapshot(&self) -> Thresholds {
        Thresholds {
            min_distance: f32::from_bits(self.min_distance.load(Ordering::Relaxed)),
            max_distance: f32::from_bits(self.max_distance.load(Ordering::Relaxed)),
            min_points: self.min_points.load(Ordering::Relaxed),
            confirm_duration: Duration::from_millis(self.confirm_ms.load(Ordering::Relaxed)),
        }
    }

    pub fn set_distance_bounds(&self, min: f32, max: f32) -> Result<()> {
        validate_distance_bounds(min, max).inspect_err(|e| warn!("rejected distance bounds: {e}"))?;
        self.min_distance.store(min.to_bits(), Ordering::Relaxed);
        self.max_distance.store(max.to_bits(), Ordering::Relaxed);
        info!(min, max, "distance bounds updated");
        Ok(())
    }

    pub fn set_min_distance(&self, min: f32) -> Result<()> {
        let max = self.snapshot().max_distance;
        self.set_distance_bounds(min, max)
    }

    pub fn set_max_distance(&self, max: f32) -> Result<()> {
        let min = self.snapshot().min_distance;
        self.set_distance_bounds(min, max)
    }

    pub fn set_min_points(&self, points: usize) -> Result<()> {
        validate_min_points(points).inspect_err(|e| warn!("rejected min points: {e}"))?;
        self.min_points.store(points, Ordering::Relaxed);
        info!(points, "minimum signature points updated");
        Ok(())
    }

    pub fn set_confirm_duration(&self, duration: Duration) -> Result<()> {
        validate_confirm_duration(duration)
            .inspect_err(|e| warn!("rejected confirm duration: {e}"))?;
        self.confirm_ms.store(confirm_millis(duration), Ordering::Relaxed);
        info!(?duration, "confirm duration updated");
        Ok(())
    }

    pub fn developer_mode(&self) -> bool {
        self.developer_mode.load(Ordering::Relaxed)
    }

    /// Flip developer mode and return the new value.
    pub fn toggle_developer_mode(&self) -> bool {
        !self.developer_mode.fetch_xor(true, Ordering::Relaxed)
    }

    pub fn reset_defaults(&self) {
        let d = Thresholds::default();
        self.min_distance.store(d.min_distance.to_bits(), Ordering::Relaxed);
        self.max_distance.store(d.max_distance.to_bits(), Ordering::Relaxed);
        self.min_points.store(d.min_points, Ordering::Relaxed);
        self.confirm_ms.store(confirm_millis(d.confirm_duration), Ordering::Relaxed);
        self.developer_mode.store(false, Ordering::Relaxed);
        info!("settings reset to defaults");
    }
}

/// Settings that need a camera restart to take effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureSettings {
    pub camera_index: u32,
    pub fps_cap: u32,
    pub resolution: (u32, u32),
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self { camera_index: 0, fps_cap: DEFAULT_FPS_CAP, resolution: DEFAULT_RESOLUTION }
    }
}

impl CaptureSettings {
    pub fn validate(&self) -> Result<()> {
        if self.fps_cap == 0 {
            return Err(Error::InvalidConfig("fps_cap must be at least 1".into()));
        }
        if self.resolution.0 == 0 || self.resolution.1 == 0 {
            return Err(Error::InvalidConfig(format!(
                "resolution must be non-zero (got {}x{})",
                self.resolution.0, self.resolution.1
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Thresholds::default().validate().is_ok());
        assert!(CaptureSettings::default().validate().is_ok());
    }

    #[test]
    fn min_at_or_above_max_is_rejected_and_previous_kept() {
        let settings = SharedSettings::default();
        assert!(settings.set_distance_bounds(95.0, 95.0).is_err());
        assert!(settings.set_min_distance(99.8).is_err());
        assert!(settings.set_max_distance(80.0).is_err());
        let snap = settings.snapshot();
        assert_eq!(snap.min_distance, DEFAULT_MIN_DISTANCE);
        assert_eq!(snap.max_distance, DEFAULT_MAX_DISTANCE);
    }

    #[test]
    fn out_of_range_and_nan_bounds_are_rejected() {
        let settings = SharedSettings::default();
        assert!(settings.set_distance_bounds(-1.0, 50.0).is_err());
        assert!(settings.set_distance_bounds(10.0, 120.0).is_err());
        assert!(settings.set_distance_bounds(f32::NAN, 50.0).is_err());
    }

    #[test]
    fn valid_updates_show_up_in_the_next_snapshot() {
        let settings = SharedSettings::default();
        settings.set_distance_bounds(85.0, 98.0).unwrap();
        settings.set_min_points(50).unwrap();
        settings.set_confirm_duration(Duration::from_millis(1500)).unwrap();
        let snap = settings.snapshot();
        assert_eq!(snap.min_distance, 85.0);
        assert_eq!(snap.max_distance, 98.0);
        assert_eq!(snap.min_points, 50);
        assert_eq!(snap.confirm_duration, Duration::from_millis(1500));
    }

    #[test]
    fn zero_points_and_zero_duration_are_rejected() {
        let settings = SharedSettings::default();
        assert!(settings.set_min_points(0).is_err());
        assert!(settings.set_confirm_duration(Duration::ZERO).is_err());
        let snap = settings.snapshot();
        assert_eq!(snap.min_points, DEFAULT_MIN_SIGNATURE_POINTS);
        assert_eq!(snap.confirm_duration, DEFAULT_CONFIRM_DURATION);
    }

    #[test]
    fn sub_millisecond_confirm_is_rejected() {
        let settings = SharedSettings::default();
        assert!(settings.set_confirm_duration(Duration::from_micros(500)).is_err());
        assert_eq!(settings.snapshot().confirm_duration, DEFAULT_CONFIRM_DURATION);

        let short = Thresholds { confirm_duration: Duration::from_micros(500), ..Thresholds::default() };
        assert!(SharedSettings::try_new(short, false).is_err());
    }

    #[test]
    fn stored_confirm_duration_never_reads_back_as_zero() {
        // `new` trusts its input; the stored value is still clamped
        let short = Thresholds { confirm_duration: Duration::from_micros(500), ..Thresholds::default() };
        let settings = SharedSettings::new(short, false);
        assert_eq!(settings.snapshot().confirm_duration, Duration::from_millis(1));
    }

    #[test]
    fn toggle_and_reset_developer_mode() {
        let settings = SharedSettings::default();
        assert!(settings.toggle_developer_mode());
        assert!(settings.developer_mode());
        settings.set_min_points(10).unwrap();
        settings.reset_defaults();
        assert!(!settings.developer_mode());
        assert_eq!(settings.snapshot(), Thresholds::default());
    }

    #[test]
    fn try_new_rejects_inverted_bounds() {
        let bad = Thresholds { min_distance: 99.0, max_distance: 90.0, ..Thresholds::default() };
        assert!(SharedSettings::try_new(bad, false).is_err());
    }

    #[test]
    fn capture_settings_reject_zero_fps_and_size() {
        let s = CaptureSettings { fps_cap: 0, ..CaptureSettings::default() };
        assert!(s.validate().is_err());
        let s = CaptureSettings { resolution: (0, 480), ..CaptureSettings::default() };
        assert!(s.validate().is_err());
    }
}

// Core types shared by the capture loop, the state machines and the overlay.

/// Index of the index-finger tip in the 21-point hand model.
pub const INDEX_FINGER_TIP: usize = 8;

/// Number of landmarks the recognizer publishes for one hand.
pub const LANDMARK_COUNT: usize = 21;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: usize,      // how wide the frame is on screen (pixels)
    pub height: usize,     // how tall the frame is on screen (pixels)
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    /// All-black buffer of the given size.
    pub fn blank(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![0u32; width * height] }
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|&p| p == 0)
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    /// Reset every pixel to 0 without reallocating.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }
}

/// One recorded fingertip position in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Point2D {
    pub x: i32,
    pub y: i32,
}

impl Point2D {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A hand landmark in normalized image coordinates.
/// `x`/`y` are in [0,1] across the frame; `z` is depth relative to the wrist.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Scale to pixel coordinates of a `width` x `height` frame.
    pub fn to_pixel(&self, width: usize, height: usize) -> Point2D {
        Point2D::new(
            (self.x * width as f32) as i32,
            (self.y * height as f32) as i32,
        )
    }
}

/// The gestures the pipeline reacts to. Anything else the classifier knows
/// about collapses into `Other`; `None` means a hand without a gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GestureCategory {
    PointingUp,
    ThumbUp,
    ThumbDown,
    Other,
    None,
}

impl GestureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PointingUp => "pointing-up",
            Self::ThumbUp => "thumb-up",
            Self::ThumbDown => "thumb-down",
            Self::Other => "other",
            Self::None => "none",
        }
    }
}

/// One published recognition result. Superseded, never merged.
#[derive(Clone, Debug, PartialEq)]
pub struct GestureObservation {
    pub category: GestureCategory,
    pub landmarks: Option<[Landmark; LANDMARK_COUNT]>,
    pub timestamp_ms: u64,
}

impl GestureObservation {
    pub fn new(
        category: GestureCategory,
        landmarks: Option<[Landmark; LANDMARK_COUNT]>,
        timestamp_ms: u64,
    ) -> Self {
        Self { category, landmarks, timestamp_ms }
    }

    pub fn index_tip(&self) -> Option<Landmark> {
        self.landmarks.as_ref().map(|l| l[INDEX_FINGER_TIP])
    }
}

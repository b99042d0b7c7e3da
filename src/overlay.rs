// Per-frame overlay: everything painted over the live camera image.
// Fixed order, bottom to top:
//   developer skeleton -> progress bar / hints -> "saved" banner ->
//   distance warning -> fingertip cursor + dev readouts -> stroke canvas (additive).

use crate::confirm::GateDecision;
use crate::distance::DistanceWarning;
use crate::draw::{
    draw_text_centered, draw_text_scaled, draw_thick_line, fill_circle, fill_rect, stroke_rect,
    text_height, text_width,
};
use crate::types::{FrameBuffer, GestureCategory, GestureObservation, Point2D};

pub const RED: u32 = 0x00_FF_00_00;
pub const GREEN: u32 = 0x00_00_FF_00;
pub const BLUE: u32 = 0x00_00_00_FF;
pub const WHITE: u32 = 0x00_FF_FF_FF;
pub const YELLOW: u32 = 0x00_FF_FF_00;
pub const BLACK: u32 = 0x00_00_00_00;

/// Bone list of the 21-point hand model.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (0, 17), (17, 18), (18, 19), (19, 20),
];

/// Everything the overlay needs to know about this frame.
pub struct OverlayInput<'a> {
    pub observation: Option<&'a GestureObservation>,
    pub developer_mode: bool,
    pub category: GestureCategory,
    pub drawing_active: bool,
    pub fingertip: Option<Point2D>,
    pub point_count: usize,
    pub min_points: usize,
    pub gate: GateDecision,
    pub saved_banner: bool,
    pub distance_warning: Option<DistanceWarning>,
    pub fps: f32,
    pub closeness: Option<f32>,
}

pub struct OverlayRenderer {
    pub bar_width: i32,
    pub bar_height: i32,
    pub bar_bottom_margin: i32,
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self { bar_width: 300, bar_height: 20, bar_bottom_margin: 50 }
    }
}

impl OverlayRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paint all overlays into `frame`, then add `canvas` on top.
    pub fn render(&self, frame: &mut FrameBuffer, canvas: &FrameBuffer, input: &OverlayInput<'_>) {
        if input.developer_mode {
            if let Some(obs) = input.observation {
                draw_skeleton(frame, obs);
            }
        }

        self.draw_progress(frame, input);

        if input.saved_banner {
            let y = frame.height as i32 / 2 - text_height(3) / 2;
            draw_text_centered(frame, y, "Signature Saved!", GREEN, 3);
        }

        if let Some(warning) = input.distance_warning {
            draw_warning(frame, warning.message());
        }

        if input.drawing_active {
            if let Some(tip) = input.fingertip {
                fill_circle(frame, tip.x, tip.y, 5, BLUE);
            }
        }

        if input.developer_mode {
            draw_text_scaled(frame, 10, 10, &format!("FPS: {:.0}", input.fps), GREEN, 2);
            if let Some(score) = input.closeness {
                draw_text_scaled(frame, 10, 30, &format!("DIST: {score:.1}"), GREEN, 2);
            }
        }

        composite_additive(frame, canvas);
    }

    fn draw_progress(&self, frame: &mut FrameBuffer, input: &OverlayInput<'_>) {
        let enough = input.point_count >= input.min_points;
        match input.gate {
            GateDecision::Holding { progress } if enough => {
                let pct = (progress.clamp(0.0, 1.0) * 100.0) as u32;
                self.draw_bar(frame, pct, YELLOW, &format!("Saving {pct}%"));
                return;
            }
            GateDecision::NeedMorePoints { missing } => {
                let y = frame.height as i32 - 80 - text_height(2);
                draw_text_centered(frame, y, &format!("Not enough points! Need {missing} more"), YELLOW, 2);
                return;
            }
            _ => {}
        }

        let holding_short = matches!(input.gate, GateDecision::Holding { .. });
        if input.drawing_active || input.category == GestureCategory::PointingUp || holding_short {
            let pct = stroke_percent(input.point_count, input.min_points);
            let color = if pct >= 100 { GREEN } else { BLUE };
            self.draw_bar(frame, pct, color, &format!("{pct}% / {} points", input.min_points));
        }
    }

    fn draw_bar(&self, frame: &mut FrameBuffer, pct: u32, fill: u32, label: &str) {
        let w = frame.width as i32;
        let h = frame.height as i32;
        let bar_w = self.bar_width.min(w - 20).max(1);
        let x0 = (w - bar_w) / 2;
        let y0 = h - self.bar_bottom_margin;
        let filled = bar_w * pct.min(100) as i32 / 100;

        fill_rect(frame, x0, y0, x0 + filled, y0 + self.bar_height, fill);
        stroke_rect(frame, x0, y0, x0 + bar_w, y0 + self.bar_height, 2, WHITE);
        draw_text_centered(frame, y0 - 10 - text_height(2), label, WHITE, 2);
    }
}

/// Stroke completion toward `min_points`, capped at 100.
pub fn stroke_percent(points: usize, min_points: usize) -> u32 {
    if min_points == 0 {
        return 100;
    }
    ((points * 100 / min_points).min(100)) as u32
}

fn draw_skeleton(frame: &mut FrameBuffer, obs: &GestureObservation) {
    let Some(landmarks) = obs.landmarks.as_ref() else { return };
    let px: Vec<Point2D> = landmarks.iter().map(|l| l.to_pixel(frame.width, frame.height)).collect();
    for &(a, b) in HAND_CONNECTIONS.iter() {
        draw_thick_line(frame, px[a].x, px[a].y, px[b].x, px[b].y, 2, WHITE);
    }
    for p in &px {
        fill_circle(frame, p.x, p.y, 5, RED);
    }
}

fn draw_warning(frame: &mut FrameBuffer, message: &str) {
    let scale = 2;
    let pad = 10;
    let tw = text_width(message, scale);
    let th = text_height(scale);
    let x = (frame.width as i32 - tw) / 2;
    let y = frame.height as i32 / 4 - th;
    fill_rect(frame, x - pad, y - pad, x + tw + pad, y + th + pad, BLACK);
    draw_text_scaled(frame, x, y, message, YELLOW, scale);
}

/// Add `canvas` onto `frame` per channel, saturating at 255.
/// Black canvas pixels leave the live image untouched.
pub fn composite_additive(frame: &mut FrameBuffer, canvas: &FrameBuffer) {
    let w = frame.width.min(canvas.width);
    let h = frame.height.min(canvas.height);
    for y in 0..h {
        let frow = y * frame.width;
        let crow = y * canvas.width;
        for x in 0..w {
            let add = canvas.pixels[crow + x];
            if add == 0 { continue; }
            let old = frame.pixels[frow + x];
            frame.pixels[frow + x] = add_rgb_saturating(old, add);
        }
    }
}

#[inline]
fn add_rgb_saturating(a: u32, b: u32) -> u32 {
    let r = (((a >> 16) & 0xFF) + ((b >> 16) & 0xFF)).min(255);
    let g = (((a >> 8) & 0xFF) + ((b >> 8) & 0xFF)).min(255);
    let bl = ((a & 0xFF) + (b & 0xFF)).min(255);
    (r << 16) | (g << 8) | bl
}

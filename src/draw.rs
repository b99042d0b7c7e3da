// Window + software drawing utilities.
// Provided here:
// 1) A window that shows the rendered capture frames (or black when idle).
// 2) Pixel, line, rectangle and disc primitives used by the canvas and overlay.
// 3) A tiny 5x7 bitmap font (scalable) for banners and the HUD.

use crate::error::Error;
use crate::types::FrameBuffer;
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

pub struct Drawer {
    window: Window, // the on-screen window you see
    width: usize,
    height: usize,
    blank: Vec<u32>, // shown while no capture is running
}

impl Drawer {
    /// Create a window of the requested size.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let mut window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        // The capture worker paces itself; the window just needs to stay responsive.
        window.set_target_fps(120);
        Ok(Self { window, width, height, blank: vec![0u32; width * height] })
    }

    /// Push the pixels for this frame to the screen.
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))?;
        Ok(())
    }

    /// Show a black window: the "no active capture" state.
    pub fn present_blank(&mut self) -> Result<(), Error> {
        self.window
            .update_with_buffer(&self.blank, self.width, self.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))?;
        Ok(())
    }

    /// Pump window events without changing the picture.
    pub fn pump(&mut self) {
        self.window.update();
    }

    /// Returns false when the user closes the window (so we can stop the loop).
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    /// True while ESC is held down (we'll exit when this is pressed).
    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.window.is_key_down(key)
    }

    pub fn key_pressed_once(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::No)
    }

    /// True while the left mouse button is held.
    pub fn left_mouse_down(&self) -> bool {
        self.window.get_mouse_down(MouseButton::Left)
    }

    /// Mouse position normalized to [0,1] across the window, if inside it.
    pub fn mouse_pos_normalized(&self) -> Option<(f32, f32)> {
        self.window
            .get_mouse_pos(MouseMode::Discard)
            .map(|(x, y)| (x / self.width as f32, y / self.height as f32))
    }
}

/* ---------- Software drawing: pixels, lines, shapes ---------- */

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
#[inline]
pub fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

/// Draw a thin line between (x0,y0) and (x1,y1) using Bresenham.
pub fn draw_line(fb: &mut FrameBuffer, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
    for_each_line_point(x0, y0, x1, y1, |x, y| put_pixel(fb, x, y, color));
}

/// Line of roughly `thickness` pixels: a disc stamped at every Bresenham step.
pub fn draw_thick_line(
    fb: &mut FrameBuffer,
    x0: i32, y0: i32,
    x1: i32, y1: i32,
    thickness: i32,
    color: u32,
) {
    let r = (thickness / 2).max(0);
    if r == 0 {
        draw_line(fb, x0, y0, x1, y1, color);
        return;
    }
    for_each_line_point(x0, y0, x1, y1, |x, y| fill_circle(fb, x, y, r, color));
}

fn for_each_line_point(x0: i32, y0: i32, x1: i32, y1: i32, mut plot: impl FnMut(i32, i32)) {
    let (mut x0, mut y0) = (x0, y0);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        plot(x0, y0);
        if x0 == x1 && y0 == y1 { break; }
        let e2 = 2 * err;
        if e2 >= dy { err += dy; x0 += sx; }
        if e2 <= dx { err += dx; y0 += sy; }
    }
}

/// Solid disc centered at (cx,cy).
pub fn fill_circle(fb: &mut FrameBuffer, cx: i32, cy: i32, radius: i32, color: u32) {
    let r2 = radius * radius;
    for y in -radius..=radius {
        for x in -radius..=radius {
            if x * x + y * y <= r2 {
                put_pixel(fb, cx + x, cy + y, color);
            }
        }
    }
}

/// Solid rectangle covering [x0,x1) x [y0,y1), clipped to the buffer.
pub fn fill_rect(fb: &mut FrameBuffer, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
    let x0 = x0.max(0);
    let y0 = y0.max(0);
    let x1 = x1.min(fb.width as i32);
    let y1 = y1.min(fb.height as i32);
    for y in y0..y1 {
        let row = y as usize * fb.width;
        for x in x0..x1 {
            fb.pixels[row + x as usize] = color;
        }
    }
}

/// Rectangle outline `thickness` pixels wide, drawn inside [x0,x1) x [y0,y1).
pub fn stroke_rect(
    fb: &mut FrameBuffer,
    x0: i32, y0: i32,
    x1: i32, y1: i32,
    thickness: i32,
    color: u32,
) {
    fill_rect(fb, x0, y0, x1, y0 + thickness, color);
    fill_rect(fb, x0, y1 - thickness, x1, y1, color);
    fill_rect(fb, x0, y0, x0 + thickness, y1, color);
    fill_rect(fb, x1 - thickness, y0, x1, y1, color);
}

/* ---------- 5x7 bitmap font ---------- */

/// Return a 5x7 glyph bitmap. Lowercase letters render as uppercase.
/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    // Helper macro to define a glyph quickly
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch.to_ascii_uppercase() {
        // Digits 0..9
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'J' => g!(0b00111,0b00010,0b00010,0b00010,0b00010,0b10010,0b01100),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b10001,0b11001,0b10101,0b10011,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'Q' => g!(0b01110,0b10001,0b10001,0b10001,0b10101,0b10010,0b01101),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),
        'X' => g!(0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001),
        'Y' => g!(0b10001,0b10001,0b01010,0b00100,0b00100,0b00100,0b00100),
        'Z' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b10000,0b11111),

        // Punctuation
        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),
        ',' => g!(0b00000,0b00000,0b00000,0b00000,0b00110,0b00100,0b01000),
        '!' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00000,0b00100),
        '%' => g!(0b11000,0b11001,0b00010,0b00100,0b01000,0b10011,0b00011),
        '/' => g!(0b00000,0b00001,0b00010,0b00100,0b01000,0b10000,0b00000),
        '-' => g!(0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000),

        _ => None,
    }
}

/// Width in pixels of `text` rendered at `scale`.
pub fn text_width(text: &str, scale: i32) -> i32 {
    let n = text.chars().count() as i32;
    if n == 0 { 0 } else { (n * 6 - 1) * scale }
}

/// Height in pixels of one text line at `scale`.
pub fn text_height(scale: i32) -> i32 {
    7 * scale
}

/// Draw a single 5x7 character at (x,y), each font pixel a `scale` square.
/// A black shadow offset by one font pixel keeps it readable on video.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, ch: char, color: u32, scale: i32) {
    let Some(rows) = glyph5x7(ch) else { return };
    for (pass_color, offset) in [(0x00000000, scale.max(1)), (color, 0)] {
        for (ry, rowbits) in rows.iter().enumerate() {
            for rx in 0..5 {
                if (rowbits & (1 << (4 - rx))) != 0 {
                    let px = x + rx * scale + offset;
                    let py = y + ry as i32 * scale + offset;
                    fill_rect(fb, px, py, px + scale, py + scale, pass_color);
                }
            }
        }
    }
}

/// Draw a text string using 5x7 glyphs at 1x.
pub fn draw_text_5x7(fb: &mut FrameBuffer, x: i32, y: i32, text: &str, color: u32) {
    draw_text_scaled(fb, x, y, text, color, 1);
}

/// Draw a text string using 5x7 glyphs, each glyph pixel `scale` pixels wide.
pub fn draw_text_scaled(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32, scale: i32) {
    let scale = scale.max(1);
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch, color, scale);
        x += 6 * scale; // 5 pixels glyph width + 1 pixel spacing
    }
}

/// Draw `text` horizontally centered with its top edge at `y`.
pub fn draw_text_centered(fb: &mut FrameBuffer, y: i32, text: &str, color: u32, scale: i32) {
    let x = (fb.width as i32 - text_width(text, scale)) / 2;
    draw_text_scaled(fb, x, y, text, color, scale);
}

// Stroke accumulation driven by the per-frame gesture.
//
// The machine owns the stroke and the canvas it is rasterized into. Only two
// phases exist: `Idle` (no known last point, the chain is broken) and
// `Drawing` (the previous frame recorded a point). Pausing is just `Idle`
// with a non-empty stroke; pointing again resumes without a connecting line.

use tracing::debug;

use crate::draw::draw_thick_line;
use crate::types::{FrameBuffer, GestureCategory, Point2D};

pub const STROKE_COLOR: u32 = 0x00_00_FF_00; // green
pub const STROKE_THICKNESS: i32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawingPhase {
    Idle,
    Drawing { last: Point2D },
}

/// What a single frame did to the stroke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrokeUpdate {
    /// A point was appended; `segment` tells whether a line joined it to the previous one.
    Appended { point: Point2D, segment: bool },
    /// Continuity lost; stroke kept.
    ChainBreak,
    /// Everything wiped.
    Cleared,
}

pub struct DrawingStateMachine {
    phase: DrawingPhase,
    stroke: Vec<Point2D>,
    canvas: FrameBuffer,
}

impl DrawingStateMachine {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            phase: DrawingPhase::Idle,
            stroke: Vec::new(),
            canvas: FrameBuffer::blank(width, height),
        }
    }

    /// Advance one frame. `fingertip` is the index tip in canvas pixels.
    pub fn apply(
        &mut self,
        category: GestureCategory,
        distance_valid: bool,
        fingertip: Option<Point2D>,
    ) -> StrokeUpdate {
        match (category, distance_valid, fingertip) {
            (GestureCategory::ThumbDown, _, _) => {
                self.clear();
                StrokeUpdate::Cleared
            }
            (GestureCategory::PointingUp, true, Some(point)) => {
                let segment = match self.phase {
                    DrawingPhase::Drawing { last } => {
                        draw_thick_line(
                            &mut self.canvas,
                            last.x, last.y,
                            point.x, point.y,
                            STROKE_THICKNESS,
                            STROKE_COLOR,
                        );
                        true
                    }
                    DrawingPhase::Idle => false,
                };
                self.stroke.push(point);
                self.phase = DrawingPhase::Drawing { last: point };
                StrokeUpdate::Appended { point, segment }
            }
            _ => {
                self.phase = DrawingPhase::Idle;
                StrokeUpdate::ChainBreak
            }
        }
    }

    /// Wipe stroke, canvas and last point.
    pub fn clear(&mut self) {
        if !self.stroke.is_empty() {
            debug!(points = self.stroke.len(), "signature cleared");
        }
        self.stroke.clear();
        self.canvas.clear();
        self.phase = DrawingPhase::Idle;
    }

    /// Recreate the canvas for a new capture size. Drops the current stroke,
    /// since its coordinates belong to the old frame. Returns whether anything changed.
    pub fn resize(&mut self, width: usize, height: usize) -> bool {
        if self.canvas.width == width && self.canvas.height == height {
            return false;
        }
        debug!(width, height, "canvas recreated");
        self.canvas = FrameBuffer::blank(width, height);
        self.stroke.clear();
        self.phase = DrawingPhase::Idle;
        true
    }

    pub fn phase(&self) -> DrawingPhase {
        self.phase
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.phase, DrawingPhase::Drawing { .. })
    }

    pub fn stroke(&self) -> &[Point2D] {
        &self.stroke
    }

    pub fn point_count(&self) -> usize {
        self.stroke.len()
    }

    pub fn canvas(&self) -> &FrameBuffer {
        &self.canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pointing(sm: &mut DrawingStateMachine, x: i32, y: i32) -> StrokeUpdate {
        sm.apply(GestureCategory::PointingUp, true, Some(Point2D::new(x, y)))
    }

    #[test]
    fn first_point_draws_no_segment() {
        let mut sm = DrawingStateMachine::new(64, 64);
        let update = pointing(&mut sm, 10, 10);
        assert_eq!(update, StrokeUpdate::Appended { point: Point2D::new(10, 10), segment: false });
        assert_eq!(sm.point_count(), 1);
        assert!(sm.canvas().is_blank());
        assert!(sm.is_drawing());
    }

    #[test]
    fn consecutive_points_are_joined() {
        let mut sm = DrawingStateMachine::new(64, 64);
        pointing(&mut sm, 10, 10);
        let update = pointing(&mut sm, 30, 10);
        assert!(matches!(update, StrokeUpdate::Appended { segment: true, .. }));
        assert_eq!(sm.canvas().pixel(20, 10), Some(STROKE_COLOR));
    }

    #[test]
    fn invalid_distance_breaks_chain_but_keeps_points() {
        let mut sm = DrawingStateMachine::new(64, 64);
        pointing(&mut sm, 10, 10);
        pointing(&mut sm, 12, 10);
        assert_eq!(
            sm.apply(GestureCategory::PointingUp, false, Some(Point2D::new(14, 10))),
            StrokeUpdate::ChainBreak
        );
        assert_eq!(sm.phase(), DrawingPhase::Idle);
        assert_eq!(sm.point_count(), 2);
    }

    #[test]
    fn resume_after_gap_does_not_bridge() {
        let mut sm = DrawingStateMachine::new(64, 64);
        pointing(&mut sm, 5, 5);
        sm.apply(GestureCategory::Other, true, Some(Point2D::new(5, 5)));
        let update = pointing(&mut sm, 50, 50);
        assert!(matches!(update, StrokeUpdate::Appended { segment: false, .. }));
        // midpoint of the would-be bridge stays untouched
        assert_eq!(sm.canvas().pixel(27, 27), Some(0));
        assert_eq!(sm.point_count(), 2);
    }

    #[test]
    fn thumb_down_clears_regardless_of_distance() {
        let mut sm = DrawingStateMachine::new(64, 64);
        pointing(&mut sm, 5, 5);
        pointing(&mut sm, 40, 40);
        assert_eq!(sm.apply(GestureCategory::ThumbDown, false, None), StrokeUpdate::Cleared);
        assert!(sm.stroke().is_empty());
        assert!(sm.canvas().is_blank());
        assert_eq!(sm.phase(), DrawingPhase::Idle);
    }

    #[test]
    fn pointing_without_fingertip_is_a_break() {
        let mut sm = DrawingStateMachine::new(64, 64);
        assert_eq!(sm.apply(GestureCategory::PointingUp, true, None), StrokeUpdate::ChainBreak);
        assert_eq!(sm.point_count(), 0);
    }

    #[test]
    fn resize_recreates_canvas_and_drops_stroke() {
        let mut sm = DrawingStateMachine::new(64, 64);
        pointing(&mut sm, 5, 5);
        pointing(&mut sm, 6, 6);
        assert!(!sm.resize(64, 64));
        assert_eq!(sm.point_count(), 2);
        assert!(sm.resize(32, 24));
        assert_eq!((sm.canvas().width, sm.canvas().height), (32, 24));
        assert_eq!(sm.point_count(), 0);
        assert!(sm.canvas().is_blank());
    }
}

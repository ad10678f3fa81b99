//! The stroke surface: a persistent RGBA canvas the user draws into.
//!
//! Mouse and touch input are first folded into one logical stream
//! ([`SurfaceInput`]) by [`normalize`], then applied to the
//! [`StrokeSurface`] through a single code path.

use std::sync::mpsc::{channel, Receiver, Sender};

use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::types::{BrushStamp, Point};

/// Opaque white: the blank canvas color.
pub const BLANK: Rgba<u8> = Rgba([255, 255, 255, 255]);
/// Default stroke color (black).
pub const DEFAULT_STROKE_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);
/// Default stroke width in logical units (pixels).
pub const DEFAULT_STROKE_WIDTH: u32 = 8;

/// How strokes look. Caps and joins are always round (the brush is a disc).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Rgba<u8>,
    pub width: u32,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self { color: DEFAULT_STROKE_COLOR, width: DEFAULT_STROKE_WIDTH }
    }
}

/// Raw device input, in the window's (device) coordinate space.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp,
    /// The pointer left the surface; an open stroke must be closed.
    PointerLeave,
    /// Active touch points; only the first one draws.
    TouchStart(Vec<Point>),
    TouchMove(Vec<Point>),
    TouchEnd,
}

/// Device-independent input the surface understands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceInput {
    Begin(Point),
    Continue(Point),
    End,
}

/// Notifications published to subscribers of the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The canvas was wiped; prediction text and confidence bars are stale.
    Cleared,
}

/// Translate a device event into surface input.
///
/// Pointer and touch coordinates go through the same transform: subtract the
/// surface's on-screen `origin`. Touch events without any touch point yield
/// `None`.
pub fn normalize(event: &InputEvent, origin: Point) -> Option<SurfaceInput> {
    let local = |p: &Point| Point::new(p.x - origin.x, p.y - origin.y);
    match event {
        InputEvent::PointerDown(p) => Some(SurfaceInput::Begin(local(p))),
        InputEvent::PointerMove(p) => Some(SurfaceInput::Continue(local(p))),
        InputEvent::TouchStart(touches) => touches.first().map(|p| SurfaceInput::Begin(local(p))),
        InputEvent::TouchMove(touches) => touches.first().map(|p| SurfaceInput::Continue(local(p))),
        InputEvent::PointerUp | InputEvent::PointerLeave | InputEvent::TouchEnd => {
            Some(SurfaceInput::End)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DrawState {
    Idle,
    Drawing { last: Point },
}

/// Owns the raster buffer and the drawing state machine.
pub struct StrokeSurface {
    buffer: RgbaImage,
    style: StrokeStyle,
    stamp: BrushStamp,
    state: DrawState,
    subscribers: Vec<Sender<SurfaceEvent>>,
}

impl StrokeSurface {
    /// Create a blank surface with the given stroke style.
    pub fn new(width: u32, height: u32, style: StrokeStyle) -> Self {
        let mut surface = Self {
            buffer: RgbaImage::new(width, height),
            style: StrokeStyle::default(),
            stamp: BrushStamp::round(DEFAULT_STROKE_WIDTH),
            state: DrawState::Idle,
            subscribers: Vec::new(),
        };
        surface.initialize();
        surface.set_style(style);
        surface
    }

    /// Fill with opaque white and restore the default pen.
    /// Visual: the canvas is blank.
    pub fn initialize(&mut self) {
        self.fill_blank();
        self.style = StrokeStyle::default();
        self.stamp = BrushStamp::round(self.style.width);
        self.state = DrawState::Idle;
    }

    /// Change the pen used for subsequent strokes.
    pub fn set_style(&mut self, style: StrokeStyle) {
        self.style = style;
        self.stamp = BrushStamp::round(style.width);
    }

    pub fn style(&self) -> StrokeStyle {
        self.style
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, DrawState::Drawing { .. })
    }

    /// Register for surface notifications (currently: clears).
    pub fn subscribe(&mut self) -> Receiver<SurfaceEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    /// Apply one normalized input.
    pub fn apply(&mut self, input: SurfaceInput) {
        match input {
            SurfaceInput::Begin(p) => self.begin_stroke(p),
            SurfaceInput::Continue(p) => self.continue_stroke(p),
            SurfaceInput::End => self.end_stroke(),
        }
    }

    /// Start a stroke at `point`; a tap alone leaves a dot.
    /// Starting while already drawing simply begins a new stroke.
    pub fn begin_stroke(&mut self, point: Point) {
        self.state = DrawState::Drawing { last: point };
        self.draw_segment(point, point);
    }

    /// Extend the current stroke to `point`. Ignored while idle.
    pub fn continue_stroke(&mut self, point: Point) {
        let DrawState::Drawing { last } = self.state else {
            return;
        };
        self.draw_segment(last, point);
        self.state = DrawState::Drawing { last: point };
    }

    /// Close the current stroke (pointer up or pointer left the surface).
    pub fn end_stroke(&mut self) {
        self.state = DrawState::Idle;
    }

    /// Wipe the canvas and tell subscribers their derived state is stale.
    /// An open stroke stays open; the next move draws onto the blank canvas.
    pub fn clear(&mut self) {
        self.fill_blank();
        debug!("surface cleared");
        // Drop subscribers whose receiver is gone
        self.subscribers.retain(|tx| tx.send(SurfaceEvent::Cleared).is_ok());
    }

    /// Read-only copy of the current pixels.
    pub fn snapshot(&self) -> RgbaImage {
        self.buffer.clone()
    }

    /// Borrow the live buffer (for presenting to the window).
    pub fn buffer(&self) -> &RgbaImage {
        &self.buffer
    }

    fn fill_blank(&mut self) {
        for px in self.buffer.pixels_mut() {
            *px = BLANK;
        }
    }

    /// Walk from `a` to `b` with Bresenham and dab the brush at each step.
    /// Visual: a thick line with round ends appears along the path.
    ///
    /// The segment is first clipped to the canvas grown by the brush reach,
    /// so far-off points cost nothing and never overflow the pixel math.
    fn draw_segment(&mut self, a: Point, b: Point) {
        let margin = (self.stamp.reach() + 1) as f64;
        let bounds = (
            -margin,
            -margin,
            self.buffer.width() as f64 + margin,
            self.buffer.height() as f64 + margin,
        );
        let Some((a, b)) = clip_segment(a, b, bounds) else {
            return;
        };

        let (mut x0, mut y0) = a.to_pixel();
        let (x1, y1) = b.to_pixel();
        let dx = (x1 - x0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let dy = -(y1 - y0).abs();
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.dab(x0, y0);
            if x0 == x1 && y0 == y1 { break; }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; x0 += sx; }
            if e2 <= dx { err += dx; y0 += sy; }
        }
    }

    /// Stamp the brush at (cx, cy), clipping at the edges.
    fn dab(&mut self, cx: i32, cy: i32) {
        let w = self.buffer.width() as i32;
        let h = self.buffer.height() as i32;
        let size = self.stamp.size;
        let offset = self.stamp.offset;
        for ky in 0..size {
            for kx in 0..size {
                if !self.stamp.covers(kx, ky) { continue; }
                let sx = cx + kx - offset;
                let sy = cy + ky - offset;
                if sx < 0 || sy < 0 || sx >= w || sy >= h { continue; }
                self.buffer.put_pixel(sx as u32, sy as u32, self.style.color);
            }
        }
    }
}

/// Liang-Barsky: the part of segment `a`-`b` inside `(min_x, min_y, max_x, max_y)`.
/// `None` when the segment misses the box or has a non-finite end.
fn clip_segment(a: Point, b: Point, bounds: (f64, f64, f64, f64)) -> Option<(Point, Point)> {
    let (x0, y0) = (a.x as f64, a.y as f64);
    let (x1, y1) = (b.x as f64, b.y as f64);
    if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
        return None;
    }
    let (min_x, min_y, max_x, max_y) = bounds;
    let (dx, dy) = (x1 - x0, y1 - y0);
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    for (p, q) in [(-dx, x0 - min_x), (dx, max_x - x0), (-dy, y0 - min_y), (dy, max_y - y0)] {
        if p == 0.0 {
            // Parallel to this edge: fully outside or no constraint
            if q < 0.0 { return None; }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 { return None; }
            t0 = t0.max(r);
        } else {
            if r < t0 { return None; }
            t1 = t1.min(r);
        }
    }
    let at = |t: f64| Point::new((x0 + t * dx) as f32, (y0 + t * dy) as f32);
    Some((at(t0), at(t1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_white(img: &RgbaImage, x: u32, y: u32) -> bool {
        *img.get_pixel(x, y) == BLANK
    }

    fn all_white(img: &RgbaImage) -> bool {
        img.pixels().all(|p| *p == BLANK)
    }

    #[test]
    fn test_new_surface_is_blank_and_idle() {
        let surface = StrokeSurface::new(64, 48, StrokeStyle::default());
        assert!(all_white(&surface.snapshot()));
        assert!(!surface.is_drawing());
        assert_eq!(surface.style().width, DEFAULT_STROKE_WIDTH);
        assert_eq!(surface.style().color, DEFAULT_STROKE_COLOR);
    }

    #[test]
    fn test_tap_leaves_dot() {
        let mut surface = StrokeSurface::new(300, 300, StrokeStyle::default());
        surface.begin_stroke(Point::new(50.0, 50.0));
        surface.end_stroke();

        let snap = surface.snapshot();
        assert!(!is_white(&snap, 50, 50), "tap should leave a visible dot");
        assert!(is_white(&snap, 0, 0));
        assert!(is_white(&snap, 299, 299));
        assert!(!surface.is_drawing());
    }

    #[test]
    fn test_stroke_stays_inside_its_bounding_region() {
        let mut surface = StrokeSurface::new(200, 200, StrokeStyle::default());
        let points = [
            Point::new(40.0, 60.0),
            Point::new(80.0, 70.0),
            Point::new(120.0, 50.0),
            Point::new(100.0, 110.0),
        ];
        surface.begin_stroke(points[0]);
        for p in &points[1..] {
            surface.continue_stroke(*p);
        }
        surface.end_stroke();

        let r = (DEFAULT_STROKE_WIDTH / 2) as i32;
        let min_x = 40 - r;
        let max_x = 120 + r;
        let min_y = 50 - r;
        let max_y = 110 + r;

        let snap = surface.snapshot();
        let mut painted = 0;
        for (x, y, px) in snap.enumerate_pixels() {
            let (x, y) = (x as i32, y as i32);
            let inside = x >= min_x && x <= max_x && y >= min_y && y <= max_y;
            if *px != BLANK {
                painted += 1;
                assert!(inside, "pixel ({x},{y}) painted outside the stroke region");
            }
        }
        assert!(painted > 0);
        // Midpoint of the first segment is on the path
        assert!(!is_white(&snap, 60, 65));
    }

    #[test]
    fn test_continue_while_idle_is_noop() {
        let mut surface = StrokeSurface::new(100, 100, StrokeStyle::default());
        let before = surface.snapshot();
        surface.continue_stroke(Point::new(10.0, 10.0));
        surface.continue_stroke(Point::new(90.0, 90.0));
        assert_eq!(surface.snapshot(), before);
        assert!(!surface.is_drawing());
    }

    #[test]
    fn test_end_when_idle_is_noop() {
        let mut surface = StrokeSurface::new(10, 10, StrokeStyle::default());
        surface.end_stroke();
        assert!(!surface.is_drawing());
        assert!(all_white(&surface.snapshot()));
    }

    #[test]
    fn test_begin_while_drawing_starts_new_stroke() {
        let mut surface = StrokeSurface::new(200, 200, StrokeStyle::default());
        surface.begin_stroke(Point::new(20.0, 20.0));
        surface.begin_stroke(Point::new(150.0, 150.0));
        surface.continue_stroke(Point::new(160.0, 150.0));
        surface.end_stroke();

        let snap = surface.snapshot();
        // No line joins the two strokes
        assert!(is_white(&snap, 85, 85));
        assert!(!is_white(&snap, 155, 150));
    }

    #[test]
    fn test_clear_matches_fresh_surface_and_notifies() {
        let fresh = StrokeSurface::new(120, 80, StrokeStyle::default()).snapshot();

        let mut surface = StrokeSurface::new(120, 80, StrokeStyle::default());
        let events = surface.subscribe();
        surface.begin_stroke(Point::new(10.0, 10.0));
        surface.continue_stroke(Point::new(100.0, 70.0));
        assert_ne!(surface.snapshot(), fresh);

        surface.clear();
        assert_eq!(surface.snapshot(), fresh);
        assert_eq!(events.try_recv(), Ok(SurfaceEvent::Cleared));
        assert!(events.try_recv().is_err());
        // Clearing only touches pixels
        assert!(surface.is_drawing());
        surface.end_stroke();
        assert!(!surface.is_drawing());
    }

    #[test]
    fn test_move_after_clear_mid_stroke_keeps_drawing() {
        let mut surface = StrokeSurface::new(100, 100, StrokeStyle::default());
        surface.begin_stroke(Point::new(10.0, 50.0));
        surface.continue_stroke(Point::new(30.0, 50.0));
        surface.clear();

        surface.continue_stroke(Point::new(60.0, 50.0));
        let snap = surface.snapshot();
        // Segment from the last point before the clear to the new one
        assert!(!is_white(&snap, 45, 50));
        assert!(!is_white(&snap, 60, 50));
        // The wiped part of the stroke stays gone
        assert!(is_white(&snap, 15, 50));
    }

    #[test]
    fn test_clear_tolerates_dropped_subscriber() {
        let mut surface = StrokeSurface::new(10, 10, StrokeStyle::default());
        drop(surface.subscribe());
        let live = surface.subscribe();
        surface.clear();
        surface.clear();
        assert_eq!(live.try_iter().count(), 2);
        assert_eq!(surface.subscribers.len(), 1);
    }

    #[test]
    fn test_strokes_clip_at_edges() {
        let mut surface = StrokeSurface::new(50, 50, StrokeStyle::default());
        surface.begin_stroke(Point::new(-20.0, 25.0));
        surface.continue_stroke(Point::new(70.0, 25.0));
        surface.end_stroke();
        let snap = surface.snapshot();
        assert!(!is_white(&snap, 0, 25));
        assert!(!is_white(&snap, 49, 25));
    }

    #[test]
    fn test_far_off_points_clip_to_the_visible_row() {
        let mut surface = StrokeSurface::new(40, 20, StrokeStyle::default());
        surface.begin_stroke(Point::new(-3.0e9, 10.0));
        surface.continue_stroke(Point::new(3.0e9, 10.0));
        surface.end_stroke();
        let snap = surface.snapshot();
        assert!((0..40).all(|x| !is_white(&snap, x, 10)));
        assert!(is_white(&snap, 0, 0));
    }

    #[test]
    fn test_far_off_tap_leaves_canvas_blank() {
        let fresh = StrokeSurface::new(30, 30, StrokeStyle::default()).snapshot();
        let mut surface = StrokeSurface::new(30, 30, StrokeStyle::default());
        surface.begin_stroke(Point::new(f32::MAX, -f32::MAX));
        surface.begin_stroke(Point::new(-1.0e12, -2.0e12));
        surface.continue_stroke(Point::new(1.0e12, -1.0e12));
        surface.begin_stroke(Point::new(f32::NAN, 10.0));
        surface.continue_stroke(Point::new(f32::INFINITY, 10.0));
        assert_eq!(surface.snapshot(), fresh);
    }

    #[test]
    fn test_tap_is_exactly_stroke_width_across() {
        let mut surface = StrokeSurface::new(100, 100, StrokeStyle::default());
        surface.begin_stroke(Point::new(50.0, 50.0));
        let snap = surface.snapshot();
        let across: Vec<u32> = (0..100).filter(|x| !is_white(&snap, *x, 50)).collect();
        let down: Vec<u32> = (0..100).filter(|y| !is_white(&snap, 50, *y)).collect();
        assert_eq!(across, (46..=53).collect::<Vec<_>>());
        assert_eq!(down, (46..=53).collect::<Vec<_>>());
        assert_eq!(across.len() as u32, DEFAULT_STROKE_WIDTH);
    }

    #[test]
    fn test_custom_style_is_used() {
        let red = Rgba([255, 0, 0, 255]);
        let mut surface = StrokeSurface::new(20, 20, StrokeStyle { color: red, width: 1 });
        surface.begin_stroke(Point::new(5.0, 5.0));
        let snap = surface.snapshot();
        assert_eq!(*snap.get_pixel(5, 5), red);
        assert!(is_white(&snap, 6, 5));
    }

    #[test]
    fn test_normalize_pointer_and_touch_share_transform() {
        let origin = Point::new(10.0, 20.0);
        let device = Point::new(60.0, 70.0);

        let from_mouse = normalize(&InputEvent::PointerDown(device), origin);
        let from_touch = normalize(&InputEvent::TouchStart(vec![device]), origin);
        assert_eq!(from_mouse, Some(SurfaceInput::Begin(Point::new(50.0, 50.0))));
        assert_eq!(from_mouse, from_touch);

        let moved_mouse = normalize(&InputEvent::PointerMove(device), origin);
        let moved_touch = normalize(&InputEvent::TouchMove(vec![device, Point::new(0.0, 0.0)]), origin);
        assert_eq!(moved_mouse, Some(SurfaceInput::Continue(Point::new(50.0, 50.0))));
        assert_eq!(moved_mouse, moved_touch);
    }

    #[test]
    fn test_normalize_end_events() {
        let origin = Point::new(0.0, 0.0);
        for event in [InputEvent::PointerUp, InputEvent::PointerLeave, InputEvent::TouchEnd] {
            assert_eq!(normalize(&event, origin), Some(SurfaceInput::End));
        }
        assert_eq!(normalize(&InputEvent::TouchStart(vec![]), origin), None);
        assert_eq!(normalize(&InputEvent::TouchMove(vec![]), origin), None);
    }

    #[test]
    fn test_pointer_leave_closes_stroke() {
        let mut surface = StrokeSurface::new(100, 100, StrokeStyle::default());
        let origin = Point::new(0.0, 0.0);
        let stream = [
            InputEvent::PointerDown(Point::new(10.0, 10.0)),
            InputEvent::PointerMove(Point::new(20.0, 10.0)),
            InputEvent::PointerLeave,
        ];
        for event in &stream {
            if let Some(input) = normalize(event, origin) {
                surface.apply(input);
            }
        }
        assert!(!surface.is_drawing());

        // A move after leaving draws nothing
        let before = surface.snapshot();
        surface.apply(SurfaceInput::Continue(Point::new(90.0, 90.0)));
        assert_eq!(surface.snapshot(), before);
    }
}

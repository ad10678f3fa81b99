//! What the user sees besides the canvas: prediction text, busy indicator,
//! confidence bars. [`DisplayState`] is the model; [`render`] paints it.

use image::RgbaImage;

use crate::classify::{ConfidenceBar, Prediction};
use crate::draw::{
    blit_rgba, draw_text_5x7, fill_rect, stroke_rect, text_width, wrap_text, GLYPH_ADVANCE,
    LINE_HEIGHT,
};
use crate::types::{FrameBuffer, Point};

pub const IDLE_PROMPT: &str = "Draw a shape and click Classify";
pub const MODEL_LOAD_FAILED: &str = "Error loading model. See console for details.";
pub const CLASSIFY_FAILED: &str = "Error during classification. See console for details.";
pub const BUSY_TEXT: &str = "Classifying...";
pub const KEY_HINTS: &str = "C: clear | Enter: classify | Esc: quit";

const BACKGROUND: u32 = 0x00_EC_F0_F1;
const CANVAS_BORDER: u32 = 0x00_34_49_5E;
const TEXT: u32 = 0x00_2C_3E_50;
const MUTED_TEXT: u32 = 0x00_7F_8C_8D;
const BAR_TRACK: u32 = 0x00_D5_DB_DB;

const MARGIN: i32 = 16;
const BAR_HEIGHT: i32 = 6;
const BAR_ROW: i32 = LINE_HEIGHT + BAR_HEIGHT + 6;
/// Lines reserved for the (wrapped) prediction message.
const MESSAGE_LINES: i32 = 2;

/// Text and bars shown under the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayState {
    pub message: String,
    pub bars: Vec<ConfidenceBar>,
    pub busy: bool,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self { message: IDLE_PROMPT.to_string(), bars: Vec::new(), busy: false }
    }
}

impl DisplayState {
    /// Back to the prompt with no bars. A pending classification stays busy.
    pub fn reset(&mut self) {
        self.message = IDLE_PROMPT.to_string();
        self.bars.clear();
    }

    pub fn show_prediction(&mut self, prediction: &Prediction) {
        self.message = prediction.message();
        self.bars = prediction.bars.clone();
    }

    /// Status message for a failed action; old bars are dropped.
    pub fn show_error(&mut self, message: &str) {
        self.message = message.to_string();
        self.bars.clear();
    }
}

/// Where things go in the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub canvas_x: i32,
    pub canvas_y: i32,
    pub canvas_width: i32,
    pub canvas_height: i32,
    pub width: usize,
    pub height: usize,
}

impl Layout {
    /// Canvas framed by a margin, with a panel below sized for `classes` bars.
    pub fn new(canvas_width: u32, canvas_height: u32, classes: usize) -> Self {
        let cw = canvas_width as i32;
        let ch = canvas_height as i32;
        let panel = LINE_HEIGHT * (MESSAGE_LINES + 2) + BAR_ROW * classes as i32;
        let width = (cw + 2 * MARGIN).max(text_width(KEY_HINTS) + 2 * MARGIN);
        Self {
            canvas_x: MARGIN,
            canvas_y: MARGIN,
            canvas_width: cw,
            canvas_height: ch,
            width: width as usize,
            height: (ch + 3 * MARGIN + panel) as usize,
        }
    }

    /// The canvas's on-screen origin, subtracted from device coordinates.
    pub fn canvas_origin(&self) -> Point {
        Point::new(self.canvas_x as f32, self.canvas_y as f32)
    }

    /// Is a window position over the canvas?
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let (x0, y0) = (self.canvas_x as f32, self.canvas_y as f32);
        x >= x0 && y >= y0 && x < x0 + self.canvas_width as f32 && y < y0 + self.canvas_height as f32
    }

    fn panel_width(&self) -> i32 {
        self.width as i32 - 2 * MARGIN
    }
}

/// Paint canvas and panel into `fb` (sized `layout.width x layout.height`).
pub fn render(fb: &mut FrameBuffer, layout: &Layout, canvas: &RgbaImage, state: &DisplayState) {
    fill_rect(fb, 0, 0, fb.width as i32, fb.height as i32, BACKGROUND);

    // Canvas with a one-pixel frame around it
    stroke_rect(
        fb,
        layout.canvas_x - 1,
        layout.canvas_y - 1,
        layout.canvas_width + 2,
        layout.canvas_height + 2,
        CANVAS_BORDER,
    );
    blit_rgba(fb, canvas, layout.canvas_x, layout.canvas_y);

    let x = MARGIN;
    let mut y = layout.canvas_y + layout.canvas_height + MARGIN;
    let max_chars = (layout.panel_width() / GLYPH_ADVANCE).max(1) as usize;

    let message = if state.busy { BUSY_TEXT } else { state.message.as_str() };
    for line in wrap_text(message, max_chars).iter().take(MESSAGE_LINES as usize) {
        draw_text_5x7(fb, x, y, line, TEXT);
        y += LINE_HEIGHT;
    }
    y = layout.canvas_y + layout.canvas_height + MARGIN + MESSAGE_LINES * LINE_HEIGHT + LINE_HEIGHT / 2;

    for bar in &state.bars {
        render_bar(fb, x, y, layout.panel_width(), bar);
        y += BAR_ROW;
    }

    let hints_y = layout.height as i32 - MARGIN / 2 - 7;
    draw_text_5x7(fb, x, hints_y, KEY_HINTS, MUTED_TEXT);
}

/// Label on the left, percentage on the right, filled track underneath.
fn render_bar(fb: &mut FrameBuffer, x: i32, y: i32, width: i32, bar: &ConfidenceBar) {
    draw_text_5x7(fb, x, y, &bar.label, TEXT);
    let pct = bar.percent_text();
    draw_text_5x7(fb, x + width - text_width(&pct), y, &pct, TEXT);

    let track_y = y + LINE_HEIGHT;
    fill_rect(fb, x, track_y, width, BAR_HEIGHT, BAR_TRACK);
    let fill = (bar.percent.clamp(0.0, 100.0) / 100.0 * width as f32).round() as i32;
    fill_rect(fb, x, track_y, fill, BAR_HEIGHT, bar.color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{interpret, ClassLabels, Palette};
    use image::Rgba;

    fn prediction() -> Prediction {
        interpret(&[0.1, 0.7, 0.2], &ClassLabels::default(), &Palette::default()).unwrap()
    }

    #[test]
    fn test_default_shows_prompt() {
        let state = DisplayState::default();
        assert_eq!(state.message, IDLE_PROMPT);
        assert!(state.bars.is_empty());
        assert!(!state.busy);
    }

    #[test]
    fn test_reset_clears_prediction_but_not_busy() {
        let mut state = DisplayState::default();
        state.show_prediction(&prediction());
        state.busy = true;
        assert_eq!(state.message, "This looks like a square!");
        assert_eq!(state.bars.len(), 3);

        state.reset();
        assert_eq!(state.message, IDLE_PROMPT);
        assert!(state.bars.is_empty());
        assert!(state.busy);
    }

    #[test]
    fn test_show_error_drops_bars() {
        let mut state = DisplayState::default();
        state.show_prediction(&prediction());
        state.show_error(CLASSIFY_FAILED);
        assert_eq!(state.message, CLASSIFY_FAILED);
        assert!(state.bars.is_empty());
    }

    #[test]
    fn test_layout_contains_canvas_only() {
        let layout = Layout::new(300, 300, 3);
        assert_eq!(layout.canvas_origin(), Point::new(16.0, 16.0));
        assert!(layout.contains(16.0, 16.0));
        assert!(layout.contains(315.9, 315.9));
        assert!(!layout.contains(316.0, 100.0));
        assert!(!layout.contains(5.0, 100.0));
        assert!(layout.height > 300 + 32);
    }

    #[test]
    fn test_render_places_canvas_and_bars() {
        let layout = Layout::new(40, 30, 3);
        let mut fb = FrameBuffer::filled(layout.width, layout.height, 0);
        let mut canvas = RgbaImage::from_pixel(40, 30, Rgba([255, 255, 255, 255]));
        canvas.put_pixel(5, 5, Rgba([0, 0, 0, 255]));

        let mut state = DisplayState::default();
        state.show_prediction(&prediction());
        render(&mut fb, &layout, &canvas, &state);

        let at = |x: i32, y: i32| fb.pixels[y as usize * fb.width + x as usize];
        assert_eq!(at(layout.canvas_x, layout.canvas_y), 0x00_FF_FF_FF);
        assert_eq!(at(layout.canvas_x + 5, layout.canvas_y + 5), 0);
        assert_eq!(at(layout.canvas_x - 1, layout.canvas_y - 1), CANVAS_BORDER);
        // Each bar color appears somewhere in the panel
        for bar in &state.bars {
            assert!(fb.pixels.contains(&bar.color), "missing bar for {}", bar.label);
        }
    }
}

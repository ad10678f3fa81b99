// Native window + raw input.
// The window shows the framebuffer; mouse state is turned into the same
// InputEvent stream a touch screen would produce.

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use crate::display::Layout;
use crate::error::{Error, Result};
use crate::surface::InputEvent;
use crate::types::{FrameBuffer, Point};

/// Turns per-frame mouse polling into discrete pointer events.
///
/// minifb only reports "is the button down" and "where is the mouse"; this
/// derives press/move/release/leave edges from consecutive frames.
#[derive(Debug, Default)]
pub struct PointerTracker {
    was_down: bool,
    was_inside: bool,
    last: Option<Point>,
}

impl PointerTracker {
    /// Feed one frame of mouse state. `pos` is in window coordinates (None
    /// when outside the window); `inside` says whether it is over the canvas.
    pub fn update(&mut self, pos: Option<Point>, inside: bool, down: bool) -> Vec<InputEvent> {
        let mut events = Vec::new();

        if self.was_inside && !inside {
            events.push(InputEvent::PointerLeave);
        }

        match pos {
            Some(p) if inside => {
                if down && !self.was_down {
                    events.push(InputEvent::PointerDown(p));
                } else if down && self.last != Some(p) {
                    events.push(InputEvent::PointerMove(p));
                }
            }
            _ => {}
        }

        if !down && self.was_down {
            events.push(InputEvent::PointerUp);
        }

        self.was_down = down;
        self.was_inside = inside;
        self.last = pos;
        events
    }
}

/// Keyboard commands read this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Commands {
    pub clear: bool,
    pub classify: bool,
    pub quit: bool,
}

pub struct Drawer {
    window: Window, // the on-screen window you see
    pointer: PointerTracker,
}

impl Drawer {
    /// Create a window of the given size.
    /// Visual: a new empty window appears with your chosen title.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let mut window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        window.set_target_fps(60);
        Ok(Self { window, pointer: PointerTracker::default() })
    }

    /// Push the pixels for this frame to the screen.
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<()> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))?;
        Ok(())
    }

    /// Returns false when the user closes the window (so we can stop the loop).
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    /// Pointer events since the last frame, in window coordinates.
    pub fn pointer_events(&mut self, layout: &Layout) -> Vec<InputEvent> {
        let pos = self
            .window
            .get_mouse_pos(MouseMode::Discard)
            .map(|(x, y)| Point::new(x, y));
        let inside = pos.is_some_and(|p| layout.contains(p.x, p.y));
        let down = self.window.get_mouse_down(MouseButton::Left);
        self.pointer.update(pos, inside, down)
    }

    /// C clears, Enter/Space classifies, Esc quits.
    pub fn commands(&self) -> Commands {
        let pressed = |k| self.window.is_key_pressed(k, KeyRepeat::No);
        Commands {
            clear: pressed(Key::C),
            classify: pressed(Key::Enter) || pressed(Key::Space),
            quit: self.window.is_key_down(Key::Escape),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> Option<Point> {
        Some(Point::new(x, y))
    }

    #[test]
    fn test_press_drag_release() {
        let mut t = PointerTracker::default();
        assert!(t.update(p(10.0, 10.0), true, false).is_empty());
        assert_eq!(t.update(p(10.0, 10.0), true, true), vec![InputEvent::PointerDown(Point::new(10.0, 10.0))]);
        // Holding still produces nothing
        assert!(t.update(p(10.0, 10.0), true, true).is_empty());
        assert_eq!(t.update(p(12.0, 11.0), true, true), vec![InputEvent::PointerMove(Point::new(12.0, 11.0))]);
        assert_eq!(t.update(p(12.0, 11.0), true, false), vec![InputEvent::PointerUp]);
    }

    #[test]
    fn test_leaving_canvas_emits_leave() {
        let mut t = PointerTracker::default();
        t.update(p(10.0, 10.0), true, true);
        assert_eq!(t.update(p(400.0, 10.0), false, true), vec![InputEvent::PointerLeave]);
        // Coming back with the button held only moves; the surface ignores it
        assert_eq!(t.update(p(20.0, 10.0), true, true), vec![InputEvent::PointerMove(Point::new(20.0, 10.0))]);
    }

    #[test]
    fn test_leaving_window_entirely() {
        let mut t = PointerTracker::default();
        t.update(p(10.0, 10.0), true, true);
        assert_eq!(t.update(None, false, false), vec![InputEvent::PointerLeave, InputEvent::PointerUp]);
        assert!(t.update(None, false, false).is_empty());
    }

    #[test]
    fn test_press_outside_canvas_does_not_begin() {
        let mut t = PointerTracker::default();
        assert!(t.update(p(400.0, 10.0), false, true).is_empty());
    }
}

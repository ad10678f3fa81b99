// Core types shared by the surface, the preprocessor and the window.

use image::Rgba;

/// What minifb displays: one u32 per pixel.
#[derive(Clone)]
pub struct FrameBuffer {
    pub width: usize,      // how wide the window is (pixels)
    pub height: usize,     // how tall the window is (pixels)
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    /// A buffer filled with one packed color.
    pub fn filled(width: usize, height: usize, color: u32) -> Self {
        Self { width, height, pixels: vec![color; width * height] }
    }
}

/// Pack an RGBA pixel as 0x00RRGGBB (alpha is dropped; the canvas is opaque).
#[inline]
pub fn pack_rgb(px: Rgba<u8>) -> u32 {
    let [r, g, b, _] = px.0;
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// A position in surface-local coordinates (origin at the canvas top-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Nearest pixel cell; may be negative or past the edge (clipped later).
    #[inline]
    pub fn to_pixel(self) -> (i32, i32) {
        (self.x.floor() as i32, self.y.floor() as i32)
    }
}

/// Precomputed round brush "stamp" dabbed along every stroke segment.
/// Visual: gives strokes their width plus round caps and joins.
pub struct BrushStamp {
    pub size: i32,         // kernel is size x size, size = stroke width
    pub offset: i32,       // kernel column/row that sits on the dab point
    pub mask: Vec<bool>,   // size*size, true where the brush covers the cell
}

impl BrushStamp {
    /// Build a filled disc exactly `width` pixels across.
    ///
    /// Cells are tested at their centers against a disc of diameter `width`
    /// centered in the kernel, so even widths sit between pixels and odd
    /// widths sit on one.
    pub fn round(width: u32) -> Self {
        let size = width.max(1) as i32;
        let half = size as f32 / 2.0;
        let limit = half * half;
        let mut mask = Vec::with_capacity((size * size) as usize);
        for ky in 0..size {
            for kx in 0..size {
                let dx = kx as f32 + 0.5 - half;
                let dy = ky as f32 + 0.5 - half;
                mask.push(dx * dx + dy * dy <= limit);
            }
        }
        Self { size, offset: size / 2, mask }
    }

    /// Pixels the brush can reach beyond the dab point, in any direction.
    pub fn reach(&self) -> i32 {
        self.offset.max(self.size - 1 - self.offset)
    }

    #[inline]
    pub fn covers(&self, kx: i32, ky: i32) -> bool {
        self.mask[(ky * self.size + kx) as usize]
    }
}

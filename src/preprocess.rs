//! Turns a canvas snapshot into the tensor the classifier expects.
//!
//! The pipeline is: resample to the target size, pick channels, scale
//! 0..255 into [0, 1], then add a leading batch dimension of 1. The output
//! layout is NHWC: `[1, target_height, target_width, channels]`.

use image::imageops::{self, FilterType};
use image::{Pixel, RgbaImage};
use ndarray::Array4;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Width the model was trained on.
pub const TARGET_WIDTH: u32 = 128;
/// Height the model was trained on.
pub const TARGET_HEIGHT: u32 = 128;
/// Native channel range; values are divided by this.
pub const NORMALIZE_DIVISOR: f32 = 255.0;

/// Model input: `[batch = 1, height, width, channels]`, values in [0, 1].
pub type Tensor = Array4<f32>;

/// Which color channels the model consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    /// Red, green, blue; alpha dropped.
    #[default]
    Rgb,
    Rgba,
    /// Single luma channel.
    Grayscale,
}

impl ChannelLayout {
    pub fn count(self) -> usize {
        match self {
            ChannelLayout::Rgb => 3,
            ChannelLayout::Rgba => 4,
            ChannelLayout::Grayscale => 1,
        }
    }
}

/// Resampling kernel used to shrink the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resample {
    Nearest,
    #[default]
    Bilinear,
    Lanczos3,
}

impl Resample {
    fn filter(self) -> FilterType {
        match self {
            Resample::Nearest => FilterType::Nearest,
            Resample::Bilinear => FilterType::Triangle,
            Resample::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Stateless converter from canvas pixels to a model tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preprocessor {
    pub target_width: u32,
    pub target_height: u32,
    pub channels: ChannelLayout,
    pub resample: Resample,
    pub divisor: f32,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            target_width: TARGET_WIDTH,
            target_height: TARGET_HEIGHT,
            channels: ChannelLayout::default(),
            resample: Resample::default(),
            divisor: NORMALIZE_DIVISOR,
        }
    }
}

impl Preprocessor {
    pub fn new(target_width: u32, target_height: u32, channels: ChannelLayout) -> Self {
        Self { target_width, target_height, channels, ..Self::default() }
    }

    /// Shape of every tensor this preprocessor produces.
    pub fn output_shape(&self) -> [usize; 4] {
        [1, self.target_height as usize, self.target_width as usize, self.channels.count()]
    }

    /// Resample `snapshot`, extract channels, normalize, add the batch axis.
    ///
    /// Pure: the snapshot is only read, and equal snapshots give identical
    /// tensors.
    pub fn prepare(&self, snapshot: &RgbaImage) -> Result<Tensor> {
        let (w, h) = snapshot.dimensions();
        if w == 0 || h == 0 {
            return Err(Error::InvalidInput(format!("snapshot is {w}x{h}")));
        }
        if self.target_width == 0 || self.target_height == 0 {
            return Err(Error::InvalidInput(format!(
                "target size is {}x{}",
                self.target_width, self.target_height
            )));
        }
        if !(self.divisor.is_finite() && self.divisor > 0.0) {
            return Err(Error::InvalidInput(format!("normalization divisor {}", self.divisor)));
        }

        let resized = if (w, h) == (self.target_width, self.target_height) {
            snapshot.clone()
        } else {
            imageops::resize(snapshot, self.target_width, self.target_height, self.resample.filter())
        };

        let [_, th, tw, c] = self.output_shape();
        let layout = self.channels;
        let divisor = self.divisor;
        let tensor = Array4::from_shape_fn((1, th, tw, c), |(_, y, x, ch)| {
            let px = resized.get_pixel(x as u32, y as u32);
            let raw = match layout {
                ChannelLayout::Rgb | ChannelLayout::Rgba => px.0[ch],
                ChannelLayout::Grayscale => px.to_luma().0[0],
            };
            (raw as f32 / divisor).clamp(0.0, 1.0)
        });
        Ok(tensor)
    }
}

//! Configuration: canvas, preprocessing and model settings.
//!
//! Everything has a default, so an empty `{}` file (or no file) is valid.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::classify::{parse_hex_color, ClassLabels, Palette};
use crate::error::{Error, Result};
use crate::model::DEFAULT_MODEL_PATH;
use crate::preprocess::{
    ChannelLayout, Preprocessor, Resample, NORMALIZE_DIVISOR, TARGET_HEIGHT, TARGET_WIDTH,
};
use crate::surface::{StrokeStyle, DEFAULT_STROKE_WIDTH};

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "sketch.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub canvas: CanvasConfig,
    pub preprocess: PreprocessConfig,
    pub model: ModelConfig,
}

/// Drawing surface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    pub stroke_width: u32,
    /// `#rrggbb`
    pub stroke_color: String,
}

/// Model input shaping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub target_width: u32,
    pub target_height: u32,
    pub channels: ChannelLayout,
    pub resample: Resample,
    pub divisor: f32,
}

/// Model location and class list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    /// Score order of the model's output.
    pub classes: Vec<String>,
    /// Per-class bar colors (`#rrggbb`), on top of the built-ins.
    pub colors: HashMap<String, String>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 300,
            height: 300,
            stroke_width: DEFAULT_STROKE_WIDTH,
            stroke_color: "#000000".to_string(),
        }
    }
}

impl Default for PreprocessConfig {
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

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_MODEL_PATH),
            classes: ClassLabels::default().iter().map(str::to_string).collect(),
            colors: HashMap::new(),
        }
    }
}

impl Config {
    /// Check values are usable; returns the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(Error::Config(format!(
                "canvas must be non-empty, got {}x{}",
                self.canvas.width, self.canvas.height
            )));
        }
        if self.canvas.stroke_width == 0 {
            return Err(Error::Config("stroke_width must be > 0".to_string()));
        }
        if parse_hex_color(&self.canvas.stroke_color).is_none() {
            return Err(Error::Config(format!("bad stroke_color {:?}", self.canvas.stroke_color)));
        }
        if self.preprocess.target_width == 0 || self.preprocess.target_height == 0 {
            return Err(Error::Config("preprocess target size must be non-zero".to_string()));
        }
        if !(self.preprocess.divisor.is_finite() && self.preprocess.divisor > 0.0) {
            return Err(Error::Config(format!(
                "divisor must be positive, got {}",
                self.preprocess.divisor
            )));
        }
        if self.model.classes.is_empty() {
            return Err(Error::Config("classes must not be empty".to_string()));
        }
        if let Some((name, hex)) = self.model.colors.iter().find(|(_, hex)| parse_hex_color(hex).is_none()) {
            return Err(Error::Config(format!("bad color {hex:?} for class {name:?}")));
        }
        Ok(())
    }

    /// Load config from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `sketch.json` from the working directory, or defaults if absent.
    pub fn load_default() -> Result<Self> {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn stroke_style(&self) -> StrokeStyle {
        let [_, r, g, b] = parse_hex_color(&self.canvas.stroke_color).unwrap_or(0).to_be_bytes();
        StrokeStyle { color: Rgba([r, g, b, 255]), width: self.canvas.stroke_width }
    }

    pub fn preprocessor(&self) -> Preprocessor {
        Preprocessor {
            target_width: self.preprocess.target_width,
            target_height: self.preprocess.target_height,
            channels: self.preprocess.channels,
            resample: self.preprocess.resample,
            divisor: self.preprocess.divisor,
        }
    }

    pub fn labels(&self) -> ClassLabels {
        ClassLabels::new(self.model.classes.iter().cloned())
    }

    pub fn palette(&self) -> Palette {
        let overrides = self
            .model
            .colors
            .iter()
            .filter_map(|(name, hex)| parse_hex_color(hex).map(|c| (name.clone(), c)))
            .collect();
        Palette::with_overrides(overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.canvas.width, 300);
        assert_eq!(config.preprocessor(), Preprocessor::default());
        assert_eq!(config.labels(), ClassLabels::default());
        assert_eq!(config.stroke_style(), StrokeStyle::default());
        assert_eq!(config.model.path, PathBuf::from("model/model.json"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r##"{{"canvas": {{"width": 400, "stroke_color": "#ff0000"}},
                 "preprocess": {{"channels": "grayscale", "target_width": 28, "target_height": 28}},
                 "model": {{"classes": ["circle", "star"], "colors": {{"star": "#ffcc00"}}}}}}"##
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.canvas.width, 400);
        assert_eq!(config.canvas.height, 300);
        assert_eq!(config.stroke_style().color, Rgba([255, 0, 0, 255]));
        assert_eq!(config.preprocessor().output_shape(), [1, 28, 28, 1]);
        assert_eq!(config.labels().get(1), Some("star"));
        assert_eq!(config.palette().color_for("star"), 0x00_FF_CC_00);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.canvas.width = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.preprocess.divisor = -1.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.model.classes.clear();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.model.colors.insert("circle".into(), "blue".into());
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_bad_json_is_serialization_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[1, 2").unwrap();
        assert!(matches!(Config::load(file.path()), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_round_trips_through_json() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.preprocessor(), Preprocessor::default());
    }
}

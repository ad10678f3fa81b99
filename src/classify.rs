//! Interpreting model output: arg-max class, sentence, confidence bars.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Bar color for any class without an explicit entry.
pub const FALLBACK_COLOR: u32 = 0x00_9B_59_B6;

/// Built-in bar colors, by class name.
const DEFAULT_COLORS: [(&str, u32); 3] = [
    ("circle", 0x00_34_98_DB),
    ("square", 0x00_2E_CC_71),
    ("triangle", 0x00_E7_4C_3C),
];

/// Class names in the order the model emits scores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLabels(Vec<String>);

impl Default for ClassLabels {
    fn default() -> Self {
        Self::new(["circle", "square", "triangle"])
    }
}

impl ClassLabels {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Parse `#rrggbb` (or `rrggbb`) into 0x00RRGGBB.
pub fn parse_hex_color(s: &str) -> Option<u32> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

/// Class name → bar color, with user overrides on top of the built-ins.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    overrides: HashMap<String, u32>,
}

impl Palette {
    pub fn with_overrides(overrides: HashMap<String, u32>) -> Self {
        Self { overrides }
    }

    pub fn color_for(&self, class: &str) -> u32 {
        if let Some(c) = self.overrides.get(class) {
            return *c;
        }
        color_for_class(class)
    }
}

/// Static lookup of the built-in colors; unknown classes get the fallback.
pub fn color_for_class(class: &str) -> u32 {
    DEFAULT_COLORS
        .iter()
        .find(|(name, _)| *name == class)
        .map(|(_, c)| *c)
        .unwrap_or(FALLBACK_COLOR)
}

/// One row of the confidence display.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceBar {
    pub label: String,
    /// score * 100; not clamped, the model's scores are taken as-is.
    pub percent: f32,
    pub color: u32,
}

impl ConfidenceBar {
    /// "70.0%"
    pub fn percent_text(&self) -> String {
        format_percent(self.percent)
    }
}

pub fn format_percent(percent: f32) -> String {
    format!("{percent:.1}%")
}

/// The interpreted result of one classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class: String,
    pub index: usize,
    pub scores: Vec<f32>,
    pub bars: Vec<ConfidenceBar>,
}

impl Prediction {
    /// Sentence shown to the user.
    pub fn message(&self) -> String {
        format!("This looks like a {}!", self.class)
    }
}

/// Pick the arg-max class and build the confidence bars.
///
/// Scores need not sum to 1. Ties go to the first maximum. Output that does
/// not line up with `labels`, or contains NaN, is a classification error.
pub fn interpret(scores: &[f32], labels: &ClassLabels, palette: &Palette) -> Result<Prediction> {
    if scores.is_empty() {
        return Err(Error::Classification("model returned no scores".into()));
    }
    if scores.len() != labels.len() {
        return Err(Error::Classification(format!(
            "model returned {} scores for {} classes",
            scores.len(),
            labels.len()
        )));
    }
    if scores.iter().any(|s| s.is_nan()) {
        return Err(Error::Classification("model returned NaN".into()));
    }

    let mut index = 0;
    for (i, s) in scores.iter().enumerate() {
        if *s > scores[index] {
            index = i;
        }
    }

    let bars = labels
        .iter()
        .zip(scores)
        .map(|(label, score)| ConfidenceBar {
            label: label.to_string(),
            percent: score * 100.0,
            color: palette.color_for(label),
        })
        .collect();

    // Length was checked above
    let class = labels.get(index).unwrap_or_default().to_string();
    Ok(Prediction { class, index, scores: scores.to_vec(), bars })
}

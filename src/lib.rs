//! Sketch classifier: draw a shape on a canvas, downscale it into a
//! `[1, H, W, C]` tensor and let a pre-trained model name it.
//!
//! The pieces, in the order data flows through them:
//! - [`surface`]: the RGBA canvas and its idle/drawing state machine
//! - [`preprocess`]: snapshot → resampled, normalized tensor
//! - [`model`] / [`worker`]: the classifier, run off the UI thread
//! - [`classify`]: arg-max class and confidence bars
//! - [`display`], [`draw`], [`window`]: what ends up on screen

pub mod app;
pub mod classify;
pub mod config;
pub mod display;
pub mod draw;
pub mod error;
pub mod model;
pub mod preprocess;
pub mod surface;
pub mod types;
pub mod window;
pub mod worker;

pub use app::App;
pub use error::{Error, Result};
pub use preprocess::{Preprocessor, Tensor};
pub use surface::{InputEvent, StrokeSurface, SurfaceEvent, SurfaceInput};

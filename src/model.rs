//! The classification model, seen from the outside as one `predict` call.
//!
//! [`DenseModel`] is the model we ship a loader for: a single fully connected
//! layer described by a JSON file. Anything else implementing [`Classifier`]
//! plugs into the app the same way.

use std::path::Path;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::preprocess::Tensor;

/// Where the model description lives, relative to the working directory.
pub const DEFAULT_MODEL_PATH: &str = "model/model.json";

/// Anything that can score a tensor, one value per known class.
pub trait Classifier: Send + Sync {
    fn predict(&self, input: &Tensor) -> Result<Vec<f32>>;

    /// Class names baked into the model, if it carries any.
    fn class_names(&self) -> Option<&[String]> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Softmax,
    /// Raw scores, no squashing.
    Linear,
}

/// On-disk model description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescription {
    /// `[height, width, channels]` of one sample (batch axis excluded).
    pub input_shape: [usize; 3],
    /// `[outputs, inputs]`, stored in ndarray's serde form
    /// (`{"v":1,"dim":[outputs,inputs],"data":[...]}`, row-major).
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
    #[serde(default)]
    pub activation: Activation,
    #[serde(default)]
    pub classes: Option<Vec<String>>,
}

/// One dense layer plus activation.
#[derive(Debug, Clone)]
pub struct DenseModel {
    desc: ModelDescription,
    inputs: usize,
}

impl DenseModel {
    /// Read and validate a model description from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ModelLoad(format!("{}: {e}", path.display())))?;
        let desc: ModelDescription = serde_json::from_str(&content)
            .map_err(|e| Error::ModelLoad(format!("{}: {e}", path.display())))?;
        let model = Self::from_description(desc)?;
        info!(
            path = %path.display(),
            inputs = model.inputs,
            outputs = model.outputs(),
            "model loaded"
        );
        Ok(model)
    }

    /// Check that the layer dimensions agree with each other.
    pub fn from_description(desc: ModelDescription) -> Result<Self> {
        let inputs: usize = desc.input_shape.iter().product();
        if inputs == 0 {
            return Err(Error::ModelLoad(format!("empty input shape {:?}", desc.input_shape)));
        }
        let (outputs, columns) = desc.weights.dim();
        if outputs == 0 {
            return Err(Error::ModelLoad("model has no output units".into()));
        }
        if desc.bias.len() != outputs {
            return Err(Error::ModelLoad(format!(
                "bias has {} entries for {outputs} outputs",
                desc.bias.len()
            )));
        }
        if columns != inputs {
            return Err(Error::ModelLoad(format!(
                "weights have {columns} columns, input shape needs {inputs}"
            )));
        }
        if let Some(classes) = &desc.classes {
            if classes.len() != outputs {
                return Err(Error::ModelLoad(format!(
                    "{} class names for {outputs} outputs",
                    classes.len()
                )));
            }
        }
        Ok(Self { desc, inputs })
    }

    pub fn input_shape(&self) -> [usize; 3] {
        self.desc.input_shape
    }

    pub fn outputs(&self) -> usize {
        self.desc.weights.nrows()
    }
}

impl Classifier for DenseModel {
    fn predict(&self, input: &Tensor) -> Result<Vec<f32>> {
        let (_, h, w, c) = input.dim();
        if [h, w, c] != self.desc.input_shape {
            return Err(Error::Classification(format!(
                "tensor is {h}x{w}x{c}, model expects {:?}",
                self.desc.input_shape
            )));
        }
        if input.len_of(Axis(0)) == 0 {
            return Err(Error::Classification("tensor has an empty batch".into()));
        }
        // Only the first sample of the batch is scored
        let sample: Array1<f32> = input.index_axis(Axis(0), 0).iter().copied().collect();
        let logits = (self.desc.weights.dot(&sample) + &self.desc.bias).to_vec();

        let scores = match self.desc.activation {
            Activation::Softmax => softmax(&logits),
            Activation::Linear => logits,
        };
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(Error::Classification("model produced non-finite scores".into()));
        }
        debug!(?scores, "dense model scored input");
        Ok(scores)
    }

    fn class_names(&self) -> Option<&[String]> {
        self.desc.classes.as_deref()
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

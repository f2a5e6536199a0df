pub mod loader;
pub mod onnx;

use crate::error::InferenceError;
use crate::preprocessing::Frame;
use ndarray::ArrayD;

/// What a loaded pipeline can produce, decided once after loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    LabelOnly,
    LabelWithProbability,
}

/// A predicted class as the model emitted it, before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    Int(i64),
    Bool(bool),
    Float(f64),
    Text(String),
}

/// A classification pipeline that accepts a frame.
pub trait Classifier {
    fn capability(&self) -> Capability;

    /// Predicted class per row.
    fn predict(&mut self, frame: &Frame) -> Result<Vec<Label>, InferenceError>;

    /// Class probabilities, usually `[rows, classes]`. Only called on
    /// `Capability::LabelWithProbability` models.
    fn predict_proba(&mut self, frame: &Frame) -> Result<ArrayD<f64>, InferenceError>;
}

//! ONNX-exported classification pipelines.
//!
//! A pipeline exported from scikit-learn/XGBoost takes either a single float
//! `[N, F]` matrix or one `[N, 1]` tensor per named column (float, int64 or
//! string, the latter for categorical encoders). It returns a `label` tensor,
//! optionally followed by a `probabilities` tensor.

use super::{Capability, Classifier, Label};
use crate::error::InferenceError;
use crate::preprocessing::frame::{coerce_cell, coerce_int_cell, coerce_text_cell, Frame};
use ndarray::{Array2, ArrayD, IxDyn};
use ort::session::{Session, SessionInputValue};
use ort::tensor::TensorElementType;
use ort::value::{DynValue, Tensor, ValueType};
use std::path::{Path, PathBuf};
use tracing::debug;

const LABEL_OUTPUT: &str = "label";
const PROBABILITY_OUTPUTS: [&str; 2] = ["probabilities", "probability"];

/// How frame columns are fed to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InputLayout {
    /// One `[N, F]` matrix, columns taken positionally. `width` is set when
    /// the model declares a static feature count.
    Matrix { name: String, width: Option<usize> },
    /// One `[N, 1]` input per column, matched by name.
    Columns(Vec<ColumnInput>),
}

/// Element types the frame can be coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputKind {
    Float,
    Int64,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ColumnInput {
    pub name: String,
    pub kind: InputKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InputSpec {
    pub name: String,
    /// `None` for element types the frame cannot produce.
    pub kind: Option<InputKind>,
    pub width: Option<usize>,
}

/// A coerced input before it is handed to ONNX Runtime.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FeedTensor {
    Float(Array2<f32>),
    Int64(Array2<i64>),
    Text(Array2<String>),
}

impl FeedTensor {
    fn into_session_value(self) -> Result<SessionInputValue<'static>, InferenceError> {
        Ok(match self {
            FeedTensor::Float(array) => Tensor::from_array(array)?.into(),
            FeedTensor::Int64(array) => Tensor::from_array(array)?.into(),
            FeedTensor::Text(array) => Tensor::from_string_array(&array)?.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OutputSpec {
    pub name: String,
    pub is_tensor: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OutputSelection {
    pub label: String,
    pub probability: Option<String>,
}

pub struct OnnxPipeline {
    session: Session,
    path: PathBuf,
    layout: InputLayout,
    outputs: OutputSelection,
}

impl std::fmt::Debug for OnnxPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxPipeline")
            .field("path", &self.path)
            .field("layout", &self.layout)
            .field("outputs", &self.outputs)
            .finish()
    }
}

impl OnnxPipeline {
    /// Inspects the session's inputs and outputs and fixes the layout and
    /// capability for the rest of the process.
    pub fn from_session(session: Session, path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let inputs: Vec<InputSpec> = session
            .inputs
            .iter()
            .map(|input| match &input.input_type {
                ValueType::Tensor { ty, shape, .. } => InputSpec {
                    name: input.name.clone(),
                    kind: match ty {
                        TensorElementType::Float32 => Some(InputKind::Float),
                        TensorElementType::Int64 => Some(InputKind::Int64),
                        TensorElementType::String => Some(InputKind::Text),
                        _ => None,
                    },
                    width: shape.get(1).copied().filter(|d| *d > 0).map(|d| d as usize),
                },
                _ => InputSpec {
                    name: input.name.clone(),
                    kind: None,
                    width: None,
                },
            })
            .collect();
        let outputs: Vec<OutputSpec> = session
            .outputs
            .iter()
            .map(|output| OutputSpec {
                name: output.name.clone(),
                is_tensor: matches!(output.output_type, ValueType::Tensor { .. }),
            })
            .collect();

        let layout = input_layout(&inputs)?;
        let outputs = select_outputs(&outputs)?;
        debug!(?layout, ?outputs, "inspected model signature");

        Ok(Self {
            session,
            path: path.as_ref().to_path_buf(),
            layout,
            outputs,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn feed(
        &self,
        frame: &Frame,
    ) -> Result<Vec<(String, SessionInputValue<'static>)>, InferenceError> {
        feed_inputs(&self.layout, frame)?
            .into_iter()
            .map(|(name, tensor)| -> Result<_, InferenceError> {
                Ok((name, tensor.into_session_value()?))
            })
            .collect()
    }
}

impl Classifier for OnnxPipeline {
    fn capability(&self) -> Capability {
        if self.outputs.probability.is_some() {
            Capability::LabelWithProbability
        } else {
            Capability::LabelOnly
        }
    }

    fn predict(&mut self, frame: &Frame) -> Result<Vec<Label>, InferenceError> {
        let inputs = self.feed(frame)?;
        let results = self.session.run(inputs)?;
        extract_labels(&results[self.outputs.label.as_str()])
    }

    fn predict_proba(&mut self, frame: &Frame) -> Result<ArrayD<f64>, InferenceError> {
        let name = self.outputs.probability.clone().ok_or_else(|| {
            InferenceError::UnsupportedModel("model has no probability output".to_string())
        })?;
        let inputs = self.feed(frame)?;
        let results = self.session.run(inputs)?;
        extract_probabilities(&results[name.as_str()])
    }
}

pub(crate) fn input_layout(inputs: &[InputSpec]) -> Result<InputLayout, InferenceError> {
    let mut columns = Vec::with_capacity(inputs.len());
    for input in inputs {
        let kind = input.kind.ok_or_else(|| {
            InferenceError::UnsupportedModel(format!(
                "input '{}' is not a float32, int64 or string tensor",
                input.name
            ))
        })?;
        columns.push(ColumnInput {
            name: input.name.clone(),
            kind,
        });
    }

    match inputs {
        [] => Err(InferenceError::UnsupportedModel(
            "model declares no inputs".to_string(),
        )),
        [single] if single.kind == Some(InputKind::Float) => Ok(InputLayout::Matrix {
            name: single.name.clone(),
            width: single.width,
        }),
        _ => Ok(InputLayout::Columns(columns)),
    }
}

/// Coerces the frame into the tensors `layout` asks for. Only float inputs
/// go through the NaN-for-missing float coercion.
pub(crate) fn feed_inputs(
    layout: &InputLayout,
    frame: &Frame,
) -> Result<Vec<(String, FeedTensor)>, InferenceError> {
    match layout {
        InputLayout::Matrix { name, width } => {
            let matrix = frame.to_matrix()?;
            if let Some(width) = *width {
                if width != matrix.ncols() {
                    return Err(InferenceError::ShapeMismatch {
                        expected: vec![matrix.nrows(), width],
                        got: matrix.shape().to_vec(),
                    });
                }
            }
            Ok(vec![(name.clone(), FeedTensor::Float(matrix))])
        }
        InputLayout::Columns(inputs) => inputs
            .iter()
            .map(|input| -> Result<(String, FeedTensor), InferenceError> {
                let index = frame
                    .column_index(&input.name)
                    .ok_or_else(|| InferenceError::MissingColumn(input.name.clone()))?;
                let tensor = match input.kind {
                    InputKind::Float => FeedTensor::Float(frame.column_array(index, coerce_cell)?),
                    InputKind::Int64 => {
                        FeedTensor::Int64(frame.column_array(index, coerce_int_cell)?)
                    }
                    InputKind::Text => {
                        FeedTensor::Text(frame.column_array(index, coerce_text_cell)?)
                    }
                };
                Ok((input.name.clone(), tensor))
            })
            .collect(),
    }
}

/// Picks the label output (`label`, else the first) and the probability
/// output (`probabilities`/`probability`, else the next remaining one).
pub(crate) fn select_outputs(outputs: &[OutputSpec]) -> Result<OutputSelection, InferenceError> {
    let label = outputs
        .iter()
        .find(|output| output.name == LABEL_OUTPUT)
        .or_else(|| outputs.first())
        .ok_or_else(|| InferenceError::UnsupportedModel("model declares no outputs".to_string()))?;
    if !label.is_tensor {
        return Err(InferenceError::UnsupportedModel(format!(
            "label output '{}' is not a tensor",
            label.name
        )));
    }

    let probability = outputs
        .iter()
        .find(|output| PROBABILITY_OUTPUTS.contains(&output.name.as_str()))
        .or_else(|| outputs.iter().find(|output| output.name != label.name));
    if let Some(output) = probability {
        if !output.is_tensor {
            return Err(InferenceError::UnsupportedModel(format!(
                "probability output '{}' is not a tensor; export the pipeline with ZipMap disabled",
                output.name
            )));
        }
    }

    Ok(OutputSelection {
        label: label.name.clone(),
        probability: probability.map(|output| output.name.clone()),
    })
}

fn extract_labels(value: &DynValue) -> Result<Vec<Label>, InferenceError> {
    if let Ok((_, data)) = value.try_extract_tensor::<i64>() {
        return Ok(data.iter().map(|&v| Label::Int(v)).collect());
    }
    if let Ok((_, data)) = value.try_extract_tensor::<i32>() {
        return Ok(data.iter().map(|&v| Label::Int(i64::from(v))).collect());
    }
    if let Ok((_, data)) = value.try_extract_tensor::<bool>() {
        return Ok(data.iter().map(|&v| Label::Bool(v)).collect());
    }
    if let Ok((_, data)) = value.try_extract_tensor::<f32>() {
        return Ok(data.iter().map(|&v| Label::Float(f64::from(v))).collect());
    }
    if let Ok((_, data)) = value.try_extract_tensor::<f64>() {
        return Ok(data.iter().map(|&v| Label::Float(v)).collect());
    }
    let (_, data) = value.try_extract_strings().map_err(|e| {
        InferenceError::UnsupportedModel(format!("label output has an unsupported type: {e}"))
    })?;
    Ok(data.into_iter().map(Label::Text).collect())
}

fn extract_probabilities(value: &DynValue) -> Result<ArrayD<f64>, InferenceError> {
    if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
        return to_array(shape, data.iter().map(|&p| f64::from(p)).collect());
    }
    let (shape, data) = value.try_extract_tensor::<f64>().map_err(|e| {
        InferenceError::UnsupportedModel(format!(
            "probability output has an unsupported type: {e}"
        ))
    })?;
    to_array(shape, data.to_vec())
}

fn to_array(shape: &[i64], data: Vec<f64>) -> Result<ArrayD<f64>, InferenceError> {
    let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
    Ok(ArrayD::from_shape_vec(IxDyn(&dims), data)?)
}

//! Batch inference and label normalization.

use crate::error::InferenceError;
use crate::model::{Capability, Classifier, Label};
use crate::preprocessing::Frame;
use ndarray::{ArrayD, Axis};
use serde::Serialize;
use tracing::debug;

const TRUTHY_LABELS: [&str; 3] = ["true", "1", "yes"];

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: i64,
    pub prob: Option<f64>,
}

impl Label {
    /// Integer and boolean labels are cast directly. Everything else is
    /// stringified and maps to 1 only for "true", "1" or "yes"
    /// (case-insensitive); any other text, including "false", is 0.
    pub fn coerce(&self) -> i64 {
        match self {
            Label::Int(value) => *value,
            Label::Bool(flag) => i64::from(*flag),
            Label::Float(value) => truthy(&format!("{value:?}")),
            Label::Text(text) => truthy(text),
        }
    }
}

fn truthy(text: &str) -> i64 {
    let lowered = text.to_lowercase();
    i64::from(TRUTHY_LABELS.contains(&lowered.as_str()))
}

/// Positive-class probability per row: column 1 of a `[rows, classes]`
/// output with at least two classes, otherwise the entries themselves.
pub fn positive_class(proba: &ArrayD<f64>) -> Vec<f64> {
    if proba.ndim() == 2 && proba.shape()[1] >= 2 {
        proba.index_axis(Axis(1), 1).iter().copied().collect()
    } else {
        proba.iter().copied().collect()
    }
}

/// Runs the model over the whole frame and pairs each label with its
/// probability. The model's capability decides whether probabilities are
/// requested at all.
pub fn predict_batch<C>(model: &mut C, frame: &Frame) -> Result<Vec<Prediction>, InferenceError>
where
    C: Classifier + ?Sized,
{
    let capability = model.capability();
    debug!(rows = frame.len(), ?capability, "running inference");

    let (labels, probs) = match capability {
        Capability::LabelWithProbability => {
            let probs = positive_class(&model.predict_proba(frame)?);
            let labels = model.predict(frame)?;
            (labels, probs.into_iter().map(Some).collect::<Vec<_>>())
        }
        Capability::LabelOnly => {
            let labels = model.predict(frame)?;
            let probs = vec![None; labels.len()];
            (labels, probs)
        }
    };

    if labels.len() != frame.len() {
        return Err(InferenceError::ShapeMismatch {
            expected: vec![frame.len()],
            got: vec![labels.len()],
        });
    }
    if probs.len() != labels.len() {
        return Err(InferenceError::ShapeMismatch {
            expected: vec![labels.len()],
            got: vec![probs.len()],
        });
    }

    Ok(labels
        .iter()
        .zip(probs)
        .map(|(label, prob)| Prediction {
            label: label.coerce(),
            prob,
        })
        .collect())
}

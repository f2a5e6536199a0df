use ndarray::ShapeError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Missing ML dependencies ({}). Please install: {}", .failures.join("; "), .install.join(", "))]
    MissingDependencies {
        failures: Vec<String>,
        install: Vec<String>,
    },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Failed to load model {path}: {source}")]
    ModelLoad {
        path: String,
        #[source]
        source: ort::Error,
    },

    #[error("ONNX Runtime error: {0}")]
    OrtError(#[from] ort::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("Payload must include 'rows': [ {{...}}, ... ]")]
    MissingRows,

    #[error("Row {0} is not a JSON object")]
    InvalidRow(usize),

    #[error("Invalid value for column '{column}' in row {row}: {value}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Missing column for model input '{0}'")]
    MissingColumn(String),

    #[error("Input shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("Shape error: {0}")]
    ShapeError(#[from] ShapeError),
}

/// Body written to stdout when a request fails.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<&InferenceError> for ErrorResponse {
    fn from(err: &InferenceError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

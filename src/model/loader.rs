use super::onnx::OnnxPipeline;
use crate::config::SessionConfig;
use crate::error::InferenceError;
use ort::session::Session;
use std::path::Path;
use tracing::{debug, info};

/// A runtime component the pipeline needs before anything is loaded.
pub struct Requirement {
    pub name: &'static str,
    pub check: fn() -> Result<(), String>,
}

/// Native ONNX Runtime: the shared library loads and can hand out a session
/// builder.
pub const RUNTIME_REQUIREMENTS: &[Requirement] = &[Requirement {
    name: "onnxruntime",
    check: check_onnxruntime,
}];

fn check_onnxruntime() -> Result<(), String> {
    Session::builder().map(|_| ()).map_err(|e| e.to_string())
}

/// Runs every requirement and reports all failures at once.
pub fn check_requirements(requirements: &[Requirement]) -> Result<(), InferenceError> {
    let failed: Vec<(&'static str, String)> = requirements
        .iter()
        .filter_map(|req| (req.check)().err().map(|reason| (req.name, reason)))
        .collect();

    if failed.is_empty() {
        return Ok(());
    }
    Err(InferenceError::MissingDependencies {
        failures: failed
            .iter()
            .map(|(name, reason)| format!("{name}: {reason}"))
            .collect(),
        install: requirements.iter().map(|req| req.name.to_string()).collect(),
    })
}

pub fn ensure_dependencies() -> Result<(), InferenceError> {
    check_requirements(RUNTIME_REQUIREMENTS)?;
    debug!("runtime requirements satisfied");
    Ok(())
}

/// Loads an ONNX pipeline from disk and creates an inference session.
///
/// # Arguments
/// * `model_path` - Path to the .onnx file
/// * `options` - Session optimization level and thread count
pub fn load_model(
    model_path: impl AsRef<Path>,
    options: &SessionConfig,
) -> Result<OnnxPipeline, InferenceError> {
    let path = model_path.as_ref();
    if !path.exists() {
        return Err(InferenceError::ModelNotFound(path.display().to_string()));
    }

    let session = Session::builder()?
        .with_optimization_level(options.optimization_level.into())?
        .with_intra_threads(options.intra_threads)?
        .commit_from_file(path)
        .map_err(|source| InferenceError::ModelLoad {
            path: path.display().to_string(),
            source,
        })?;

    info!(path = %path.display(), "loaded model");
    for (i, input) in session.inputs.iter().enumerate() {
        debug!("  input {}: {} ({:?})", i, input.name, input.input_type);
    }
    for (i, output) in session.outputs.iter().enumerate() {
        debug!("  output {}: {} ({:?})", i, output.name, output.output_type);
    }

    OnnxPipeline::from_session(session, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn ok() -> Result<(), String> {
        Ok(())
    }

    fn missing_library() -> Result<(), String> {
        Err("library not found".to_string())
    }

    fn missing_operators() -> Result<(), String> {
        Err("ai.onnx.ml not registered".to_string())
    }

    #[test]
    fn test_requirements_all_present() {
        let requirements = [Requirement {
            name: "present",
            check: ok,
        }];
        assert!(check_requirements(&requirements).is_ok());
    }

    #[test]
    fn test_requirements_report_every_failure() {
        let requirements = [
            Requirement {
                name: "onnxruntime",
                check: missing_library,
            },
            Requirement {
                name: "present",
                check: ok,
            },
            Requirement {
                name: "onnx-ml",
                check: missing_operators,
            },
        ];
        match check_requirements(&requirements) {
            Err(InferenceError::MissingDependencies { failures, install }) => {
                assert_eq!(
                    failures,
                    vec![
                        "onnxruntime: library not found".to_string(),
                        "onnx-ml: ai.onnx.ml not registered".to_string(),
                    ]
                );
                assert_eq!(install, vec!["onnxruntime", "present", "onnx-ml"]);
            }
            other => panic!("Expected MissingDependencies, got {other:?}"),
        }
    }

    #[test]
    fn test_load_model_nonexistent_file() {
        let result = load_model("nonexistent_model.onnx", &SessionConfig::default());
        match result {
            Err(InferenceError::ModelNotFound(path)) => assert_eq!(path, "nonexistent_model.onnx"),
            other => panic!("Expected ModelNotFound error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_model_corrupt_file_is_not_not_found() {
        // An empty file exists but is not a valid ONNX graph.
        let temp_file = NamedTempFile::new().unwrap();
        match load_model(temp_file.path(), &SessionConfig::default()) {
            Err(InferenceError::ModelLoad { path, .. }) => {
                assert_eq!(path, temp_file.path().display().to_string());
            }
            // Runtime unavailable in this environment.
            Err(InferenceError::OrtError(_)) => {}
            other => panic!("Expected a load failure, got {other:?}"),
        }
    }
}

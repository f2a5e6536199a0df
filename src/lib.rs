pub mod bridge;
pub mod config;
pub mod error;
pub mod inference;
pub mod model;
pub mod preprocessing;

#[cfg(test)]
mod integration_tests;

// Re-export common types
pub use error::{ErrorResponse, InferenceError};
pub use model::{Capability, Classifier, Label};
pub use preprocessing::Frame;

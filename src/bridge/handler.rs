use crate::bridge::types::{PredictRequest, PredictResponse};
use crate::error::InferenceError;
use crate::inference::predict_batch;
use crate::model::Classifier;
use crate::preprocessing::Frame;
use std::time::Instant;
use tracing::debug;

/// Handles one stdin payload end to end: parse, build the frame, infer and
/// assemble the response. Fails as a whole; no partial response.
pub fn predict<C>(
    model: &mut C,
    payload: &str,
    feature_order: Option<&[String]>,
) -> Result<PredictResponse, InferenceError>
where
    C: Classifier + ?Sized,
{
    let request = PredictRequest::parse(payload)?;
    let frame = Frame::from_records(&request.rows, feature_order)?;

    let start = Instant::now();
    let predictions = predict_batch(model, &frame)?;
    debug!(
        rows = frame.len(),
        inference_time_ms = start.elapsed().as_secs_f64() * 1000.0,
        "batch predicted"
    );

    Ok(PredictResponse {
        predictions,
        columns: frame.columns().to_vec(),
    })
}

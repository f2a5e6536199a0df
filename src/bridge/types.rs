use crate::error::InferenceError;
use crate::inference::Prediction;
use serde::Serialize;
use serde_json::Value;

/// Request read from stdin: `{"rows": [{...}, ...]}`.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictRequest {
    pub rows: Vec<Value>,
}

impl PredictRequest {
    /// Parses the raw stdin payload. Empty input counts as `{}`, so it fails
    /// on the missing `rows` rather than on JSON syntax.
    pub fn parse(payload: &str) -> Result<Self, InferenceError> {
        let payload = if payload.is_empty() { "{}" } else { payload };
        let mut body: Value = serde_json::from_str(payload)?;

        match body.get_mut("rows").map(Value::take) {
            Some(Value::Array(rows)) if !rows.is_empty() => Ok(Self { rows }),
            _ => Err(InferenceError::MissingRows),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PredictResponse {
    pub predictions: Vec<Prediction>,
    pub columns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_missing_rows(payload: &str) {
        match PredictRequest::parse(payload) {
            Err(InferenceError::MissingRows) => {}
            other => panic!("Expected MissingRows for {payload:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rows() {
        let request = PredictRequest::parse(r#"{"rows":[{"f1":1.0},{"f1":2.0}]}"#).unwrap();
        assert_eq!(request.rows.len(), 2);
        assert_eq!(request.rows[1]["f1"], 2.0);
    }

    #[test]
    fn test_rows_missing() {
        assert_missing_rows(r#"{"input":{"f1":1.0}}"#);
    }

    #[test]
    fn test_rows_not_a_list() {
        assert_missing_rows(r#"{"rows":"f1=1.0"}"#);
        assert_missing_rows(r#"{"rows":{"f1":1.0}}"#);
        assert_missing_rows(r#"{"rows":null}"#);
    }

    #[test]
    fn test_rows_empty() {
        assert_missing_rows(r#"{"rows":[]}"#);
    }

    #[test]
    fn test_empty_input_is_empty_object() {
        assert_missing_rows("");
    }

    #[test]
    fn test_whitespace_input_is_invalid_json() {
        match PredictRequest::parse(" \n") {
            Err(InferenceError::InvalidPayload(_)) => {}
            other => panic!("Expected InvalidPayload, got {other:?}"),
        }
    }

    #[test]
    fn test_non_object_payload() {
        assert_missing_rows("[1, 2, 3]");
    }

    #[test]
    fn test_invalid_json() {
        match PredictRequest::parse("{rows:") {
            Err(InferenceError::InvalidPayload(_)) => {}
            other => panic!("Expected InvalidPayload, got {other:?}"),
        }
    }
}

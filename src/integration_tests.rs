#[cfg(test)]
mod end_to_end_tests {
    use crate::{
        bridge::handler,
        config::parse_feature_order,
        error::{ErrorResponse, InferenceError},
        inference::tests::FixedClassifier,
        model::Label,
    };
    use ndarray::arr2;
    use serde_json::{json, Value};

    fn respond(
        model: &mut FixedClassifier,
        payload: &str,
        feature_order: Option<&[String]>,
    ) -> Value {
        match handler::predict(model, payload, feature_order) {
            Ok(response) => serde_json::to_value(response).unwrap(),
            Err(err) => serde_json::to_value(ErrorResponse::from(&err)).unwrap(),
        }
    }

    #[test]
    fn test_full_request_flow() {
        let mut model = FixedClassifier::new(
            vec![Label::Int(1)],
            Some(arr2(&[[0.2, 0.8]]).into_dyn()),
        );
        let response =
            handler::predict(&mut model, r#"{"rows":[{"f1":1.0,"f2":2.0}]}"#, None).unwrap();

        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"predictions":[{"label":1,"prob":0.8}],"columns":["f1","f2"]}"#
        );
    }

    #[test]
    fn test_predictions_follow_row_order() {
        let mut model = FixedClassifier::new(
            vec![Label::Int(0), Label::Int(1), Label::Int(0)],
            Some(arr2(&[[0.9, 0.1], [0.3, 0.7], [0.6, 0.4]]).into_dyn()),
        );
        let payload = r#"{"rows":[{"a":1},{"a":2,"b":3},{"c":4}]}"#;
        let body = respond(&mut model, payload, None);

        assert_eq!(body["predictions"].as_array().unwrap().len(), 3);
        assert_eq!(body["predictions"][1], json!({"label": 1, "prob": 0.7}));
        assert_eq!(body["columns"], json!(["a", "b", "c"]));
    }

    #[test]
    fn test_feature_order_shapes_columns() {
        let mut model = FixedClassifier::new(vec![Label::Text("yes".to_string())], None);
        let order = parse_feature_order("transit_depth_pct, orbital_period_days").unwrap();
        let payload = r#"{"rows":[{"orbital_period_days":3.5,"koi_score":0.9}]}"#;
        let body = respond(&mut model, payload, Some(&order));

        assert_eq!(
            body,
            json!({
                "predictions": [{"label": 1, "prob": null}],
                "columns": ["transit_depth_pct", "orbital_period_days"]
            })
        );
    }

    #[test]
    fn test_invalid_requests_yield_only_error() {
        for payload in [
            r#"{"data":[{"a":1}]}"#,
            r#"{"rows":"a=1"}"#,
            r#"{"rows":{"a":1}}"#,
            r#"{"rows":[]}"#,
            "",
            "not json",
        ] {
            let mut model = FixedClassifier::new(vec![Label::Int(1)], None);
            let body = respond(&mut model, payload, None);
            let object = body.as_object().unwrap();

            assert_eq!(object.len(), 1, "payload {payload:?}");
            assert!(object["error"].is_string());
            assert!(!object.contains_key("predictions"));
        }
    }

    #[test]
    fn test_inference_error_aborts_whole_batch() {
        let mut model = FixedClassifier::new(vec![Label::Int(1)], None);
        let result = handler::predict(&mut model, r#"{"rows":[{"a":1},{"a":2}]}"#, None);
        match result {
            Err(InferenceError::ShapeMismatch { .. }) => {}
            other => panic!("Expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_non_object_row_is_error() {
        let mut model = FixedClassifier::new(vec![Label::Int(1)], None);
        let body = respond(&mut model, r#"{"rows":[42]}"#, None);
        assert_eq!(body, json!({"error": "Row 0 is not a JSON object"}));
    }
}

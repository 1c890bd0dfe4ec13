//! Fill-mask output shapes.

use codenat_common::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One proposed surface string with its model score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub token_str: String,
    pub score: f64,
}

impl Prediction {
    pub fn new(token_str: impl Into<String>, score: f64) -> Self {
        Self { token_str: token_str.into(), score }
    }

    /// Surface string with the tokenizer's leading-space marker removed.
    pub fn surface(&self) -> &str {
        self.token_str.trim()
    }
}

/// Output of a fill-mask query.
///
/// A context with one placeholder yields a single ranked list. A context
/// whose masked region spans several positions yields one ranked list per
/// position.
#[derive(Debug, Clone, PartialEq)]
pub enum MaskPredictions {
    Flat(Vec<Prediction>),
    Nested(Vec<Vec<Prediction>>),
}

impl MaskPredictions {
    /// Classify a JSON predictions payload by its structure.
    ///
    /// A list of objects is [`MaskPredictions::Flat`]; a list of lists is
    /// [`MaskPredictions::Nested`]. Anything else is an
    /// [`PipelineError::OracleShapeMismatch`].
    pub fn from_json(value: &Value) -> Result<Self> {
        let Value::Array(items) = value else {
            return Err(PipelineError::OracleShapeMismatch(format!(
                "expected a list of predictions, got {}",
                kind_of(value)
            )));
        };

        match items.first() {
            None => Ok(Self::Flat(Vec::new())),
            Some(Value::Object(_)) => items
                .iter()
                .map(parse_prediction)
                .collect::<Result<Vec<_>>>()
                .map(Self::Flat),
            Some(Value::Array(_)) => items
                .iter()
                .map(|position| match position {
                    Value::Array(inner) => {
                        inner.iter().map(parse_prediction).collect::<Result<Vec<_>>>()
                    }
                    other => Err(PipelineError::OracleShapeMismatch(format!(
                        "nested predictions mix lists with {}",
                        kind_of(other)
                    ))),
                })
                .collect::<Result<Vec<_>>>()
                .map(Self::Nested),
            Some(other) => Err(PipelineError::OracleShapeMismatch(format!(
                "prediction entries must be objects or lists, got {}",
                kind_of(other)
            ))),
        }
    }

    /// Number of masked positions covered.
    pub fn positions(&self) -> usize {
        match self {
            Self::Flat(_) => 1,
            Self::Nested(lists) => lists.len(),
        }
    }
}

fn parse_prediction(value: &Value) -> Result<Prediction> {
    Prediction::deserialize(value)
        .map_err(|e| PipelineError::OracleShapeMismatch(format!("malformed prediction: {e}")))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_of_objects_is_flat() {
        let value = json!([
            {"token_str": " foo", "score": 0.9, "token": 42, "sequence": "int foo"},
            {"token_str": "bar", "score": 0.1}
        ]);
        let predictions = MaskPredictions::from_json(&value).unwrap();
        assert_eq!(
            predictions,
            MaskPredictions::Flat(vec![Prediction::new(" foo", 0.9), Prediction::new("bar", 0.1)])
        );
        assert_eq!(predictions.positions(), 1);
    }

    #[test]
    fn list_of_lists_is_nested() {
        let value = json!([
            [{"token_str": "a", "score": 0.5}],
            [{"token_str": "b", "score": 0.4}, {"token_str": "a", "score": 0.2}]
        ]);
        let predictions = MaskPredictions::from_json(&value).unwrap();
        assert!(matches!(&predictions, MaskPredictions::Nested(lists) if lists.len() == 2));
        assert_eq!(predictions.positions(), 2);
    }

    #[test]
    fn empty_list_is_empty_flat() {
        assert_eq!(MaskPredictions::from_json(&json!([])).unwrap(), MaskPredictions::Flat(vec![]));
    }

    #[test]
    fn scalars_are_shape_mismatches() {
        for value in [json!(3), json!("x"), json!([1, 2]), json!({"token_str": "a"})] {
            assert!(matches!(
                MaskPredictions::from_json(&value),
                Err(PipelineError::OracleShapeMismatch(_))
            ));
        }
    }

    #[test]
    fn mixed_nesting_is_a_shape_mismatch() {
        let value = json!([[{"token_str": "a", "score": 0.5}], {"token_str": "b", "score": 0.4}]);
        assert!(matches!(
            MaskPredictions::from_json(&value),
            Err(PipelineError::OracleShapeMismatch(msg)) if msg.contains("mix")
        ));
    }

    #[test]
    fn surface_trims_whitespace() {
        assert_eq!(Prediction::new(" count ", 1.0).surface(), "count");
    }
}

//! Boundary parsing for loosely shaped query inputs.
//!
//! Dataset rows and API payloads may carry the question as a plain string,
//! as `{"question": ...}`, or nested under `input`. Everything is normalized
//! into [`QueryRequest`] here so the engine only ever sees one shape.

use serde_json::Value;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    question: String,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Result<Self> {
        let question = question.into();
        let trimmed = question.trim();
        if trimmed.is_empty() || trimmed == "{}" {
            return Err(Error::InvalidRequest("empty question".into()));
        }
        Ok(Self { question: trimmed.to_string() })
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Self::new(s.as_str()),
            Value::Object(map) => {
                if let Some(q) = map.get("question") {
                    Self::from_value(q)
                } else if let Some(input) = map.get("input") {
                    Self::from_value(input)
                } else {
                    Err(Error::InvalidRequest("object has no 'question' or 'input' field".into()))
                }
            }
            Value::Null => Err(Error::InvalidRequest("missing question".into())),
            other => Err(Error::InvalidRequest(format!("unsupported question shape: {}", other))),
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }
}

/// One evaluation dataset row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalCase {
    pub request: QueryRequest,
    pub ground_truth: Option<String>,
}

impl EvalCase {
    pub fn from_value(row: &Value) -> Result<Self> {
        let input = match row {
            Value::Object(map) => map
                .get("input")
                .filter(|v| !is_blank(v))
                .or_else(|| map.get("question"))
                .unwrap_or(&Value::Null),
            other => other,
        };
        let request = QueryRequest::from_value(input)?;
        let ground_truth = row.get("output").and_then(ground_truth_text);
        Ok(Self { request, ground_truth })
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn ground_truth_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => match map.get("output") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(v) => ground_truth_text(v),
            None => Some(value.to_string()),
        },
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_plain_and_nested_shapes() {
        let want = QueryRequest::new("What PPE is needed?").expect("valid");
        for v in [
            json!("What PPE is needed?"),
            json!({"question": "What PPE is needed?"}),
            json!({"input": "What PPE is needed?"}),
            json!({"input": {"question": "  What PPE is needed?  "}}),
        ] {
            assert_eq!(QueryRequest::from_value(&v).expect("parse"), want);
        }
    }

    #[test]
    fn rejects_blank_and_unknown_shapes() {
        for v in [json!(""), json!("   "), json!("{}"), json!({}), json!(null), json!(42), json!({"input": {}})] {
            assert!(matches!(QueryRequest::from_value(&v), Err(Error::InvalidRequest(_))), "{v}");
        }
    }

    #[test]
    fn eval_row_ground_truth_variants() {
        let row = json!({"input": {"question": "q1"}, "output": {"output": "a1"}});
        let case = EvalCase::from_value(&row).expect("row");
        assert_eq!(case.request.question(), "q1");
        assert_eq!(case.ground_truth.as_deref(), Some("a1"));

        let row = json!({"question": "q2", "output": "a2"});
        assert_eq!(EvalCase::from_value(&row).expect("row").ground_truth.as_deref(), Some("a2"));

        let row = json!({"question": "q3"});
        assert_eq!(EvalCase::from_value(&row).expect("row").ground_truth, None);
    }

    #[test]
    fn eval_row_falls_back_to_question_when_input_is_empty() {
        for row in [
            json!({"input": null, "question": "q"}),
            json!({"input": "", "question": "q"}),
            json!({"input": "  ", "question": "q"}),
            json!({"input": {}, "question": "q"}),
        ] {
            assert_eq!(EvalCase::from_value(&row).expect("row").request.question(), "q", "{row}");
        }
        assert!(EvalCase::from_value(&json!({"input": null})).is_err());
    }
}

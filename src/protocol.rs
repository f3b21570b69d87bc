//! Request and response records exchanged with the interpreter
//! service. All bodies are JSON.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Variable snapshot: name to JSON value, ordered by name.
pub type Variables = BTreeMap<String, serde_json::Value>;

/// Message the service sends once a stepped run has nothing left.
pub const EXECUTION_COMPLETED: &str = "Execution completed";

#[derive(Debug, Clone, Serialize)]
pub struct ProgramRequest<'a> {
    pub pseudocode: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveSnippetRequest<'a> {
    pub name: &'a str,
    pub code: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterpretResponse {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    /// Variable snapshot after each statement. Absent unless the
    /// service traces batch runs.
    #[serde(default)]
    pub snapshots: Option<Vec<Variables>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExampleResponse {
    pub example: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AckResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnippetListResponse {
    pub snippets: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnippetResponse {
    pub code: String,
}

/// The statement a step executed: either its source text or its
/// index, depending on the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepLine {
    Index(usize),
    Source(String),
}

impl fmt::Display for StepLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Source(s) => f.write_str(s),
        }
    }
}

/// One executed statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub line: StepLine,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub variables: Variables,
}

/// Body of a `next_step` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StepResponse {
    Step(StepRecord),
    Message { message: String },
}

/// Decoded result of a `next_step` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepReply {
    Step(StepRecord),
    Completed,
}

/// Body of a `test_consistency` response, as computed by the
/// service itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConsistency {
    #[serde(default)]
    pub full_result: Option<String>,
    #[serde(default)]
    pub step_result: Option<String>,
    pub consistency: ServerReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerReport {
    pub output_match: bool,
    pub variable_match: bool,
    #[serde(default)]
    pub error_match: Option<bool>,
    #[serde(default)]
    pub output_diff: Vec<serde_json::Value>,
    #[serde(default)]
    pub variable_diffs: Vec<serde_json::Value>,
    #[serde(default)]
    pub full_error: Option<String>,
    #[serde(default)]
    pub step_error: Option<String>,
    /// Final variables of each run. The service compares only these.
    #[serde(default)]
    pub full_variables: Option<Variables>,
    #[serde(default)]
    pub step_variables: Option<Variables>,
}

impl ServerReport {
    /// Overall verdict; a missing `error_match` counts as a match.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.output_match && self.variable_match && self.error_match.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_step_record() {
        let body = r#"{"line": "PRINT i", "output": "1", "variables": {"i": 1}}"#;
        let step: StepResponse = serde_json::from_str(body).expect("decode");
        let StepResponse::Step(record) = step else {
            panic!("expected step");
        };
        assert_eq!(record.line, StepLine::Source("PRINT i".to_string()));
        assert_eq!(record.output.as_deref(), Some("1"));
        assert_eq!(record.variables["i"], serde_json::json!(1));
    }

    #[test]
    fn decode_step_with_null_output_and_index_line() {
        let body = r#"{"line": 3, "output": null, "variables": {}}"#;
        let step: StepResponse = serde_json::from_str(body).expect("decode");
        assert!(matches!(
            step,
            StepResponse::Step(StepRecord {
                line: StepLine::Index(3),
                output: None,
                ..
            })
        ));
    }

    #[test]
    fn decode_completion() {
        let step: StepResponse =
            serde_json::from_str(r#"{"message": "Execution completed"}"#).expect("decode");
        assert!(matches!(step, StepResponse::Message { message } if message == EXECUTION_COMPLETED));
    }

    #[test]
    fn decode_interpret_without_snapshots() {
        let resp: InterpretResponse =
            serde_json::from_str(r#"{"result": "1\n2", "error": null}"#).expect("decode");
        assert_eq!(resp.result.as_deref(), Some("1\n2"));
        assert_eq!(resp.snapshots, None);
    }

    #[test]
    fn decode_interpret_with_empty_trace() {
        let resp: InterpretResponse =
            serde_json::from_str(r#"{"result": "", "snapshots": []}"#).expect("decode");
        assert_eq!(resp.snapshots, Some(Vec::new()));
    }

    #[test]
    fn encode_program_request() {
        let body = serde_json::to_string(&ProgramRequest { pseudocode: "PRINT 1" }).expect("encode");
        assert_eq!(body, r#"{"pseudocode":"PRINT 1"}"#);
    }

    #[test]
    fn server_report_without_error_match() {
        let body = r#"{
            "full_result": "1",
            "step_result": "1",
            "consistency": {"output_match": true, "variable_match": true}
        }"#;
        let resp: ServerConsistency = serde_json::from_str(body).expect("decode");
        assert!(resp.consistency.is_consistent());
    }

    #[test]
    fn server_report_with_final_variables() {
        let body = r#"{
            "full_result": null,
            "step_result": "1\n2",
            "consistency": {
                "output_match": false,
                "variable_match": true,
                "full_output": ["1", "2"],
                "step_output": [null, "1", "2"],
                "full_variables": {"i": 2},
                "step_variables": {"i": 2}
            }
        }"#;
        let resp: ServerConsistency = serde_json::from_str(body).expect("decode");
        assert!(!resp.consistency.is_consistent());
        assert_eq!(resp.consistency.full_variables, resp.consistency.step_variables);
        assert_eq!(resp.step_result.as_deref(), Some("1\n2"));
    }
}

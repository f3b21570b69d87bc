#![allow(dead_code)]

use std::collections::BTreeMap;

use pseudocode_rs::protocol::ServerConsistency;
use pseudocode_rs::{
    Interpretation, Remote, RemoteError, StepLine, StepRecord, StepReply, Variables,
};

/// In-memory stand-in for the interpreter service, replaying a
/// fixed script for every program it is given.
#[derive(Debug, Clone, Default)]
pub struct FakeRemote {
    pub batch: Option<Result<Interpretation, RemoteError>>,
    pub steps: Vec<Result<StepRecord, RemoteError>>,
    pub start_error: Option<RemoteError>,
    pub snippets: BTreeMap<String, String>,
    pub server_report: Option<ServerConsistency>,
    /// Endpoint names, in call order.
    pub calls: Vec<&'static str>,
    cursor: Option<usize>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch(mut self, output: &str, snapshots: Vec<Variables>) -> Self {
        self.batch = Some(Ok(Interpretation {
            output: output.to_string(),
            snapshots: Some(snapshots),
        }));
        self
    }

    pub fn with_batch_error(mut self, message: &str) -> Self {
        self.batch = Some(Err(RemoteError::Interpreter(message.to_string())));
        self
    }

    pub fn with_step(mut self, line: &str, output: Option<&str>, variables: Variables) -> Self {
        self.steps.push(Ok(step(line, output, variables)));
        self
    }

    pub fn with_step_error(mut self, err: RemoteError) -> Self {
        self.steps.push(Err(err));
        self
    }

    pub fn count(&self, endpoint: &str) -> usize {
        self.calls.iter().filter(|c| **c == endpoint).count()
    }

    /// Batch and stepped runs of the three-iteration FOR loop.
    pub fn counting_to_three() -> Self {
        let mut remote = Self::new().with_batch(
            "1\n2\n3",
            (1..=3).map(|i| vars(&[("i", i.into())])).collect(),
        );
        for i in 1..=3 {
            let out = i.to_string();
            remote = remote.with_step("PRINT i", Some(&out), vars(&[("i", i.into())]));
        }
        remote
    }
}

pub fn step(line: &str, output: Option<&str>, variables: Variables) -> StepRecord {
    StepRecord {
        line: StepLine::Source(line.to_string()),
        output: output.map(str::to_string),
        variables,
    }
}

pub fn vars(pairs: &[(&str, serde_json::Value)]) -> Variables {
    pairs
        .iter()
        .map(|(name, value)| ((*name).to_string(), value.clone()))
        .collect()
}

impl Remote for FakeRemote {
    fn interpret(&mut self, _program: &str) -> Result<Interpretation, RemoteError> {
        self.calls.push("interpret");
        self.batch.clone().unwrap_or_else(|| Ok(Interpretation::default()))
    }

    fn example(&mut self) -> Result<String, RemoteError> {
        self.calls.push("example");
        Ok("x = 10\nPRINT x\n".to_string())
    }

    fn start_execution(&mut self, _program: &str) -> Result<(), RemoteError> {
        self.calls.push("start_execution");
        if let Some(err) = &self.start_error {
            return Err(err.clone());
        }
        self.cursor = Some(0);
        Ok(())
    }

    fn next_step(&mut self) -> Result<StepReply, RemoteError> {
        self.calls.push("next_step");
        let Some(index) = self.cursor else {
            return Err(RemoteError::Interpreter("no execution in progress".to_string()));
        };
        let Some(next) = self.steps.get(index).cloned() else {
            return Ok(StepReply::Completed);
        };
        self.cursor = Some(index + 1);
        next.map(StepReply::Step)
    }

    fn save_snippet(&mut self, name: &str, code: &str) -> Result<(), RemoteError> {
        self.calls.push("save_snippet");
        if name.is_empty() || code.is_empty() {
            return Err(RemoteError::Interpreter(
                "Name and code are required".to_string(),
            ));
        }
        self.snippets.insert(name.to_string(), code.to_string());
        Ok(())
    }

    fn list_snippets(&mut self) -> Result<Vec<String>, RemoteError> {
        self.calls.push("list_snippets");
        Ok(self.snippets.keys().cloned().collect())
    }

    fn load_snippet(&mut self, name: &str) -> Result<String, RemoteError> {
        self.calls.push("load_snippet");
        self.snippets
            .get(name)
            .cloned()
            .ok_or_else(|| RemoteError::Interpreter("Snippet not found".to_string()))
    }

    fn test_consistency(&mut self, _program: &str) -> Result<ServerConsistency, RemoteError> {
        self.calls.push("test_consistency");
        self.server_report
            .clone()
            .ok_or_else(|| RemoteError::Transport("not scripted".to_string()))
    }
}

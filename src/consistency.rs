//! Check that a batch run and a stepped run of a program agree.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::protocol::Variables;
use crate::remote::{Remote, RemoteError};
use crate::session::{ExecutionClient, Outcome, SessionError};

/// Which of the two runs a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Run {
    Batch,
    Stepped,
}

/// Observable result of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTrace {
    pub output: Vec<String>,
    /// Variable snapshot after each statement, `None` when the run
    /// was not traced.
    pub snapshots: Option<Vec<Variables>>,
    pub error: Option<String>,
}

/// A differing output line. `None` means that run has no such line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineDiff {
    pub line: usize,
    pub batch: Option<String>,
    pub stepped: Option<String>,
}

/// A variable whose value differs at some step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableDifference {
    pub name: String,
    pub batch: Option<serde_json::Value>,
    pub stepped: Option<serde_json::Value>,
}

/// Every variable difference at one step index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepDiff {
    pub step: usize,
    /// Set when only one run reached this step.
    pub missing_in: Option<Run>,
    pub differences: Vec<VariableDifference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    pub outputs_match: bool,
    pub variables_match: bool,
    /// False when one run had no trace, so `variables_match` holds
    /// vacuously.
    pub variables_compared: bool,
    pub errors_match: bool,
    pub output_diff: Vec<LineDiff>,
    pub variable_diffs: Vec<StepDiff>,
    pub full_error: Option<String>,
    pub step_error: Option<String>,
}

impl ConsistencyReport {
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.outputs_match && self.variables_match && self.errors_match
    }
}

/// Run `program` both ways against `remote` and compare.
///
/// Interpreter errors are part of each trace; transport and
/// protocol failures abort the check.
pub fn check<R: Remote + ?Sized>(
    remote: &mut R,
    program: &str,
    max_steps: usize,
) -> Result<ConsistencyReport, RemoteError> {
    let batch = batch_trace(remote, program)?;
    let stepped = stepped_trace(remote, program, max_steps)?;
    let report = compare(&batch, &stepped);
    debug!(
        outputs = report.outputs_match,
        variables = report.variables_match,
        errors = report.errors_match,
        "consistency check finished"
    );
    Ok(report)
}

fn batch_trace<R: Remote + ?Sized>(remote: &mut R, program: &str) -> Result<RunTrace, RemoteError> {
    match remote.interpret(program) {
        Ok(run) => Ok(RunTrace {
            output: run.output.lines().map(str::to_string).collect(),
            snapshots: run.snapshots,
            error: None,
        }),
        Err(RemoteError::Interpreter(message)) => Ok(RunTrace {
            error: Some(message),
            ..RunTrace::default()
        }),
        Err(err) => Err(err),
    }
}

fn stepped_trace<R: Remote + ?Sized>(
    remote: &mut R,
    program: &str,
    max_steps: usize,
) -> Result<RunTrace, RemoteError> {
    let mut client = ExecutionClient::new();
    let mut trace = RunTrace::default();
    let mut snapshots = Vec::new();

    if let Err(err) = client.start(remote, program) {
        trace.snapshots = Some(snapshots);
        return absorb(err, trace);
    }

    let failure = loop {
        match client.step(remote) {
            Ok(Outcome::Stepped { .. }) if snapshots.len() >= max_steps => {
                warn!(max_steps, "stepped run did not complete");
                trace.error = Some(format!("step limit of {max_steps} exceeded"));
                break None;
            }
            Ok(Outcome::Stepped { .. }) => {
                snapshots.push(client.session().variables.clone());
            }
            Ok(_) => break None,
            Err(err) => break Some(err),
        }
    };

    trace.snapshots = Some(snapshots);
    trace.output.clone_from(&client.session().accumulated_output);
    match failure {
        Some(err) => absorb(err, trace),
        None => Ok(trace),
    }
}

/// Fold an interpreter error into the trace; anything else aborts.
fn absorb(err: SessionError, mut trace: RunTrace) -> Result<RunTrace, RemoteError> {
    match err {
        SessionError::Remote(RemoteError::Interpreter(message)) => {
            trace.error = Some(message);
            Ok(trace)
        }
        SessionError::Remote(err) => Err(err),
        other => Err(RemoteError::Protocol(other.to_string())),
    }
}

/// Structurally diff two traces.
#[must_use]
pub fn compare(batch: &RunTrace, stepped: &RunTrace) -> ConsistencyReport {
    let output_diff = diff_lines(&batch.output, &stepped.output);
    let traces = batch.snapshots.as_deref().zip(stepped.snapshots.as_deref());
    if traces.is_none() {
        debug!("a run was not traced, skipping variable comparison");
    }
    let variable_diffs = traces.map_or_else(Vec::new, |(b, s)| diff_snapshots(b, s));

    ConsistencyReport {
        outputs_match: output_diff.is_empty(),
        variables_match: variable_diffs.is_empty(),
        variables_compared: traces.is_some(),
        errors_match: batch.error == stepped.error,
        output_diff,
        variable_diffs,
        full_error: batch.error.clone(),
        step_error: stepped.error.clone(),
    }
}

fn diff_lines(batch: &[String], stepped: &[String]) -> Vec<LineDiff> {
    (0..batch.len().max(stepped.len()))
        .filter_map(|line| {
            let b = batch.get(line);
            let s = stepped.get(line);
            (b != s).then(|| LineDiff {
                line,
                batch: b.cloned(),
                stepped: s.cloned(),
            })
        })
        .collect()
}

fn diff_snapshots(batch: &[Variables], stepped: &[Variables]) -> Vec<StepDiff> {
    (0..batch.len().max(stepped.len()))
        .filter_map(|step| {
            let (b, s) = (batch.get(step), stepped.get(step));
            let missing_in = match (b, s) {
                (Some(_), None) => Some(Run::Stepped),
                (None, Some(_)) => Some(Run::Batch),
                _ => None,
            };
            let differences = diff_variables(b, s);
            (missing_in.is_some() || !differences.is_empty()).then_some(StepDiff {
                step,
                missing_in,
                differences,
            })
        })
        .collect()
}

fn diff_variables(batch: Option<&Variables>, stepped: Option<&Variables>) -> Vec<VariableDifference> {
    let empty = Variables::new();
    let (batch, stepped) = (batch.unwrap_or(&empty), stepped.unwrap_or(&empty));

    let names: BTreeSet<&String> = batch.keys().chain(stepped.keys()).collect();
    names
        .into_iter()
        .filter_map(|name| {
            let (b, s) = (batch.get(name), stepped.get(name));
            (b != s).then(|| VariableDifference {
                name: name.clone(),
                batch: b.cloned(),
                stepped: s.cloned(),
            })
        })
        .collect()
}

//! Client side of a stepped-execution session.
//!
//! Requests are split into `begin_*` (checks the state machine and
//! issues a [`Ticket`]) and `finish_*` (applies the response for
//! that ticket). Hosts that dispatch asynchronously hold the ticket
//! across the network call; [`ExecutionClient::start`] and
//! [`ExecutionClient::step`] do both halves for synchronous hosts.

use std::fmt;

use tracing::debug;

use crate::protocol::{StepLine, StepReply, Variables};
use crate::remote::{Remote, RemoteError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionStatus {
    Idle,
    Running,
    Completed,
    /// A step failed; terminal like `Completed`.
    Failed,
}

impl SessionStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Error returned by session operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Stepping requires a running session.
    #[error("no running session (session is {status})")]
    NotRunning { status: SessionStatus },
    /// Another request for this client is still outstanding.
    #[error("a request is already in flight")]
    Busy,
    /// The remote call failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    Start,
    Step,
}

/// Handle for an outstanding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Ticket {
    generation: u64,
    kind: RequestKind,
}

impl Ticket {
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// What applying a response did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Started,
    Stepped {
        line: StepLine,
        output: Option<String>,
    },
    Completed,
    /// The response belonged to a superseded request and was dropped.
    Stale,
}

/// Client-side mirror of the remote session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSession {
    pub status: SessionStatus,
    /// Line index of the last executed statement when the service
    /// reports one; otherwise the number of statements executed.
    pub current_line_index: usize,
    pub current_line: Option<StepLine>,
    pub variables: Variables,
    pub accumulated_output: Vec<String>,
    pub last_error: Option<String>,
}

impl ExecutionSession {
    const fn new() -> Self {
        Self {
            status: SessionStatus::Idle,
            current_line_index: 0,
            current_line: None,
            variables: Variables::new(),
            accumulated_output: Vec::new(),
            last_error: None,
        }
    }

    /// Move forward only; backwards or out of a terminal state is
    /// ignored.
    fn advance(&mut self, to: SessionStatus) {
        if self.status.is_terminal() || to < self.status {
            debug!(from = %self.status, to = %to, "ignoring backwards session transition");
            return;
        }
        debug!(from = %self.status, to = %to, "session transition");
        self.status = to;
    }
}

impl Default for ExecutionSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives one remote session at a time.
#[derive(Debug, Clone, Default)]
pub struct ExecutionClient {
    session: ExecutionSession,
    generation: u64,
    in_flight: Option<Ticket>,
    transcript: Vec<String>,
}

impl ExecutionClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn session(&self) -> &ExecutionSession {
        &self.session
    }

    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.session.status
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether a host should offer the start action.
    #[must_use]
    pub const fn can_start(&self) -> bool {
        !self.is_busy()
    }

    /// Whether a host should offer the step action.
    #[must_use]
    pub fn can_step(&self) -> bool {
        !self.is_busy() && self.session.status == SessionStatus::Running
    }

    /// Displayed log of the session, one entry per line.
    #[must_use]
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Current variable snapshot, rendered `name: value`.
    #[must_use]
    pub fn variable_lines(&self) -> Vec<String> {
        self.session
            .variables
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect()
    }

    /// Discard the current session and start a new generation.
    pub fn begin_start(&mut self) -> Result<Ticket, SessionError> {
        if self.in_flight.is_some() {
            return Err(SessionError::Busy);
        }

        self.generation += 1;
        self.session = ExecutionSession::new();
        self.transcript.clear();

        let ticket = Ticket {
            generation: self.generation,
            kind: RequestKind::Start,
        };
        self.in_flight = Some(ticket);
        debug!(generation = self.generation, "starting session");
        Ok(ticket)
    }

    pub fn finish_start(
        &mut self,
        ticket: Ticket,
        result: Result<(), RemoteError>,
    ) -> Result<Outcome, SessionError> {
        if !self.take_if_current(ticket) {
            return Ok(Outcome::Stale);
        }

        match result {
            Ok(()) => {
                self.session.advance(SessionStatus::Running);
                Ok(Outcome::Started)
            }
            Err(err) => {
                self.session.last_error = Some(err.to_string());
                self.transcript.push(format!("An error occurred: {err}"));
                Err(err.into())
            }
        }
    }

    /// Claim the next step. Rejected locally unless running and idle.
    pub fn begin_step(&mut self) -> Result<Ticket, SessionError> {
        if self.in_flight.is_some() {
            return Err(SessionError::Busy);
        }
        if self.session.status != SessionStatus::Running {
            return Err(SessionError::NotRunning {
                status: self.session.status,
            });
        }

        let ticket = Ticket {
            generation: self.generation,
            kind: RequestKind::Step,
        };
        self.in_flight = Some(ticket);
        Ok(ticket)
    }

    pub fn finish_step(
        &mut self,
        ticket: Ticket,
        result: Result<StepReply, RemoteError>,
    ) -> Result<Outcome, SessionError> {
        if !self.take_if_current(ticket) {
            return Ok(Outcome::Stale);
        }

        match result {
            Ok(StepReply::Step(record)) => {
                self.transcript.push(format!("Executing: {}", record.line));
                if let Some(output) = &record.output {
                    self.transcript.push(format!("Output: {output}"));
                    self.session
                        .accumulated_output
                        .extend(output.lines().map(str::to_string));
                }
                self.session.current_line_index = match record.line {
                    StepLine::Index(index) => index,
                    StepLine::Source(_) => self.session.current_line_index + 1,
                };
                self.session.current_line = Some(record.line.clone());
                self.session.variables = record.variables;
                Ok(Outcome::Stepped {
                    line: record.line,
                    output: record.output,
                })
            }
            Ok(StepReply::Completed) => {
                self.transcript.push("Execution completed".to_string());
                self.session.advance(SessionStatus::Completed);
                Ok(Outcome::Completed)
            }
            Err(err) => {
                self.transcript.push(format!("Error: {err}"));
                self.session.last_error = Some(err.to_string());
                self.session.advance(SessionStatus::Failed);
                Err(err.into())
            }
        }
    }

    /// Stop tracking the current session; responses still in
    /// flight for it will be discarded.
    pub fn abandon(&mut self) {
        self.generation += 1;
        self.in_flight = None;
        self.session = ExecutionSession::new();
        self.transcript.clear();
        debug!(generation = self.generation, "session abandoned");
    }

    /// Start a session against `remote` and wait for the ack.
    pub fn start<R: Remote + ?Sized>(
        &mut self,
        remote: &mut R,
        program: &str,
    ) -> Result<Outcome, SessionError> {
        let ticket = self.begin_start()?;
        let result = remote.start_execution(program);
        self.finish_start(ticket, result)
    }

    /// Execute one statement against `remote`.
    pub fn step<R: Remote + ?Sized>(&mut self, remote: &mut R) -> Result<Outcome, SessionError> {
        let ticket = self.begin_step()?;
        let result = remote.next_step();
        self.finish_step(ticket, result)
    }

    fn take_if_current(&mut self, ticket: Ticket) -> bool {
        if ticket.generation != self.generation || self.in_flight != Some(ticket) {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale response"
            );
            return false;
        }
        self.in_flight = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::StepRecord;

    fn record(line: &str, output: Option<&str>) -> StepReply {
        StepReply::Step(StepRecord {
            line: StepLine::Source(line.to_string()),
            output: output.map(str::to_string),
            variables: Variables::new(),
        })
    }

    fn running() -> ExecutionClient {
        let mut client = ExecutionClient::new();
        let ticket = client.begin_start().expect("start");
        client.finish_start(ticket, Ok(())).expect("ack");
        client
    }

    #[test]
    fn start_moves_to_running() {
        let client = running();
        assert_eq!(client.status(), SessionStatus::Running);
        assert!(client.can_step());
        assert_eq!(client.generation(), 1);
    }

    #[test]
    fn failed_start_stays_idle() {
        let mut client = ExecutionClient::new();
        let ticket = client.begin_start().expect("start");
        let err = client
            .finish_start(ticket, Err(RemoteError::Transport("refused".to_string())))
            .expect_err("should fail");
        assert!(matches!(err, SessionError::Remote(RemoteError::Transport(_))));
        assert_eq!(client.status(), SessionStatus::Idle);
        assert!(client.session().last_error.is_some());
        assert!(client.can_start());
    }

    #[test]
    fn step_rejected_when_idle() {
        let mut client = ExecutionClient::new();
        let err = client.begin_step().expect_err("should reject");
        assert_eq!(
            err,
            SessionError::NotRunning {
                status: SessionStatus::Idle
            }
        );
    }

    #[test]
    fn step_rejected_while_in_flight() {
        let mut client = running();
        let _ticket = client.begin_step().expect("step");
        assert_eq!(client.begin_step(), Err(SessionError::Busy));
        assert_eq!(client.begin_start(), Err(SessionError::Busy));
    }

    #[test]
    fn step_appends_and_replaces_variables() {
        let mut client = running();
        let ticket = client.begin_step().expect("step");
        let mut vars = Variables::new();
        vars.insert("x".to_string(), serde_json::json!(10));
        let reply = StepReply::Step(StepRecord {
            line: StepLine::Source("x = 10".to_string()),
            output: None,
            variables: vars,
        });
        client.finish_step(ticket, Ok(reply)).expect("apply");

        let ticket = client.begin_step().expect("step");
        client
            .finish_step(ticket, Ok(record("PRINT x", Some("10"))))
            .expect("apply");

        assert_eq!(
            client.transcript(),
            &["Executing: x = 10", "Executing: PRINT x", "Output: 10"]
        );
        assert_eq!(client.session().current_line_index, 2);
        assert!(client.session().variables.is_empty());
        assert_eq!(client.session().accumulated_output, vec!["10"]);
    }

    #[test]
    fn indexed_step_sets_line_index() {
        let mut client = running();
        let ticket = client.begin_step().expect("step");
        let reply = StepReply::Step(StepRecord {
            line: StepLine::Index(4),
            output: None,
            variables: Variables::new(),
        });
        client.finish_step(ticket, Ok(reply)).expect("apply");
        assert_eq!(client.session().current_line_index, 4);
        assert_eq!(client.session().current_line, Some(StepLine::Index(4)));
    }

    #[test]
    fn completion_is_terminal() {
        let mut client = running();
        let ticket = client.begin_step().expect("step");
        let outcome = client
            .finish_step(ticket, Ok(StepReply::Completed))
            .expect("apply");
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(client.status(), SessionStatus::Completed);
        assert!(!client.can_step());
        assert!(matches!(
            client.begin_step(),
            Err(SessionError::NotRunning {
                status: SessionStatus::Completed
            })
        ));
    }

    #[test]
    fn step_failure_is_terminal() {
        let mut client = running();
        let ticket = client.begin_step().expect("step");
        let result = client.finish_step(
            ticket,
            Err(RemoteError::Interpreter("Invalid expression".to_string())),
        );
        assert!(result.is_err());
        assert_eq!(client.status(), SessionStatus::Failed);
        assert_eq!(
            client.session().last_error.as_deref(),
            Some("Invalid expression")
        );
    }

    #[test]
    fn abandoned_response_is_stale() {
        let mut client = running();
        let ticket = client.begin_step().expect("step");
        client.abandon();
        let outcome = client
            .finish_step(ticket, Ok(record("PRINT 1", Some("1"))))
            .expect("apply");
        assert_eq!(outcome, Outcome::Stale);
        assert!(client.transcript().is_empty());
        assert_eq!(client.status(), SessionStatus::Idle);
    }

    #[test]
    fn old_generation_ticket_is_stale_after_restart() {
        let mut client = running();
        let old = client.begin_step().expect("step");
        client.abandon();
        let start = client.begin_start().expect("start");
        client.finish_start(start, Ok(())).expect("ack");
        let outcome = client
            .finish_step(old, Ok(StepReply::Completed))
            .expect("apply");
        assert_eq!(outcome, Outcome::Stale);
        assert_eq!(client.status(), SessionStatus::Running);
    }

    #[test]
    fn restart_discards_previous_session() {
        let mut client = running();
        let ticket = client.begin_step().expect("step");
        client
            .finish_step(ticket, Ok(record("PRINT 1", Some("1"))))
            .expect("apply");

        let ticket = client.begin_start().expect("restart");
        assert_eq!(client.status(), SessionStatus::Idle);
        assert!(client.transcript().is_empty());
        client.finish_start(ticket, Ok(())).expect("ack");
        assert_eq!(client.session().current_line_index, 0);
        assert!(client.session().accumulated_output.is_empty());
    }

    #[test]
    fn variable_lines_render_json() {
        let mut client = running();
        let ticket = client.begin_step().expect("step");
        let mut vars = Variables::new();
        vars.insert("name".to_string(), serde_json::json!("Ada"));
        vars.insert("n".to_string(), serde_json::json!(2));
        let reply = StepReply::Step(StepRecord {
            line: StepLine::Index(0),
            output: None,
            variables: vars,
        });
        client.finish_step(ticket, Ok(reply)).expect("apply");
        assert_eq!(client.variable_lines(), vec!["n: 2", "name: \"Ada\""]);
    }
}

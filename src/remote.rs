//! The interpreter service as seen from the client.
//!
//! [`Remote`] is the seam: one method per endpoint. [`HttpRemote`]
//! talks JSON over HTTP; tests substitute scripted fakes.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::Config;
use crate::protocol::{
    AckResponse, EXECUTION_COMPLETED, ExampleResponse, InterpretResponse, ProgramRequest,
    SaveSnippetRequest, ServerConsistency, SnippetListResponse, SnippetResponse, StepReply,
    StepResponse, Variables,
};

/// Failure of a remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The request never produced a usable HTTP response.
    #[error("transport error: {0}")]
    Transport(String),
    /// The service answered with an `error` field.
    #[error("{0}")]
    Interpreter(String),
    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Protocol(String),
}

impl RemoteError {
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Output of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interpretation {
    pub output: String,
    /// Variables after each statement, if the service reports them.
    pub snapshots: Option<Vec<Variables>>,
}

/// Endpoints of the interpreter service.
pub trait Remote {
    /// Run a whole program at once.
    fn interpret(&mut self, program: &str) -> Result<Interpretation, RemoteError>;

    /// Fetch the built-in example program.
    fn example(&mut self) -> Result<String, RemoteError>;

    /// Begin a stepped session for `program`, replacing any other.
    fn start_execution(&mut self, program: &str) -> Result<(), RemoteError>;

    /// Execute the next statement of the current session.
    fn next_step(&mut self) -> Result<StepReply, RemoteError>;

    fn save_snippet(&mut self, name: &str, code: &str) -> Result<(), RemoteError>;

    fn list_snippets(&mut self) -> Result<Vec<String>, RemoteError>;

    fn load_snippet(&mut self, name: &str) -> Result<String, RemoteError>;

    /// Ask the service to compare batch and stepped runs itself.
    fn test_consistency(&mut self, program: &str) -> Result<ServerConsistency, RemoteError>;
}

/// Turn a decoded `next_step` body into a reply.
pub fn step_reply(response: StepResponse) -> Result<StepReply, RemoteError> {
    match response {
        StepResponse::Step(record) => Ok(StepReply::Step(record)),
        StepResponse::Message { message } if message == EXECUTION_COMPLETED => {
            Ok(StepReply::Completed)
        }
        StepResponse::Message { message } => Err(RemoteError::Protocol(format!(
            "unexpected step message: {message}"
        ))),
    }
}

/// Decode a JSON body, surfacing a non-null `error` field as an
/// interpreter error before trying the expected shape.
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, RemoteError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| RemoteError::Protocol(e.to_string()))?;

    match value.get("error") {
        Some(serde_json::Value::String(message)) => {
            return Err(RemoteError::Interpreter(message.clone()));
        }
        Some(serde_json::Value::Null) | None => {}
        Some(other) => return Err(RemoteError::Interpreter(other.to_string())),
    }

    serde_json::from_value(value).map_err(|e| RemoteError::Protocol(e.to_string()))
}

/// JSON-over-HTTP client for the interpreter service.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, RemoteError> {
        Self::new(config.server_url.clone(), config.request_timeout)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Result<reqwest::Url, RemoteError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| RemoteError::Transport(format!("invalid server url: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| RemoteError::Transport("server url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, RemoteError> {
        let url = self.url(segments)?;
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Self::read(response)
    }

    fn post<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, RemoteError> {
        let url = self.url(segments)?;
        debug!(%url, "POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Self::read(response)
    }

    fn read<T: DeserializeOwned>(response: reqwest::blocking::Response) -> Result<T, RemoteError> {
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        match decode(&body) {
            // an error status without a JSON error body is a transport failure
            Err(RemoteError::Protocol(_)) if !status.is_success() => {
                Err(RemoteError::Transport(format!("HTTP error! status: {status}")))
            }
            other => other,
        }
    }
}

impl Remote for HttpRemote {
    fn interpret(&mut self, program: &str) -> Result<Interpretation, RemoteError> {
        let resp: InterpretResponse =
            self.post(&["interpret"], &ProgramRequest { pseudocode: program })?;
        Ok(Interpretation {
            output: resp.result.unwrap_or_default(),
            snapshots: resp.snapshots,
        })
    }

    fn example(&mut self) -> Result<String, RemoteError> {
        let resp: ExampleResponse = self.get(&["example"])?;
        Ok(resp.example)
    }

    fn start_execution(&mut self, program: &str) -> Result<(), RemoteError> {
        let _: AckResponse =
            self.post(&["start_execution"], &ProgramRequest { pseudocode: program })?;
        Ok(())
    }

    fn next_step(&mut self) -> Result<StepReply, RemoteError> {
        step_reply(self.get(&["next_step"])?)
    }

    fn save_snippet(&mut self, name: &str, code: &str) -> Result<(), RemoteError> {
        let _: AckResponse = self.post(&["save_snippet"], &SaveSnippetRequest { name, code })?;
        Ok(())
    }

    fn list_snippets(&mut self) -> Result<Vec<String>, RemoteError> {
        let resp: SnippetListResponse = self.get(&["list_snippets"])?;
        Ok(resp.snippets)
    }

    fn load_snippet(&mut self, name: &str) -> Result<String, RemoteError> {
        let resp: SnippetResponse = self.get(&["load_snippet", name])?;
        Ok(resp.code)
    }

    fn test_consistency(&mut self, program: &str) -> Result<ServerConsistency, RemoteError> {
        self.post(&["test_consistency"], &ProgramRequest { pseudocode: program })
    }
}

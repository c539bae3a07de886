//! Execution results, failures, and the response parsing shared by every
//! caller of a run endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shown when a run produced nothing on any stream.
pub const NO_OUTPUT: &str = "No output";

/// Captured output of one backend stage (compile or run).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    /// Interleaved stdout and stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,
}

impl StageOutput {
    /// Text for the output pane: stdout, else stderr, else combined output,
    /// else [`NO_OUTPUT`]. Empty streams count as absent.
    pub fn display_text(&self) -> &str {
        [&self.stdout, &self.stderr, &self.output]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|text| !text.is_empty())
            .unwrap_or(NO_OUTPUT)
    }

    /// Whether the stage exited non-zero or was killed by a signal.
    pub fn failed(&self) -> bool {
        self.code.is_some_and(|code| code != 0) || self.signal.is_some()
    }
}

/// A successful backend response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Compilation stage, for compiled languages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile: Option<StageOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<StageOutput>,
}

impl ExecutionResult {
    /// Text for the output pane.
    ///
    /// A failed compile stage wins, since the run stage is then empty or
    /// missing; otherwise the run stage is shown.
    pub fn display_text(&self) -> &str {
        match (&self.compile, &self.run) {
            (Some(compile), _) if compile.failed() => compile.display_text(),
            (_, Some(run)) => run.display_text(),
            (Some(compile), None) => compile.display_text(),
            (None, None) => NO_OUTPUT,
        }
    }
}

/// Why an execution produced no result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    /// The request never completed (connect, TLS, reset, body read).
    #[error("Network/fetch error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("Server error (status {status}): {detail}")]
    Status { status: u16, detail: String },

    /// A success status with a body that is not JSON.
    #[error("Server returned non-JSON (status {status}):\n\n{body}")]
    MalformedResponse { status: u16, body: String },

    /// A JSON body with neither a run nor a compile stage.
    #[error("No response received.")]
    MissingResult { status: u16 },
}

impl From<reqwest::Error> for ExecutionError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Interpret a run endpoint's status and raw body.
pub fn parse_response(status: u16, body: &str) -> Result<ExecutionResult, ExecutionError> {
    if !(200..300).contains(&status) {
        return Err(ExecutionError::Status {
            status,
            detail: error_detail(body),
        });
    }

    let value: Value = serde_json::from_str(body).map_err(|_| ExecutionError::MalformedResponse {
        status,
        body: body.to_string(),
    })?;

    let result: ExecutionResult =
        serde_json::from_value(value).map_err(|_| ExecutionError::MalformedResponse {
            status,
            body: body.to_string(),
        })?;

    if result.run.is_none() && result.compile.is_none() {
        return Err(ExecutionError::MissingResult { status });
    }
    Ok(result)
}

/// Best human-readable detail from an error body.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => ["error", "message"]
            .iter()
            .find_map(|key| value.get(key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

//! Forwarding of (language, code) pairs to a Piston-compatible execution
//! backend.
//!
//! Request shape sent downstream:
//! ```text
//! POST <endpoint>
//! {"language":"python3","version":"*","files":[{"name":"main.py","content":"..."}]}
//! ```
//!
//! Each call is independent: no retry, no queueing, and no timeout beyond
//! the HTTP client's default. Concurrent calls may complete in any order.

use serde::Serialize;

use crate::language::Language;
use crate::result::{parse_response, ExecutionError, ExecutionResult};

/// Public Piston instance.
pub const DEFAULT_ENDPOINT: &str = "https://emkc.org/api/v2/piston/execute";

/// Let the backend pick the newest installed runtime.
pub const ANY_VERSION: &str = "*";

/// One file submitted for execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile<'a> {
    pub name: String,
    pub content: &'a str,
}

/// Body of a downstream execute request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendRequest<'a> {
    pub language: &'a str,
    pub version: &'static str,
    pub files: Vec<SourceFile<'a>>,
}

impl<'a> BackendRequest<'a> {
    /// Build the request for running `code` as `language`.
    pub fn new(language: &'a str, code: &'a str) -> Self {
        Self {
            language,
            version: ANY_VERSION,
            files: vec![SourceFile {
                name: Language::parse(language).main_file_name(),
                content: code,
            }],
        }
    }
}

/// Client for the execution backend.
#[derive(Debug, Clone)]
pub struct ExecutionProxy {
    client: reqwest::Client,
    endpoint: String,
}

impl ExecutionProxy {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ExecutionError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, endpoint))
    }

    /// Share an existing connection pool.
    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Run `code` as `language` on the backend.
    ///
    /// The language identifier is forwarded verbatim; only the file name
    /// depends on whether it is recognized.
    pub async fn execute(&self, language: &str, code: &str) -> Result<ExecutionResult, ExecutionError> {
        let request = BackendRequest::new(language, code);
        log::debug!(
            "Submitting {} ({} bytes) to {}",
            request.files[0].name,
            code.len(),
            self.endpoint
        );

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        let result = parse_response(status, &body);
        match &result {
            Ok(_) => log::debug!("Backend answered {status} for {language}"),
            Err(e) => log::warn!("Backend execution failed for {language}: {e}"),
        }
        result
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

//! Participant-side caller of the `POST /run` endpoint.
//!
//! The result belongs to the caller alone: nothing here touches the shared
//! session, so one participant's run is never seen by the others.

use serde::{Deserialize, Serialize};

use crate::result::{parse_response, ExecutionError, ExecutionResult};

/// Body of `POST /run`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub code: String,
}

/// HTTP client for a codeshare server's run endpoint.
#[derive(Debug, Clone)]
pub struct RunClient {
    client: reqwest::Client,
    run_url: String,
}

impl RunClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:5000`.
    pub fn new(base_url: &str) -> Result<Self, ExecutionError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            run_url: format!("{}/run", base_url.trim_end_matches('/')),
        })
    }

    /// Submit the buffer and wait for the result.
    pub async fn run(&self, language: &str, code: &str) -> Result<ExecutionResult, ExecutionError> {
        let request = RunRequest {
            language: language.to_string(),
            code: code.to_string(),
        };
        let response = self.client.post(&self.run_url).json(&request).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        parse_response(status, &body)
    }

    /// Submit the buffer and render whatever comes back for the output pane.
    pub async fn run_display(&self, language: &str, code: &str) -> String {
        match self.run(language, code).await {
            Ok(result) => result.display_text().to_string(),
            Err(e) => e.to_string(),
        }
    }

    pub fn run_url(&self) -> &str {
        &self.run_url
    }
}

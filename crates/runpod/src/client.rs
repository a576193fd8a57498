//! REST client for RunPod serverless endpoints.

use std::time::Duration;

use serde::Deserialize;

use crate::error::RunpodError;

/// Public RunPod serverless API base.
pub const DEFAULT_BASE_URL: &str = "https://api.runpod.ai/v2";

/// Fixed delay between status polls. No backoff, no jitter: the
/// backend's status endpoint is cheap and the loop is bounded by a
/// wall-clock timeout.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// HTTP client for one RunPod account (bearer credential).
///
/// The endpoint identifier is passed per call because different
/// models map to different serverless endpoints under the same key.
pub struct RunpodClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    poll_interval: Duration,
}

/// Remote job status as reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunpodStatus {
    InQueue,
    InProgress,
    Completed,
    Failed,
}

impl RunpodStatus {
    /// Parse the wire representation. Any string outside the four
    /// known values is a protocol violation.
    fn parse(raw: &str) -> Result<Self, RunpodError> {
        match raw {
            "IN_QUEUE" => Ok(RunpodStatus::InQueue),
            "IN_PROGRESS" => Ok(RunpodStatus::InProgress),
            "COMPLETED" => Ok(RunpodStatus::Completed),
            "FAILED" => Ok(RunpodStatus::Failed),
            other => Err(RunpodError::Protocol(format!(
                "unknown job status '{other}'"
            ))),
        }
    }
}

/// One observation of a remote job.
#[derive(Debug)]
pub struct JobPoll {
    pub status: RunpodStatus,
    /// Arbitrary per-model map; only meaningful when `status` is
    /// `Completed`.
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// Raw wire shape of the status response.
#[derive(Debug, Deserialize)]
struct RawStatus {
    status: Option<String>,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl RunpodClient {
    /// Create a client against the public RunPod API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), DEFAULT_BASE_URL, api_key)
    }

    /// Create a client reusing an existing [`reqwest::Client`] and a
    /// custom base URL (self-hosted gateways, tests).
    pub fn with_http(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the poll interval (tests use millisecond intervals).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Submit a job to a serverless endpoint.
    ///
    /// Sends `POST /{endpoint}/run` with `{"input": {...}}` and
    /// returns the backend-assigned job id. A missing or non-string
    /// `id` in the response is a protocol violation, not something to
    /// coerce.
    pub async fn submit(
        &self,
        endpoint_id: &str,
        input: &serde_json::Value,
    ) -> Result<String, RunpodError> {
        let body = serde_json::json!({ "input": input });

        let response = self
            .http
            .post(format!("{}/{endpoint_id}/run", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let value: serde_json::Value = Self::parse_response(response).await?;

        match value.get("id") {
            Some(serde_json::Value::String(id)) if !id.is_empty() => Ok(id.clone()),
            Some(other) => Err(RunpodError::Protocol(format!(
                "job id is not a string: {other}"
            ))),
            None => Err(RunpodError::Protocol(
                "submit response is missing the job id".into(),
            )),
        }
    }

    /// Fetch the current status of a submitted job.
    pub async fn get_status(
        &self,
        endpoint_id: &str,
        external_job_id: &str,
    ) -> Result<JobPoll, RunpodError> {
        let response = self
            .http
            .get(format!(
                "{}/{endpoint_id}/status/{external_job_id}",
                self.base_url
            ))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let raw: RawStatus = Self::parse_response(response).await?;

        let status_str = raw
            .status
            .ok_or_else(|| RunpodError::Protocol("status response has no status field".into()))?;
        let status = RunpodStatus::parse(&status_str)?;

        // Backends usually report errors as a plain string; tolerate
        // structured payloads by stringifying them.
        let error = raw.error.map(|e| match e {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });

        Ok(JobPoll {
            status,
            output: raw.output,
            error,
        })
    }

    /// Poll a job until it reaches a terminal state.
    ///
    /// Fixed-interval loop: one status round trip per iteration, then
    /// a full sleep regardless of response latency. Returns the
    /// terminal `output` map on COMPLETED; `FAILED` raises immediately
    /// with the backend's error string. Raises
    /// [`RunpodError::Timeout`] within `timeout + poll_interval` of
    /// wall-clock time.
    pub async fn wait_for_completion(
        &self,
        endpoint_id: &str,
        external_job_id: &str,
        timeout: Duration,
    ) -> Result<Option<serde_json::Value>, RunpodError> {
        let started = tokio::time::Instant::now();

        loop {
            let poll = self.get_status(endpoint_id, external_job_id).await?;

            match poll.status {
                RunpodStatus::Completed => return Ok(poll.output),
                RunpodStatus::Failed => {
                    return Err(RunpodError::BackendFailed(poll.error.unwrap_or_else(
                        || "job failed without error detail".to_string(),
                    )));
                }
                RunpodStatus::InQueue | RunpodStatus::InProgress => {
                    tracing::debug!(
                        external_job_id,
                        elapsed_secs = started.elapsed().as_secs(),
                        "Job still running"
                    );
                }
            }

            if started.elapsed() >= timeout {
                return Err(RunpodError::Timeout {
                    waited_secs: started.elapsed().as_secs(),
                });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    // ---- private helpers ----

    /// Parse a successful JSON response body, or surface the status
    /// and body text on a non-2xx response.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RunpodError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RunpodError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

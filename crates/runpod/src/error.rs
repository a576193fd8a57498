/// Errors from the RunPod client layer.
#[derive(Debug, thiserror::Error)]
pub enum RunpodError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// RunPod returned a non-2xx status code.
    #[error("RunPod API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response body violated the expected wire protocol
    /// (missing/non-string job id, unknown status value).
    #[error("RunPod protocol violation: {0}")]
    Protocol(String),

    /// The backend reported the job as FAILED. Carries the backend's
    /// error string verbatim.
    #[error("{0}")]
    BackendFailed(String),

    /// The poll loop exceeded its wall-clock bound.
    #[error("Timed out waiting for job completion after {waited_secs}s")]
    Timeout { waited_secs: u64 },
}

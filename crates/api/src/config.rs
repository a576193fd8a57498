use std::path::PathBuf;
use std::time::Duration;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`). Bounds
    /// how long in-flight completion pollers are awaited on shutdown.
    pub shutdown_timeout_secs: u64,
    /// Root directory for durable local storage (results, archived
    /// inputs). Default: `./data`.
    pub data_dir: PathBuf,
    /// Base URL of the RunPod serverless API. Overridden for
    /// self-hosted gateways and in tests.
    pub runpod_base_url: String,
    /// Delay between remote status polls (default: 5 seconds).
    pub poll_interval: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                     |
    /// |-----------------------------|-----------------------------|
    /// | `HOST`                      | `0.0.0.0`                   |
    /// | `PORT`                      | `3000`                      |
    /// | `CORS_ORIGINS`              | `http://localhost:5173`     |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                        |
    /// | `SHUTDOWN_TIMEOUT_SECS`     | `30`                        |
    /// | `DATA_DIR`                  | `./data`                    |
    /// | `RUNPOD_BASE_URL`           | `https://api.runpod.ai/v2`  |
    /// | `RUNPOD_POLL_INTERVAL_SECS` | `5`                         |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let data_dir = PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".into()));

        let runpod_base_url = std::env::var("RUNPOD_BASE_URL")
            .unwrap_or_else(|_| pixelmill_runpod::client::DEFAULT_BASE_URL.into());

        let poll_interval_secs: u64 = std::env::var("RUNPOD_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("RUNPOD_POLL_INTERVAL_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            data_dir,
            runpod_base_url,
            poll_interval: Duration::from_secs(poll_interval_secs),
        }
    }
}

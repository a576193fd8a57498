//! Durable local storage for generated artifacts and archived inputs.
//!
//! Result files use the deterministic `result_{jobId}.{ext}` naming
//! convention and are served under the [`RESULTS_PUBLIC_PREFIX`] web
//! path. Archived inputs live in a sibling directory and are only
//! referenced from job metadata, never served.

use std::path::{Path, PathBuf};

use pixelmill_core::output::result_filename;
use pixelmill_core::types::JobId;

/// Web path prefix under which result files are exposed.
pub const RESULTS_PUBLIC_PREFIX: &str = "/results";

/// A persisted result artifact.
#[derive(Debug, Clone)]
pub struct SavedResult {
    /// Web-addressable path (`/results/result_{jobId}.{ext}`).
    pub url: String,
    /// Filesystem path of the written file.
    pub path: String,
}

/// Filesystem-backed durable storage rooted at a data directory.
#[derive(Debug)]
pub struct LocalStorage {
    results_dir: PathBuf,
    inputs_dir: PathBuf,
}

impl LocalStorage {
    /// Create the storage layout under `root`, creating directories
    /// as needed.
    pub async fn init(root: &Path) -> std::io::Result<Self> {
        let results_dir = root.join("results");
        let inputs_dir = root.join("inputs");
        tokio::fs::create_dir_all(&results_dir).await?;
        tokio::fs::create_dir_all(&inputs_dir).await?;
        Ok(Self {
            results_dir,
            inputs_dir,
        })
    }

    /// Directory served under [`RESULTS_PUBLIC_PREFIX`].
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Filesystem path a job's result artifact would occupy.
    pub fn result_file_path(&self, job_id: JobId, extension: &str) -> PathBuf {
        self.results_dir.join(result_filename(job_id, extension))
    }

    /// Persist a result artifact and return its web path and
    /// filesystem path.
    pub async fn save_result(
        &self,
        job_id: JobId,
        extension: &str,
        bytes: &[u8],
    ) -> std::io::Result<SavedResult> {
        let filename = result_filename(job_id, extension);
        let path = self.results_dir.join(&filename);
        tokio::fs::write(&path, bytes).await?;
        Ok(SavedResult {
            url: format!("{RESULTS_PUBLIC_PREFIX}/{filename}"),
            path: path.to_string_lossy().into_owned(),
        })
    }

    /// Archive an uploaded input for later reuse (e.g. re-runs).
    /// Returns the filesystem path.
    pub async fn archive_input(
        &self,
        job_id: JobId,
        label: &str,
        bytes: &[u8],
    ) -> std::io::Result<String> {
        let path = self.inputs_dir.join(format!("{label}_{job_id}.bin"));
        tokio::fs::write(&path, bytes).await?;
        Ok(path.to_string_lossy().into_owned())
    }
}

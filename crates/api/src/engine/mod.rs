//! Asynchronous completion engine: the background poller that drives
//! submitted jobs to a terminal state, and the ingestion pipeline
//! that turns raw backend output into a persisted artifact.

pub mod ingest;
pub mod poller;

//! HTTP client for RunPod-style serverless compute endpoints.
//!
//! Jobs are submitted with `POST /{endpoint}/run` and polled with
//! `GET /{endpoint}/status/{id}` until they reach a terminal state.
//! [`RunpodClient::wait_for_completion`] drives the poll loop under a
//! wall-clock timeout.

pub mod client;
pub mod error;
pub mod payload;

pub use client::{JobPoll, RunpodClient, RunpodStatus};
pub use error::RunpodError;

//! Shared response envelope types for API handlers.
//!
//! Resource reads use a `{ "data": ... }` envelope. The generation
//! hand-off response is the exception: its shape
//! (`{jobId, externalJobId, status}`) is part of the client contract
//! and is returned bare.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

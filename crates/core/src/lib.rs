//! Domain logic for the pixelmill generation platform.
//!
//! Pure types and functions shared by the database layer, the RunPod
//! client, and the API server. Nothing in this crate performs I/O.

pub mod error;
pub mod model;
pub mod output;
pub mod types;

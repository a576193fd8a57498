//! Static catalog of generation models.
//!
//! Each model maps to one RunPod serverless endpoint and carries the
//! metadata the submission and ingestion paths need: media kind,
//! result file extension, fixed ledger cost, default poll timeout,
//! and the parameter names that must be present at submission time.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Media kinds
// ---------------------------------------------------------------------------

/// Kind of artifact a model produces. Drives output-field selection
/// during result ingestion and the result file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

// ---------------------------------------------------------------------------
// Model catalog
// ---------------------------------------------------------------------------

/// A single entry in the model catalog.
#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    /// Stable model identifier as sent by clients (e.g. `flux-image`).
    pub id: &'static str,
    pub kind: MediaKind,
    /// Extension of the persisted result artifact.
    pub extension: &'static str,
    /// Fixed ledger cost debited per submission.
    pub cost: i64,
    /// Default `wait_for_completion` timeout in seconds. Overridable
    /// via per-user settings.
    pub default_timeout_secs: u64,
    /// Parameters that must be present (non-null) in the submission
    /// parameter map.
    pub required_params: &'static [&'static str],
    /// Whether the model consumes an input image.
    pub takes_input_image: bool,
    /// Whether the model consumes one or more audio tracks.
    pub takes_audio: bool,
}

/// Text-to-image generation.
pub const FLUX_IMAGE: ModelSpec = ModelSpec {
    id: "flux-image",
    kind: MediaKind::Image,
    extension: "png",
    cost: 1,
    default_timeout_secs: 1800,
    required_params: &["prompt"],
    takes_input_image: false,
    takes_audio: false,
};

/// Text-to-video generation.
pub const WAN_VIDEO: ModelSpec = ModelSpec {
    id: "wan-video",
    kind: MediaKind::Video,
    extension: "mp4",
    cost: 5,
    default_timeout_secs: 3600,
    required_params: &["prompt", "width", "height"],
    takes_input_image: false,
    takes_audio: false,
};

/// Talking-head video from a portrait image plus audio tracks.
pub const SONIC_AVATAR: ModelSpec = ModelSpec {
    id: "sonic-avatar",
    kind: MediaKind::Video,
    extension: "mp4",
    cost: 5,
    default_timeout_secs: 3600,
    required_params: &[],
    takes_input_image: true,
    takes_audio: true,
};

/// All known models.
pub const CATALOG: &[ModelSpec] = &[FLUX_IMAGE, WAN_VIDEO, SONIC_AVATAR];

/// Look up a model by its identifier.
pub fn find(model_id: &str) -> Option<&'static ModelSpec> {
    CATALOG.iter().find(|m| m.id == model_id)
}

// ---------------------------------------------------------------------------
// Submission validation
// ---------------------------------------------------------------------------

/// Validate that a prompt is present and non-blank.
pub fn validate_prompt(prompt: &str) -> Result<(), CoreError> {
    if prompt.trim().is_empty() {
        return Err(CoreError::Validation("prompt must not be empty".into()));
    }
    Ok(())
}

/// Validate the submission parameter map against a model's required
/// parameter list. Null values count as missing.
pub fn validate_params(
    spec: &ModelSpec,
    params: &serde_json::Map<String, serde_json::Value>,
) -> Result<(), CoreError> {
    for &name in spec.required_params {
        match params.get(name) {
            Some(v) if !v.is_null() => {}
            _ => {
                return Err(CoreError::Validation(format!(
                    "Model '{}' requires parameter '{name}'",
                    spec.id
                )));
            }
        }
    }
    Ok(())
}

/// Validate media inputs against what the model consumes.
///
/// Models that take audio must receive at least one track; models that
/// take an input image must receive one.
pub fn validate_media(
    spec: &ModelSpec,
    has_input_image: bool,
    audio_track_count: usize,
) -> Result<(), CoreError> {
    if spec.takes_input_image && !has_input_image {
        return Err(CoreError::Validation(format!(
            "Model '{}' requires an input image",
            spec.id
        )));
    }
    if spec.takes_audio && audio_track_count == 0 {
        return Err(CoreError::Validation(format!(
            "Model '{}' requires at least one audio track",
            spec.id
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

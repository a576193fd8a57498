//! Classification of backend result payloads.
//!
//! RunPod workers return an `output` map whose key set varies by
//! model: some inline the artifact as base64 (`image`, `video`,
//! `mp4`), older workers use `*_base64` keys, others return a
//! ready-to-use URL (`image_url`, `output_url`). [`select_source`]
//! decodes that map into a tagged [`OutputSource`] so the ingestion
//! pipeline never probes keys ad hoc. An unrecognized shape is a
//! valid variant, not an error.

use serde_json::Value;

use crate::model::MediaKind;
use crate::types::JobId;

/// Minimum length for a string field to be considered an inline
/// base64 payload. Anything shorter is noise (flags, short labels).
/// 16 characters is one base64 block group, the smallest artifact a
/// worker realistically inlines.
const INLINE_MIN_LEN: usize = 16;

/// String values in the output echo longer than this are truncated
/// before being stored on the job row.
const ECHO_MAX_LEN: usize = 1000;

/// Length of the prefix kept when truncating an echo string.
const ECHO_PREFIX_LEN: usize = 100;

// ---------------------------------------------------------------------------
// Field tables per media kind
// ---------------------------------------------------------------------------

/// Primary inline-base64 keys, in precedence order.
fn primary_keys(kind: MediaKind) -> &'static [&'static str] {
    match kind {
        MediaKind::Image => &["image"],
        MediaKind::Video => &["video", "mp4"],
    }
}

/// Legacy inline-base64 keys kept for backward compatibility.
fn legacy_keys(kind: MediaKind) -> &'static [&'static str] {
    match kind {
        MediaKind::Image => &["image_base64"],
        MediaKind::Video => &["video_base64"],
    }
}

/// Keys that hold a ready-to-use remote URL.
fn url_keys(kind: MediaKind) -> &'static [&'static str] {
    match kind {
        MediaKind::Image => &["image_url", "output_url"],
        MediaKind::Video => &["video_url", "output_url"],
    }
}

// ---------------------------------------------------------------------------
// Source selection
// ---------------------------------------------------------------------------

/// The content source selected from a backend output map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSource {
    /// Inline base64 payload found under `field`.
    Inline { field: &'static str, data: String },
    /// A remote URL to download the artifact from.
    RemoteUrl { field: &'static str, url: String },
    /// No recognized field. The job still completes; the result
    /// reference degrades to the retrieval-endpoint fallback.
    Unrecognized,
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http")
}

/// Heuristic for inline payloads: long enough to plausibly be media
/// and not a URL.
fn looks_inline(s: &str) -> bool {
    s.len() >= INLINE_MIN_LEN && !is_http_url(s)
}

fn get_str<'a>(output: &'a Value, key: &str) -> Option<&'a str> {
    output.get(key).and_then(Value::as_str)
}

/// Select the content source from a terminal `output` map.
///
/// Precedence (first match wins):
/// 1. primary inline key holding a non-URL string;
/// 2. legacy inline key;
/// 3. a URL key, or a primary key whose value starts with `http`;
/// 4. [`OutputSource::Unrecognized`].
pub fn select_source(kind: MediaKind, output: Option<&Value>) -> OutputSource {
    let Some(output) = output else {
        return OutputSource::Unrecognized;
    };

    for &key in primary_keys(kind) {
        if let Some(s) = get_str(output, key) {
            if looks_inline(s) {
                return OutputSource::Inline {
                    field: key,
                    data: s.to_string(),
                };
            }
        }
    }

    for &key in legacy_keys(kind) {
        if let Some(s) = get_str(output, key) {
            if looks_inline(s) {
                return OutputSource::Inline {
                    field: key,
                    data: s.to_string(),
                };
            }
        }
    }

    for &key in url_keys(kind) {
        if let Some(s) = get_str(output, key) {
            if is_http_url(s) {
                return OutputSource::RemoteUrl {
                    field: key,
                    url: s.to_string(),
                };
            }
        }
    }

    // A primary key may also carry a URL directly.
    for &key in primary_keys(kind) {
        if let Some(s) = get_str(output, key) {
            if is_http_url(s) {
                return OutputSource::RemoteUrl {
                    field: key,
                    url: s.to_string(),
                };
            }
        }
    }

    OutputSource::Unrecognized
}

// ---------------------------------------------------------------------------
// Echo redaction
// ---------------------------------------------------------------------------

/// Produce a copy of `output` safe to store on the job row.
///
/// Any string longer than 1000 characters (typically megabytes of
/// base64) is replaced by its first 100 characters plus a marker with
/// the original length. Containers are walked recursively.
pub fn redact_echo(output: &Value) -> Value {
    match output {
        Value::String(s) if s.len() > ECHO_MAX_LEN => {
            let prefix: String = s.chars().take(ECHO_PREFIX_LEN).collect();
            Value::String(format!("{prefix}... ({} chars)", s.len()))
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_echo).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_echo(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Naming conventions
// ---------------------------------------------------------------------------

/// Deterministic file name for a persisted result artifact.
pub fn result_filename(job_id: JobId, extension: &str) -> String {
    format!("result_{job_id}.{extension}")
}

/// Retrieval-endpoint path used when no artifact could be persisted.
pub fn fallback_result_path(job_id: JobId) -> String {
    format!("/api/v1/jobs/{job_id}/result")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn b64ish(len: usize) -> String {
        "A".repeat(len)
    }

    // -- Selection --

    #[test]
    fn selects_primary_inline_image() {
        let out = json!({ "image": b64ish(200) });
        assert_eq!(
            select_source(MediaKind::Image, Some(&out)),
            OutputSource::Inline {
                field: "image",
                data: b64ish(200)
            }
        );
    }

    #[test]
    fn primary_beats_legacy() {
        let out = json!({
            "image": b64ish(200),
            "image_base64": b64ish(300),
        });
        match select_source(MediaKind::Image, Some(&out)) {
            OutputSource::Inline { field, data } => {
                assert_eq!(field, "image");
                assert_eq!(data.len(), 200);
            }
            other => panic!("expected inline, got {other:?}"),
        }
    }

    #[test]
    fn legacy_used_when_primary_absent() {
        let out = json!({ "image_base64": b64ish(200) });
        match select_source(MediaKind::Image, Some(&out)) {
            OutputSource::Inline { field, .. } => assert_eq!(field, "image_base64"),
            other => panic!("expected inline, got {other:?}"),
        }
    }

    #[test]
    fn url_key_selected_when_no_inline() {
        let out = json!({ "image_url": "https://cdn.example.com/a.png" });
        assert_eq!(
            select_source(MediaKind::Image, Some(&out)),
            OutputSource::RemoteUrl {
                field: "image_url",
                url: "https://cdn.example.com/a.png".into()
            }
        );
    }

    #[test]
    fn primary_key_holding_url_is_remote() {
        let out = json!({ "video": "https://cdn.example.com/a.mp4" });
        assert_eq!(
            select_source(MediaKind::Video, Some(&out)),
            OutputSource::RemoteUrl {
                field: "video",
                url: "https://cdn.example.com/a.mp4".into()
            }
        );
    }

    #[test]
    fn inline_beats_url() {
        let out = json!({
            "image": b64ish(200),
            "image_url": "https://cdn.example.com/a.png",
        });
        assert!(matches!(
            select_source(MediaKind::Image, Some(&out)),
            OutputSource::Inline { field: "image", .. }
        ));
    }

    #[test]
    fn short_string_is_not_inline() {
        let out = json!({ "image": "done" });
        assert_eq!(
            select_source(MediaKind::Image, Some(&out)),
            OutputSource::Unrecognized
        );
    }

    #[test]
    fn video_accepts_mp4_key() {
        let out = json!({ "mp4": b64ish(200) });
        assert!(matches!(
            select_source(MediaKind::Video, Some(&out)),
            OutputSource::Inline { field: "mp4", .. }
        ));
    }

    #[test]
    fn unknown_shape_is_unrecognized() {
        let out = json!({ "frames": [1, 2, 3], "seed": 42 });
        assert_eq!(
            select_source(MediaKind::Image, Some(&out)),
            OutputSource::Unrecognized
        );
        assert_eq!(select_source(MediaKind::Image, None), OutputSource::Unrecognized);
    }

    // -- Redaction --

    #[test]
    fn redact_truncates_long_strings() {
        let long = "B".repeat(5000);
        let out = json!({ "image": long, "seed": 42 });
        let echo = redact_echo(&out);

        let s = echo["image"].as_str().unwrap();
        assert!(s.starts_with(&"B".repeat(100)));
        assert!(s.ends_with("(5000 chars)"));
        assert!(s.len() < 200);
        assert_eq!(echo["seed"], 42);
    }

    #[test]
    fn redact_keeps_short_strings_intact() {
        let out = json!({ "status_detail": "ok", "nested": { "url": "https://x" } });
        assert_eq!(redact_echo(&out), out);
    }

    #[test]
    fn redact_walks_arrays() {
        let out = json!({ "images": ["C".repeat(2000), "small"] });
        let echo = redact_echo(&out);
        assert!(echo["images"][0].as_str().unwrap().ends_with("(2000 chars)"));
        assert_eq!(echo["images"][1], "small");
    }

    // -- Naming --

    #[test]
    fn result_filename_is_deterministic() {
        let id = uuid::Uuid::nil();
        assert_eq!(
            result_filename(id, "png"),
            format!("result_{id}.png")
        );
    }

    #[test]
    fn fallback_path_keyed_by_job_id() {
        let id = uuid::Uuid::nil();
        assert_eq!(
            fallback_result_path(id),
            format!("/api/v1/jobs/{id}/result")
        );
    }
}

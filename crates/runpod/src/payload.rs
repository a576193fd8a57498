//! Model-specific request payload construction.
//!
//! Each catalog model expects a slightly different `input` shape.
//! Builders start from the validated submission parameter map and
//! attach media fields where the model consumes them.

use pixelmill_core::model::ModelSpec;
use serde_json::{Map, Value};

/// Build the `input` object for a submission.
///
/// `params` is the already-validated parameter map stored on the job
/// row. `input_image` and `audio_tracks` carry base64 media for
/// models that consume them; they are ignored for models that do not.
pub fn build_input(
    spec: &ModelSpec,
    params: &Map<String, Value>,
    input_image: Option<&str>,
    audio_tracks: &[String],
) -> Value {
    let mut input = params.clone();

    if spec.takes_input_image {
        if let Some(image) = input_image {
            input.insert("image".to_string(), Value::String(image.to_string()));
        }
    }

    if spec.takes_audio && !audio_tracks.is_empty() {
        input.insert(
            "audios".to_string(),
            Value::Array(
                audio_tracks
                    .iter()
                    .map(|a| Value::String(a.clone()))
                    .collect(),
            ),
        );
    }

    Value::Object(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelmill_core::model::{FLUX_IMAGE, SONIC_AVATAR, WAN_VIDEO};
    use serde_json::json;

    fn params(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn image_payload_passes_params_through() {
        let p = params(json!({ "prompt": "a cat", "seed": 7, "guidance": 3.5 }));
        let input = build_input(&FLUX_IMAGE, &p, None, &[]);
        assert_eq!(input, json!({ "prompt": "a cat", "seed": 7, "guidance": 3.5 }));
    }

    #[test]
    fn video_payload_keeps_dimensions() {
        let p = params(json!({ "prompt": "x", "width": 512, "height": 512, "cfg": 6.0 }));
        let input = build_input(&WAN_VIDEO, &p, None, &[]);
        assert_eq!(input["width"], 512);
        assert_eq!(input["cfg"], 6.0);
    }

    #[test]
    fn avatar_payload_attaches_media() {
        let p = params(json!({}));
        let audios = vec!["QUJD".to_string(), "REVG".to_string()];
        let input = build_input(&SONIC_AVATAR, &p, Some("aW1n"), &audios);
        assert_eq!(input["image"], "aW1n");
        assert_eq!(input["audios"], json!(["QUJD", "REVG"]));
    }

    #[test]
    fn image_model_ignores_media_fields() {
        let p = params(json!({ "prompt": "x" }));
        let input = build_input(&FLUX_IMAGE, &p, Some("aW1n"), &["QUJD".to_string()]);
        assert!(input.get("image").is_none());
        assert!(input.get("audios").is_none());
    }
}

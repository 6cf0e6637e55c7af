//! Provider wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a prediction submission.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRequest {
    pub input: PredictionInput,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionInput {
    pub prompt: String,
    /// Seconds.
    pub duration: u32,
    pub aspect_ratio: String,
    pub seed: u32,
}

/// Provider-side task state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl PredictionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

/// A submitted or polled prediction.
#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub status: PredictionStatus,
    #[serde(default)]
    pub output: Option<Value>,
    /// String or structured error detail.
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Prediction {
    /// Human-readable failure detail.
    pub fn error_detail(&self) -> String {
        match &self.error {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::Null) | None => format!("task {}", self.status_str()),
            Some(other) => other.to_string(),
        }
    }

    fn status_str(&self) -> &'static str {
        match self.status {
            PredictionStatus::Canceled => "canceled",
            _ => "failed",
        }
    }
}

const OUTPUT_URL_KEYS: &[&str] = &["url", "video", "video_url", "output_url"];

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Pull the video URL out of a finished prediction.
///
/// Looks at `output` first (a list, a string, or an object keyed by one of
/// `url`, `video`, `video_url`, `output_url`), then at top-level `video_url`
/// and `url`.
pub fn extract_result_url(prediction: &Prediction) -> Option<String> {
    let from_output = match &prediction.output {
        Some(Value::Array(items)) => items.iter().find_map(|v| v.as_str()).and_then(non_empty),
        Some(Value::String(s)) => non_empty(s),
        Some(Value::Object(map)) => OUTPUT_URL_KEYS
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .and_then(non_empty),
        _ => None,
    };

    from_output
        .or_else(|| prediction.video_url.as_deref().and_then(non_empty))
        .or_else(|| prediction.url.as_deref().and_then(non_empty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prediction(body: Value) -> Prediction {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_extract_from_array() {
        let p = prediction(json!({"id": "t", "status": "succeeded", "output": ["https://cdn/a.mp4", "https://cdn/b.mp4"]}));
        assert_eq!(extract_result_url(&p).as_deref(), Some("https://cdn/a.mp4"));
    }

    #[test]
    fn test_extract_from_string() {
        let p = prediction(json!({"id": "t", "status": "succeeded", "output": "https://cdn/a.mp4"}));
        assert_eq!(extract_result_url(&p).as_deref(), Some("https://cdn/a.mp4"));
    }

    #[test]
    fn test_extract_from_object_keys() {
        for key in OUTPUT_URL_KEYS {
            let mut output = serde_json::Map::new();
            output.insert(key.to_string(), json!("https://cdn/a.mp4"));
            let p = prediction(json!({"id": "t", "status": "succeeded", "output": output}));
            assert_eq!(extract_result_url(&p).as_deref(), Some("https://cdn/a.mp4"), "key {}", key);
        }
    }

    #[test]
    fn test_extract_from_top_level() {
        let p = prediction(json!({"id": "t", "status": "succeeded", "output": null, "video_url": "https://cdn/v.mp4"}));
        assert_eq!(extract_result_url(&p).as_deref(), Some("https://cdn/v.mp4"));

        let p = prediction(json!({"id": "t", "status": "succeeded", "url": "https://cdn/u.mp4"}));
        assert_eq!(extract_result_url(&p).as_deref(), Some("https://cdn/u.mp4"));
    }

    #[test]
    fn test_extract_none() {
        let p = prediction(json!({"id": "t", "status": "succeeded", "output": {"frames": 120}}));
        assert!(extract_result_url(&p).is_none());

        let p = prediction(json!({"id": "t", "status": "succeeded", "output": ["  "]}));
        assert!(extract_result_url(&p).is_none());
    }

    #[test]
    fn test_unknown_status_is_not_terminal() {
        let p = prediction(json!({"id": "t", "status": "queued"}));
        assert_eq!(p.status, PredictionStatus::Unknown);
        assert!(!p.status.is_terminal());
    }

    #[test]
    fn test_error_detail() {
        let p = prediction(json!({"id": "t", "status": "failed", "error": "NSFW content detected"}));
        assert_eq!(p.error_detail(), "NSFW content detected");

        let p = prediction(json!({"id": "t", "status": "canceled"}));
        assert_eq!(p.error_detail(), "task canceled");
    }
}

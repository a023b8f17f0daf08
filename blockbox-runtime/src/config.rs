use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the client runtime. Hosts usually take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeConfig {
    /// Prefix for persisted collapse state keys
    pub storage_prefix: String,
    pub library_load_timeout_ms: u64,
    pub capture_timeout_ms: u64,
    /// Largest canvas side on desktop browsers
    pub max_canvas_desktop: u32,
    /// Largest canvas side on Apple and mobile browsers
    pub max_canvas_constrained: u32,
    pub toast_duration_ms: u64,
    pub html_to_image_url: String,
    pub html2canvas_url: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            storage_prefix: "blockbox-collapse-".to_string(),
            library_load_timeout_ms: 10_000,
            capture_timeout_ms: 15_000,
            max_canvas_desktop: 16_384,
            max_canvas_constrained: 4_096,
            toast_duration_ms: 3_000,
            html_to_image_url: "https://cdn.jsdelivr.net/npm/html-to-image@1.11.11/dist/html-to-image.js"
                .to_string(),
            html2canvas_url: "https://cdn.jsdelivr.net/npm/html2canvas@1.4.1/dist/html2canvas.min.js"
                .to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn library_load_timeout(&self) -> Duration {
        Duration::from_millis(self.library_load_timeout_ms)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }

    pub fn storage_key(&self, instance_id: &str) -> String {
        format!("{}{}", self.storage_prefix, instance_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: RuntimeConfig = serde_json::from_str(r#"{"captureTimeoutMs": 500}"#).unwrap();
        assert_eq!(config.capture_timeout(), Duration::from_millis(500));
        assert_eq!(config.library_load_timeout(), Duration::from_secs(10));
        assert_eq!(config.storage_key("intro"), "blockbox-collapse-intro");
    }
}

use serde::{Deserialize, Serialize};

use crate::feature::RawFeatures;
use crate::lenient;
use crate::validator::is_safe_class_list;
use crate::style::RawStyles;

/// Block attributes authored in the editor and embedded in page content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockInstance {
    pub selected_preset_slug: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub custom_classes: String,
    /// Style override layered over the preset's styles
    #[serde(deserialize_with = "lenient_styles")]
    pub config_override: RawStyles,
    #[serde(deserialize_with = "lenient_features")]
    pub features_override: RawFeatures,
    /// Stable element id; also keys persisted collapse state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    /// Header label; the preset name is used when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl BlockInstance {
    pub fn for_preset(slug: impl Into<String>) -> Self {
        BlockInstance {
            selected_preset_slug: slug.into(),
            ..Default::default()
        }
    }

    /// Custom classes split into tokens, dropping anything unsafe for a class attribute.
    pub fn class_tokens(&self) -> Vec<String> {
        self.custom_classes
            .split_whitespace()
            .filter(|t| is_safe_class_list(t))
            .map(str::to_string)
            .collect()
    }
}

// Overrides arrive either as objects or as JSON strings in block comments.
fn lenient_styles<'de, D>(deserializer: D) -> Result<RawStyles, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(lenient::from_json_value(&value))
}

fn lenient_features<'de, D>(deserializer: D) -> Result<RawFeatures, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(lenient::from_json_value(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_attributes() {
        let instance: BlockInstance = serde_json::from_value(json!({})).unwrap();
        assert_eq!(instance, BlockInstance::default());
    }

    #[test]
    fn test_string_encoded_overrides() {
        let instance: BlockInstance = serde_json::from_value(json!({
            "selectedPresetSlug": "info-box",
            "featuresOverride": "{\"collapse\": {\"enabled\": true}}",
            "configOverride": "not json"
        }))
        .unwrap();
        assert_eq!(instance.features_override.collapse.unwrap().enabled, Some(true));
        assert_eq!(instance.config_override, RawStyles::default());
    }

    #[test]
    fn test_class_tokens_drop_unsafe() {
        let instance = BlockInstance {
            custom_classes: "wide  is-style-note \"><script>".to_string(),
            ..Default::default()
        };
        assert_eq!(instance.class_tokens(), vec!["wide", "is-style-note"]);
    }
}

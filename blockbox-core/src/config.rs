use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::BlockResult;
use crate::feature::{RawCollapse, RawCopyText, RawIcon, RawNumbering, RawScreenshot};

/// Site-wide policy and default parameters for one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    default,
    bound(deserialize = "T: Deserialize<'de> + Default")
)]
pub struct FeatureDefault<T> {
    /// Whether the feature is on when neither preset nor block says otherwise
    pub enabled: bool,
    /// Whether a block instance may override the preset for this feature
    pub allow_override: bool,
    /// Default parameters, merged under the preset's
    pub defaults: T,
}

impl<T: Default> Default for FeatureDefault<T> {
    fn default() -> Self {
        FeatureDefault {
            enabled: false,
            allow_override: true,
            defaults: T::default(),
        }
    }
}

/// Admin-configurable defaults for every feature
///
/// Loaded from YAML (or JSON, which YAML accepts):
/// ```yaml
/// icon:
///   enabled: true
///   allowOverride: false
///   defaults:
///     value: dashicons-lightbulb
/// numbering:
///   defaults:
///     format: roman
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalDefaults {
    pub icon: FeatureDefault<RawIcon>,
    pub collapse: FeatureDefault<RawCollapse>,
    pub numbering: FeatureDefault<RawNumbering>,
    pub copy_text: FeatureDefault<RawCopyText>,
    pub screenshot: FeatureDefault<RawScreenshot>,
}

impl GlobalDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml(input: &str) -> BlockResult<Self> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(input)?)
    }

    pub fn load(path: impl AsRef<Path>) -> BlockResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let defaults = Self::from_yaml(&content)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded global feature defaults");
        Ok(defaults)
    }
}

//! The five optional container features and their three-level resolution
//! (global default → preset → block instance).

use serde::{Deserialize, Serialize};

use crate::config::{FeatureDefault, GlobalDefaults};
use crate::lenient;
use crate::merge::{merge_nested, merge_value, Merge};
use crate::numbering::NumberFormat;
use crate::position::{Anchor, PositionSettings, RawPositionSettings};
use crate::style::in_range;
use crate::validator::{is_safe_class_list, is_valid_color};

pub const DEFAULT_ICON: &str = "dashicons-info";
pub const DEFAULT_ANIMATION_SPEED: u32 = 300;
pub const ANIMATION_SPEED_RANGE: (f64, f64) = (0.0, 5000.0);
pub const START_FROM_RANGE: (f64, f64) = (1.0, 1_000_000.0);
pub const QUALITY_RANGE: (f64, f64) = (0.1, 1.0);
pub const DEFAULT_QUALITY: f64 = 0.92;
pub const DEFAULT_COPY_BUTTON_TEXT: &str = "Copy";
pub const DEFAULT_SCREENSHOT_BUTTON_TEXT: &str = "Screenshot";
pub const DEFAULT_SCREENSHOT_FILENAME: &str = "container-screenshot";
pub const MAX_AFFIX_LEN: usize = 20;
pub const MAX_BUTTON_TEXT_LEN: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureKind {
    Icon,
    Collapse,
    Numbering,
    CopyText,
    Screenshot,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 5] = [
        FeatureKind::Icon,
        FeatureKind::Collapse,
        FeatureKind::Numbering,
        FeatureKind::CopyText,
        FeatureKind::Screenshot,
    ];

    /// Key used in stored JSON
    pub fn key(&self) -> &'static str {
        match self {
            FeatureKind::Icon => "icon",
            FeatureKind::Collapse => "collapse",
            FeatureKind::Numbering => "numbering",
            FeatureKind::CopyText => "copyText",
            FeatureKind::Screenshot => "screenshot",
        }
    }

    /// Name used in CSS classes and `data-*` attributes
    pub fn css_name(&self) -> &'static str {
        match self {
            FeatureKind::Icon => "icon",
            FeatureKind::Collapse => "collapse",
            FeatureKind::Numbering => "numbering",
            FeatureKind::CopyText => "copy-text",
            FeatureKind::Screenshot => "screenshot",
        }
    }

    pub fn enable_attribute(&self) -> String {
        format!("data-enable-{}", self.css_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollapseState {
    #[default]
    Expanded,
    Collapsed,
}

impl CollapseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollapseState::Expanded => "expanded",
            CollapseState::Collapsed => "collapsed",
        }
    }

    pub fn parse(value: &str) -> Option<CollapseState> {
        match value.trim() {
            "expanded" => Some(CollapseState::Expanded),
            "collapsed" => Some(CollapseState::Collapsed),
            _ => None,
        }
    }

    pub fn toggled(&self) -> CollapseState {
        match self {
            CollapseState::Expanded => CollapseState::Collapsed,
            CollapseState::Collapsed => CollapseState::Expanded,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyFormat {
    #[default]
    Text,
    Html,
}

impl CopyFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyFormat::Text => "text",
            CopyFormat::Html => "html",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }
}

// --- Raw (stored / override) feature settings ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawIcon {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::flag")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub position: Option<RawPositionSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCollapse {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::flag")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub default_state: Option<CollapseState>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::number")]
    pub animation_speed: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawNumbering {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::flag")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub format: Option<NumberFormat>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::number")]
    pub start_from: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub position: Option<RawPositionSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCopyText {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::flag")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub button_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub format: Option<CopyFormat>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawScreenshot {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::flag")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub button_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub format: Option<ImageFormat>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::number")]
    pub quality: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub filename: Option<String>,
}

/// Feature map as stored in a preset or carried by a block override
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFeatures {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub icon: Option<RawIcon>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub collapse: Option<RawCollapse>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub numbering: Option<RawNumbering>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub copy_text: Option<RawCopyText>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub screenshot: Option<RawScreenshot>,
}

/// Access to the `enabled` flag every raw feature level carries.
pub trait FeatureLayer: Merge + Clone + Default {
    fn enabled(&self) -> Option<bool>;
    fn set_enabled(&mut self, enabled: Option<bool>);
}

macro_rules! feature_layer {
    ($($ty:ty),*) => {
        $(impl FeatureLayer for $ty {
            fn enabled(&self) -> Option<bool> {
                self.enabled
            }
            fn set_enabled(&mut self, enabled: Option<bool>) {
                self.enabled = enabled;
            }
        })*
    };
}

feature_layer!(RawIcon, RawCollapse, RawNumbering, RawCopyText, RawScreenshot);

impl Merge for RawIcon {
    fn merge_from(&mut self, other: &Self) {
        merge_value(&mut self.enabled, &other.enabled);
        merge_value(&mut self.value, &other.value);
        merge_value(&mut self.color, &other.color);
        merge_nested(&mut self.position, &other.position);
    }
}

impl Merge for RawCollapse {
    fn merge_from(&mut self, other: &Self) {
        merge_value(&mut self.enabled, &other.enabled);
        merge_value(&mut self.default_state, &other.default_state);
        merge_value(&mut self.animation_speed, &other.animation_speed);
    }
}

impl Merge for RawNumbering {
    fn merge_from(&mut self, other: &Self) {
        merge_value(&mut self.enabled, &other.enabled);
        merge_value(&mut self.format, &other.format);
        merge_value(&mut self.start_from, &other.start_from);
        merge_value(&mut self.prefix, &other.prefix);
        merge_value(&mut self.suffix, &other.suffix);
        merge_nested(&mut self.position, &other.position);
    }
}

impl Merge for RawCopyText {
    fn merge_from(&mut self, other: &Self) {
        merge_value(&mut self.enabled, &other.enabled);
        merge_value(&mut self.button_text, &other.button_text);
        merge_value(&mut self.format, &other.format);
    }
}

impl Merge for RawScreenshot {
    fn merge_from(&mut self, other: &Self) {
        merge_value(&mut self.enabled, &other.enabled);
        merge_value(&mut self.button_text, &other.button_text);
        merge_value(&mut self.format, &other.format);
        merge_value(&mut self.quality, &other.quality);
        merge_value(&mut self.filename, &other.filename);
    }
}

impl Merge for RawFeatures {
    fn merge_from(&mut self, other: &Self) {
        merge_nested(&mut self.icon, &other.icon);
        merge_nested(&mut self.collapse, &other.collapse);
        merge_nested(&mut self.numbering, &other.numbering);
        merge_nested(&mut self.copy_text, &other.copy_text);
        merge_nested(&mut self.screenshot, &other.screenshot);
    }
}

// --- Resolved feature settings ---

#[derive(Debug, Clone, PartialEq)]
pub struct IconSettings {
    pub value: String,
    pub color: Option<String>,
    pub position: Option<PositionSettings>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollapseSettings {
    pub default_state: CollapseState,
    pub animation_speed: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberingSettings {
    pub format: NumberFormat,
    pub start_from: u32,
    pub prefix: String,
    pub suffix: String,
    pub position: Option<PositionSettings>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CopyTextSettings {
    pub button_text: String,
    pub format: CopyFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenshotSettings {
    pub button_text: String,
    pub format: ImageFormat,
    pub quality: f64,
    pub filename: String,
}

impl IconSettings {
    pub fn resolve(raw: &RawIcon) -> Self {
        let value = match raw.value.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() && is_safe_class_list(v) => v.to_string(),
            Some(v) => {
                tracing::warn!(icon = v, "unsafe icon class, using default");
                DEFAULT_ICON.to_string()
            }
            None => DEFAULT_ICON.to_string(),
        };
        IconSettings {
            value,
            color: raw
                .color
                .as_deref()
                .map(str::trim)
                .filter(|c| is_valid_color(c))
                .map(str::to_string),
            position: raw
                .position
                .as_ref()
                .map(|p| PositionSettings::resolve(p, Anchor::TopLeft)),
        }
    }

    fn to_raw(&self) -> RawIcon {
        RawIcon {
            enabled: None,
            value: Some(self.value.clone()),
            color: self.color.clone(),
            position: self.position.as_ref().map(PositionSettings::to_raw),
        }
    }
}

impl CollapseSettings {
    pub fn resolve(raw: &RawCollapse) -> Self {
        CollapseSettings {
            default_state: raw.default_state.unwrap_or_default(),
            animation_speed: in_range(
                raw.animation_speed,
                ANIMATION_SPEED_RANGE,
                DEFAULT_ANIMATION_SPEED as f64,
            )
            .round() as u32,
        }
    }

    fn to_raw(&self) -> RawCollapse {
        RawCollapse {
            enabled: None,
            default_state: Some(self.default_state),
            animation_speed: Some(self.animation_speed as f64),
        }
    }
}

impl NumberingSettings {
    pub fn resolve(raw: &RawNumbering) -> Self {
        NumberingSettings {
            format: raw.format.unwrap_or_default(),
            start_from: in_range(raw.start_from, START_FROM_RANGE, 1.0).floor() as u32,
            prefix: bounded_text(raw.prefix.as_deref(), MAX_AFFIX_LEN, ""),
            suffix: bounded_text(raw.suffix.as_deref(), MAX_AFFIX_LEN, ""),
            position: raw
                .position
                .as_ref()
                .map(|p| PositionSettings::resolve(p, Anchor::TopRight)),
        }
    }

    fn to_raw(&self) -> RawNumbering {
        RawNumbering {
            enabled: None,
            format: Some(self.format),
            start_from: Some(self.start_from as f64),
            prefix: Some(self.prefix.clone()),
            suffix: Some(self.suffix.clone()),
            position: self.position.as_ref().map(PositionSettings::to_raw),
        }
    }
}

impl CopyTextSettings {
    pub fn resolve(raw: &RawCopyText) -> Self {
        CopyTextSettings {
            button_text: bounded_text(
                raw.button_text.as_deref(),
                MAX_BUTTON_TEXT_LEN,
                DEFAULT_COPY_BUTTON_TEXT,
            ),
            format: raw.format.unwrap_or_default(),
        }
    }

    fn to_raw(&self) -> RawCopyText {
        RawCopyText {
            enabled: None,
            button_text: Some(self.button_text.clone()),
            format: Some(self.format),
        }
    }
}

impl ScreenshotSettings {
    pub fn resolve(raw: &RawScreenshot) -> Self {
        let filename = raw
            .filename
            .as_deref()
            .map(sanitize_filename)
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| DEFAULT_SCREENSHOT_FILENAME.to_string());
        ScreenshotSettings {
            button_text: bounded_text(
                raw.button_text.as_deref(),
                MAX_BUTTON_TEXT_LEN,
                DEFAULT_SCREENSHOT_BUTTON_TEXT,
            ),
            format: raw.format.unwrap_or_default(),
            quality: in_range(raw.quality, QUALITY_RANGE, DEFAULT_QUALITY),
            filename,
        }
    }

    fn to_raw(&self) -> RawScreenshot {
        RawScreenshot {
            enabled: None,
            button_text: Some(self.button_text.clone()),
            format: Some(self.format),
            quality: Some(self.quality),
            filename: Some(self.filename.clone()),
        }
    }
}

/// One feature with its resolved parameters
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureConfig {
    Icon(IconSettings),
    Collapse(CollapseSettings),
    Numbering(NumberingSettings),
    CopyText(CopyTextSettings),
    Screenshot(ScreenshotSettings),
}

impl FeatureConfig {
    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureConfig::Icon(_) => FeatureKind::Icon,
            FeatureConfig::Collapse(_) => FeatureKind::Collapse,
            FeatureConfig::Numbering(_) => FeatureKind::Numbering,
            FeatureConfig::CopyText(_) => FeatureKind::CopyText,
            FeatureConfig::Screenshot(_) => FeatureKind::Screenshot,
        }
    }

    /// `data-<feature>-<param>` attributes the client runtime reads.
    pub fn data_attributes(&self) -> Vec<(String, String)> {
        let name = self.kind().css_name();
        let attr = |param: &str, value: String| (format!("data-{}-{}", name, param), value);
        match self {
            FeatureConfig::Icon(s) => {
                let mut attrs = vec![attr("value", s.value.clone())];
                if let Some(color) = &s.color {
                    attrs.push(attr("color", color.clone()));
                }
                if let Some(pos) = &s.position {
                    attrs.push(attr("placement", pos.placement.as_str().to_string()));
                    attrs.push(attr("position", pos.position_name()));
                }
                attrs
            }
            FeatureConfig::Collapse(s) => vec![
                attr("default-state", s.default_state.as_str().to_string()),
                attr("animation-speed", s.animation_speed.to_string()),
            ],
            FeatureConfig::Numbering(s) => {
                let mut attrs = vec![
                    attr("format", s.format.as_str().to_string()),
                    attr("start-from", s.start_from.to_string()),
                    attr("prefix", s.prefix.clone()),
                    attr("suffix", s.suffix.clone()),
                ];
                if let Some(pos) = &s.position {
                    attrs.push(attr("placement", pos.placement.as_str().to_string()));
                    attrs.push(attr("position", pos.position_name()));
                }
                attrs
            }
            FeatureConfig::CopyText(s) => vec![
                attr("button-text", s.button_text.clone()),
                attr("format", s.format.as_str().to_string()),
            ],
            FeatureConfig::Screenshot(s) => vec![
                attr("button-text", s.button_text.clone()),
                attr("format", s.format.as_str().to_string()),
                attr("quality", s.quality.to_string()),
                attr("filename", s.filename.clone()),
            ],
        }
    }
}

/// A feature's on/off state plus its parameters (kept even when disabled)
#[derive(Debug, Clone, PartialEq)]
pub struct Toggle<T> {
    pub enabled: bool,
    pub settings: T,
}

impl<T> Toggle<T> {
    pub fn enabled_settings(&self) -> Option<&T> {
        self.enabled.then_some(&self.settings)
    }
}

/// Effective feature map for one rendered instance
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
    pub icon: Toggle<IconSettings>,
    pub collapse: Toggle<CollapseSettings>,
    pub numbering: Toggle<NumberingSettings>,
    pub copy_text: Toggle<CopyTextSettings>,
    pub screenshot: Toggle<ScreenshotSettings>,
}

impl Features {
    pub fn is_enabled(&self, kind: FeatureKind) -> bool {
        match kind {
            FeatureKind::Icon => self.icon.enabled,
            FeatureKind::Collapse => self.collapse.enabled,
            FeatureKind::Numbering => self.numbering.enabled,
            FeatureKind::CopyText => self.copy_text.enabled,
            FeatureKind::Screenshot => self.screenshot.enabled,
        }
    }

    /// Enabled features in canonical order.
    pub fn enabled(&self) -> Vec<FeatureConfig> {
        let mut out = Vec::new();
        if let Some(s) = self.icon.enabled_settings() {
            out.push(FeatureConfig::Icon(s.clone()));
        }
        if let Some(s) = self.collapse.enabled_settings() {
            out.push(FeatureConfig::Collapse(s.clone()));
        }
        if let Some(s) = self.numbering.enabled_settings() {
            out.push(FeatureConfig::Numbering(s.clone()));
        }
        if let Some(s) = self.copy_text.enabled_settings() {
            out.push(FeatureConfig::CopyText(s.clone()));
        }
        if let Some(s) = self.screenshot.enabled_settings() {
            out.push(FeatureConfig::Screenshot(s.clone()));
        }
        out
    }

    /// Positioned decorations placed outside the container bounds.
    pub fn has_outside_decorations(&self) -> bool {
        let icon = self
            .icon
            .enabled_settings()
            .and_then(|s| s.position.as_ref())
            .is_some_and(PositionSettings::is_outside);
        let numbering = self
            .numbering
            .enabled_settings()
            .and_then(|s| s.position.as_ref())
            .is_some_and(PositionSettings::is_outside);
        icon || numbering
    }

    /// Fully specified storage form; resolving it again yields `self`.
    pub fn to_raw(&self) -> RawFeatures {
        fn with_flag<T: FeatureLayer>(mut raw: T, enabled: bool) -> Option<T> {
            raw.set_enabled(Some(enabled));
            Some(raw)
        }
        RawFeatures {
            icon: with_flag(self.icon.settings.to_raw(), self.icon.enabled),
            collapse: with_flag(self.collapse.settings.to_raw(), self.collapse.enabled),
            numbering: with_flag(self.numbering.settings.to_raw(), self.numbering.enabled),
            copy_text: with_flag(self.copy_text.settings.to_raw(), self.copy_text.enabled),
            screenshot: with_flag(self.screenshot.settings.to_raw(), self.screenshot.enabled),
        }
    }
}

/// Merge global defaults, a preset's features and a block override into one
/// effective feature map.
///
/// Parameters merge field by field. An instance override is only honoured for
/// features whose global policy allows overriding; otherwise it is dropped.
pub fn resolve_features(
    global: &GlobalDefaults,
    preset: &RawFeatures,
    instance: &RawFeatures,
) -> Features {
    let (icon_on, icon) = layer(FeatureKind::Icon, &global.icon, preset.icon.as_ref(), instance.icon.as_ref());
    let (collapse_on, collapse) = layer(
        FeatureKind::Collapse,
        &global.collapse,
        preset.collapse.as_ref(),
        instance.collapse.as_ref(),
    );
    let (numbering_on, numbering) = layer(
        FeatureKind::Numbering,
        &global.numbering,
        preset.numbering.as_ref(),
        instance.numbering.as_ref(),
    );
    let (copy_on, copy_text) = layer(
        FeatureKind::CopyText,
        &global.copy_text,
        preset.copy_text.as_ref(),
        instance.copy_text.as_ref(),
    );
    let (shot_on, screenshot) = layer(
        FeatureKind::Screenshot,
        &global.screenshot,
        preset.screenshot.as_ref(),
        instance.screenshot.as_ref(),
    );

    Features {
        icon: Toggle { enabled: icon_on, settings: IconSettings::resolve(&icon) },
        collapse: Toggle { enabled: collapse_on, settings: CollapseSettings::resolve(&collapse) },
        numbering: Toggle { enabled: numbering_on, settings: NumberingSettings::resolve(&numbering) },
        copy_text: Toggle { enabled: copy_on, settings: CopyTextSettings::resolve(&copy_text) },
        screenshot: Toggle { enabled: shot_on, settings: ScreenshotSettings::resolve(&screenshot) },
    }
}

fn layer<T: FeatureLayer>(
    kind: FeatureKind,
    default: &FeatureDefault<T>,
    preset: Option<&T>,
    instance: Option<&T>,
) -> (bool, T) {
    let mut raw = default.defaults.clone();
    raw.set_enabled(Some(default.enabled));
    if let Some(preset) = preset {
        raw.merge_from(preset);
    }
    if let Some(instance) = instance {
        if default.allow_override {
            raw.merge_from(instance);
        } else {
            tracing::debug!(feature = kind.key(), "instance override ignored: overriding disallowed");
        }
    }
    (raw.enabled().unwrap_or(default.enabled), raw)
}

fn bounded_text(value: Option<&str>, max_len: usize, default: &str) -> String {
    match value {
        Some(v) => v.chars().filter(|c| !c.is_control()).take(max_len).collect(),
        None => default.to_string(),
    }
}

fn sanitize_filename(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .take(80)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawFeatures {
        serde_json::from_value(value).unwrap()
    }

    fn globals_with_icon(enabled: bool, allow_override: bool) -> GlobalDefaults {
        let mut g = GlobalDefaults::default();
        g.icon.enabled = enabled;
        g.icon.allow_override = allow_override;
        g
    }

    #[test]
    fn test_instance_wins_when_override_allowed() {
        let global = globals_with_icon(false, true);
        let preset = raw(json!({"icon": {"enabled": true}}));
        let instance = raw(json!({"icon": {"enabled": false}}));
        let features = resolve_features(&global, &preset, &instance);
        assert!(!features.icon.enabled);
    }

    #[test]
    fn test_preset_wins_when_override_disallowed() {
        let global = globals_with_icon(false, false);
        let preset = raw(json!({"icon": {"enabled": true}}));
        let instance = raw(json!({"icon": {"enabled": false, "value": "dashicons-warning"}}));
        let features = resolve_features(&global, &preset, &instance);
        assert!(features.icon.enabled);
        assert_eq!(features.icon.settings.value, DEFAULT_ICON);
    }

    #[test]
    fn test_global_default_applies_without_preset_entry() {
        let global = globals_with_icon(true, true);
        let features = resolve_features(&global, &RawFeatures::default(), &RawFeatures::default());
        assert!(features.icon.enabled);
        assert!(!features.collapse.enabled);
    }

    #[test]
    fn test_partial_override_keeps_preset_parameters() {
        let global = GlobalDefaults::default();
        let preset = raw(json!({"icon": {"enabled": false, "value": "icon-info", "color": "#ff0000"}}));
        let instance = raw(json!({"icon": {"enabled": true}}));
        let features = resolve_features(&global, &preset, &instance);
        assert!(features.icon.enabled);
        assert_eq!(features.icon.settings.value, "icon-info");
        assert_eq!(features.icon.settings.color.as_deref(), Some("#ff0000"));
    }

    #[test]
    fn test_nested_position_merges_field_by_field() {
        let global = GlobalDefaults::default();
        let preset = raw(json!({"numbering": {"enabled": true,
            "position": {"placement": "outside", "position": "outside-top-right", "offsetX": 8}}}));
        let instance = raw(json!({"numbering": {"position": {"offsetY": 4}}}));
        let features = resolve_features(&global, &preset, &instance);
        let pos = features.numbering.settings.position.unwrap();
        assert_eq!(pos.position_name(), "outside-top-right");
        assert_eq!(pos.offset_x, 8.0);
        assert_eq!(pos.offset_y, 4.0);
    }

    #[test]
    fn test_settings_defaults() {
        let features = resolve_features(&GlobalDefaults::default(), &RawFeatures::default(), &RawFeatures::default());
        assert_eq!(features.collapse.settings.default_state, CollapseState::Expanded);
        assert_eq!(features.collapse.settings.animation_speed, 300);
        assert_eq!(features.numbering.settings.format, NumberFormat::Numeric);
        assert_eq!(features.numbering.settings.start_from, 1);
        assert_eq!(features.copy_text.settings.button_text, "Copy");
        assert_eq!(features.screenshot.settings.format, ImageFormat::Png);
        assert_eq!(features.screenshot.settings.quality, DEFAULT_QUALITY);
        assert!(features.enabled().is_empty());
    }

    #[test]
    fn test_alphabetic_alias_and_bad_enum() {
        let preset = raw(json!({"numbering": {"format": "alphabetic"}, "collapse": {"defaultState": "sideways"}}));
        let features = resolve_features(&GlobalDefaults::default(), &preset, &RawFeatures::default());
        assert_eq!(features.numbering.settings.format, NumberFormat::Alpha);
        assert_eq!(features.collapse.settings.default_state, CollapseState::Expanded);
    }

    #[test]
    fn test_unsafe_icon_value_falls_back() {
        let preset = raw(json!({"icon": {"enabled": true, "value": "x\" onmouseover=\"alert(1)"}}));
        let features = resolve_features(&GlobalDefaults::default(), &preset, &RawFeatures::default());
        assert_eq!(features.icon.settings.value, DEFAULT_ICON);
    }

    #[test]
    fn test_features_round_trip() {
        let preset = raw(json!({
            "icon": {"enabled": true, "value": "icon-info", "position": {"placement": "inside", "position": "top-right"}},
            "collapse": {"enabled": true, "defaultState": "collapsed", "animationSpeed": 150},
            "numbering": {"enabled": true, "format": "roman", "startFrom": 3, "prefix": "#", "suffix": ")"},
            "copyText": {"enabled": false, "buttonText": "Grab", "format": "html"},
            "screenshot": {"enabled": true, "format": "jpeg", "quality": 0.5, "filename": "shot"}
        }));
        let global = GlobalDefaults::default();
        let once = resolve_features(&global, &preset, &RawFeatures::default());
        let twice = resolve_features(&global, &once.to_raw(), &RawFeatures::default());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_data_attributes_follow_feature_name() {
        let preset = raw(json!({"copyText": {"enabled": true, "buttonText": "Copy"}}));
        let features = resolve_features(&GlobalDefaults::default(), &preset, &RawFeatures::default());
        let enabled = features.enabled();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].kind().enable_attribute(), "data-enable-copy-text");
        assert!(enabled[0]
            .data_attributes()
            .contains(&("data-copy-text-button-text".to_string(), "Copy".to_string())));
    }
}

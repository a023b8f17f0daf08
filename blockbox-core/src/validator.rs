//! Save-boundary checks for presets submitted from the admin UI.
//!
//! Identity fields (name, slug) are validated strictly and rejected with a
//! [`BlockError`]. Style and feature substructures are sanitized instead:
//! invalid entries are dropped so the resolvers fall back to defaults, and each
//! drop is reported as an issue the admin UI can show.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::OnceLock;

use crate::error::{BlockError, BlockResult};
use crate::feature::{
    CollapseState, CopyFormat, ImageFormat, RawFeatures, ANIMATION_SPEED_RANGE, MAX_AFFIX_LEN,
    MAX_BUTTON_TEXT_LEN, QUALITY_RANGE, START_FROM_RANGE,
};
use crate::lenient;
use crate::numbering::NumberFormat;
use crate::position::{Placement, RawPositionSettings, OFFSET_RANGE, Z_INDEX_RANGE};
use crate::preset::{Preset, PresetSource};
use crate::style::{
    RawBox, RawStyles, TextAlign, BORDER_RADIUS_RANGE, BORDER_WIDTH_RANGE, MARGIN_RANGE,
    PADDING_RANGE, SHADOW_BLUR_RANGE, SHADOW_OFFSET_RANGE,
};

const MAX_NAME_LEN: usize = 100;
const MAX_SLUG_LEN: usize = 64;
const MAX_DESCRIPTION_LEN: usize = 500;

const NAMED_COLORS: &[&str] = &[
    "red", "blue", "green", "white", "black", "transparent", "yellow", "orange", "purple",
    "pink", "gray", "grey", "inherit", "currentcolor",
];

pub fn is_valid_color(color: &str) -> bool {
    static HEX_COLOR_REGEX: OnceLock<Regex> = OnceLock::new();
    static FUNC_COLOR_REGEX: OnceLock<Regex> = OnceLock::new();
    let hex = HEX_COLOR_REGEX
        .get_or_init(|| Regex::new(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").unwrap());
    let func = FUNC_COLOR_REGEX.get_or_init(|| {
        Regex::new(r"^(rgb|rgba|hsl|hsla)\(\s*[0-9.%]+\s*,\s*[0-9.%]+\s*,\s*[0-9.%]+\s*(,\s*[0-9.]+\s*)?\)$").unwrap()
    });
    hex.is_match(color) || func.is_match(color) || NAMED_COLORS.contains(&color.to_lowercase().as_str())
}

/// Class-attribute tokens: letters, digits, `-`, `_` and spaces.
pub fn is_safe_class_list(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' '))
}

pub fn validate_color(color: &str, property: &str) -> BlockResult<()> {
    if is_valid_color(color) {
        Ok(())
    } else {
        Err(BlockError::InvalidColor {
            property: property.to_string(),
            value: color.to_string(),
        })
    }
}

fn validate_range(value: f64, range: (f64, f64), property: &str) -> BlockResult<()> {
    if value < range.0 || value > range.1 {
        Err(BlockError::ValueOutOfRange {
            property: property.to_string(),
            value: value.to_string(),
            range: format!("{} to {}", range.0, range.1),
        })
    } else {
        Ok(())
    }
}

pub fn validate_slug(slug: &str) -> BlockResult<()> {
    static SLUG_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = SLUG_REGEX.get_or_init(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").unwrap());
    if slug.len() > MAX_SLUG_LEN || !re.is_match(slug) {
        return Err(BlockError::InvalidSlug { slug: slug.to_string() });
    }
    Ok(())
}

/// Derive a slug from a display name (`"Info Box!"` → `"info-box"`).
pub fn slugify(name: &str) -> String {
    let mut slug = String::new();
    for c in name.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let trimmed = slug.trim_end_matches('-');
    trimmed.chars().take(MAX_SLUG_LEN).collect::<String>().trim_end_matches('-').to_string()
}

/// Validate identity fields of a preset about to be saved. `existing` is used
/// to enforce slug uniqueness; `is_update` allows the preset's own slug.
pub fn validate_preset_identity(
    preset: &Preset,
    existing: &dyn PresetSource,
    is_update: bool,
) -> BlockResult<()> {
    if preset.name.trim().is_empty() {
        return Err(BlockError::MissingField { field: "name".to_string() });
    }
    if preset.name.chars().count() > MAX_NAME_LEN {
        return Err(BlockError::ValidationError(format!(
            "Preset name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    if preset.description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(BlockError::ValidationError(format!(
            "Preset description must be at most {} characters",
            MAX_DESCRIPTION_LEN
        )));
    }
    validate_slug(&preset.slug)?;
    let taken = existing.get_by_slug(&preset.slug)?.is_some();
    if taken && !is_update {
        return Err(BlockError::DuplicateSlug { slug: preset.slug.clone() });
    }
    if !taken && is_update {
        return Err(BlockError::PresetNotFound { slug: preset.slug.clone() });
    }
    Ok(())
}

/// A sanitized value plus the problems that were removed from it
#[derive(Debug, Clone, PartialEq)]
pub struct Sanitized<T> {
    pub value: T,
    pub issues: Vec<BlockError>,
}

impl<T> Sanitized<T> {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

fn check_number(value: &mut Option<f64>, range: (f64, f64), property: &str, issues: &mut Vec<BlockError>) {
    if let Some(v) = *value {
        if let Err(e) = validate_range(v, range, property) {
            issues.push(e);
            *value = None;
        }
    }
}

fn check_color(value: &mut Option<String>, property: &str, issues: &mut Vec<BlockError>) {
    if let Some(c) = value.as_deref() {
        if let Err(e) = validate_color(c.trim(), property) {
            issues.push(e);
            *value = None;
        }
    }
}

fn check_text(value: &mut Option<String>, max_len: usize, property: &str, issues: &mut Vec<BlockError>) {
    if let Some(text) = value.as_deref() {
        let len = text.chars().count();
        if len > max_len {
            issues.push(BlockError::ValueOutOfRange {
                property: property.to_string(),
                value: format!("{} characters", len),
                range: format!("at most {} characters", max_len),
            });
            *value = Some(text.chars().take(max_len).collect());
        }
    }
}

fn check_box(raw: &mut Option<RawBox>, range: (f64, f64), property: &str, issues: &mut Vec<BlockError>) {
    if let Some(b) = raw.as_mut() {
        check_number(&mut b.top, range, &format!("{}.top", property), issues);
        check_number(&mut b.right, range, &format!("{}.right", property), issues);
        check_number(&mut b.bottom, range, &format!("{}.bottom", property), issues);
        check_number(&mut b.left, range, &format!("{}.left", property), issues);
    }
}

pub fn sanitize_styles(styles: &RawStyles) -> Sanitized<RawStyles> {
    let mut value = styles.clone();
    let mut issues = Vec::new();

    check_box(&mut value.padding, PADDING_RANGE, "padding", &mut issues);
    check_box(&mut value.margin, MARGIN_RANGE, "margin", &mut issues);
    if let Some(bg) = value.background.as_mut() {
        check_color(&mut bg.color, "background.color", &mut issues);
    }
    if let Some(text) = value.text.as_mut() {
        check_color(&mut text.color, "text.color", &mut issues);
    }
    if let Some(border) = value.border.as_mut() {
        check_number(&mut border.width, BORDER_WIDTH_RANGE, "border.width", &mut issues);
        check_color(&mut border.color, "border.color", &mut issues);
        check_number(&mut border.radius, BORDER_RADIUS_RANGE, "border.radius", &mut issues);
    }
    if let Some(shadow) = value.shadow.as_mut() {
        check_number(&mut shadow.offset_x, SHADOW_OFFSET_RANGE, "shadow.offsetX", &mut issues);
        check_number(&mut shadow.offset_y, SHADOW_OFFSET_RANGE, "shadow.offsetY", &mut issues);
        check_number(&mut shadow.blur, SHADOW_BLUR_RANGE, "shadow.blur", &mut issues);
        check_color(&mut shadow.color, "shadow.color", &mut issues);
    }

    Sanitized { value, issues }
}

/// Enforce the anchor invariant: a stored position must belong to its
/// placement's group, otherwise it resets to the group's first anchor.
fn check_position(raw: &mut Option<RawPositionSettings>, property: &str, issues: &mut Vec<BlockError>) {
    let Some(pos) = raw.as_mut() else {
        return;
    };
    check_number(&mut pos.offset_x, OFFSET_RANGE, &format!("{}.offsetX", property), issues);
    check_number(&mut pos.offset_y, OFFSET_RANGE, &format!("{}.offsetY", property), issues);
    check_number(&mut pos.z_index, Z_INDEX_RANGE, &format!("{}.zIndex", property), issues);

    let placement = pos.placement.unwrap_or_default();
    if let Some(name) = pos.position.as_deref() {
        if placement.anchor_named(name).is_none() {
            issues.push(BlockError::InvalidPosition {
                placement: placement.as_str().to_string(),
                position: name.to_string(),
            });
            pos.position = Some(placement.anchors()[0].position_name(placement));
        }
    }
}

fn check_icon_value(value: &mut Option<String>, issues: &mut Vec<BlockError>) {
    if let Some(v) = value.as_deref() {
        if !is_safe_class_list(v.trim()) {
            issues.push(BlockError::ValidationError(format!(
                "Icon '{}' must be a class name (letters, digits, '-' and '_')",
                v
            )));
            *value = None;
        }
    }
}

pub fn sanitize_features(features: &RawFeatures) -> Sanitized<RawFeatures> {
    let mut value = features.clone();
    let mut issues = Vec::new();

    if let Some(icon) = value.icon.as_mut() {
        check_icon_value(&mut icon.value, &mut issues);
        check_color(&mut icon.color, "icon.color", &mut issues);
        check_position(&mut icon.position, "icon.position", &mut issues);
    }
    if let Some(collapse) = value.collapse.as_mut() {
        check_number(&mut collapse.animation_speed, ANIMATION_SPEED_RANGE, "collapse.animationSpeed", &mut issues);
    }
    if let Some(numbering) = value.numbering.as_mut() {
        check_number(&mut numbering.start_from, START_FROM_RANGE, "numbering.startFrom", &mut issues);
        check_text(&mut numbering.prefix, MAX_AFFIX_LEN, "numbering.prefix", &mut issues);
        check_text(&mut numbering.suffix, MAX_AFFIX_LEN, "numbering.suffix", &mut issues);
        check_position(&mut numbering.position, "numbering.position", &mut issues);
    }
    if let Some(copy) = value.copy_text.as_mut() {
        check_text(&mut copy.button_text, MAX_BUTTON_TEXT_LEN, "copyText.buttonText", &mut issues);
    }
    if let Some(shot) = value.screenshot.as_mut() {
        check_text(&mut shot.button_text, MAX_BUTTON_TEXT_LEN, "screenshot.buttonText", &mut issues);
        check_number(&mut shot.quality, QUALITY_RANGE, "screenshot.quality", &mut issues);
    }

    Sanitized { value, issues }
}

// The lenient parse turns an unknown enum value into "unset", so it has to be
// spotted on the submitted JSON before that happens.
fn check_enum<T: DeserializeOwned>(
    root: &Value,
    pointer: &str,
    expected: &[&str],
    issues: &mut Vec<BlockError>,
) {
    let Some(value) = root.pointer(pointer) else {
        return;
    };
    if value.is_null() || serde_json::from_value::<T>(value.clone()).is_ok() {
        return;
    }
    issues.push(BlockError::InvalidEnum {
        property: pointer.trim_start_matches('/').replace('/', "."),
        value: value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string()),
        expected: expected.join(", "),
    });
}

const PLACEMENTS: &[&str] = &["inside", "outside"];

fn unwrap_encoded(value: &Value) -> Value {
    match value {
        Value::String(s) => serde_json::from_str(s).unwrap_or(Value::Null),
        other => other.clone(),
    }
}

/// [`sanitize_styles`] for settings as submitted, also reporting enum values
/// the typed parse would silently reset.
pub fn sanitize_styles_json(styles: &Value) -> Sanitized<RawStyles> {
    let styles = unwrap_encoded(styles);
    let mut out = sanitize_styles(&lenient::from_json_value(&styles));
    let mut issues = Vec::new();
    check_enum::<TextAlign>(&styles, "/text/alignment", &["left", "center", "right", "justify"], &mut issues);
    issues.append(&mut out.issues);
    out.issues = issues;
    out
}

/// [`sanitize_features`] for settings as submitted, also reporting enum
/// values the typed parse would silently reset.
pub fn sanitize_features_json(features: &Value) -> Sanitized<RawFeatures> {
    let features = unwrap_encoded(features);
    let mut out = sanitize_features(&lenient::from_json_value(&features));
    let mut issues = Vec::new();
    check_enum::<Placement>(&features, "/icon/position/placement", PLACEMENTS, &mut issues);
    check_enum::<CollapseState>(&features, "/collapse/defaultState", &["expanded", "collapsed"], &mut issues);
    check_enum::<NumberFormat>(&features, "/numbering/format", &["numeric", "alpha", "roman"], &mut issues);
    check_enum::<Placement>(&features, "/numbering/position/placement", PLACEMENTS, &mut issues);
    check_enum::<CopyFormat>(&features, "/copyText/format", &["text", "html"], &mut issues);
    check_enum::<ImageFormat>(&features, "/screenshot/format", &["png", "jpeg"], &mut issues);
    issues.append(&mut out.issues);
    out.issues = issues;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::MemoryPresetStore;
    use serde_json::json;

    #[test]
    fn test_validate_color() {
        assert!(validate_color("#ff0000", "color").is_ok());
        assert!(validate_color("#FFF", "color").is_ok());
        assert!(validate_color("rgba(0,0,0,0.1)", "color").is_ok());
        assert!(validate_color("transparent", "color").is_ok());
        assert!(validate_color("#ff00f", "color").is_err());
        assert!(validate_color("url(javascript:x)", "color").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range(0.5, (0.0, 1.0), "quality").is_ok());
        assert!(validate_range(1.0, (0.0, 1.0), "quality").is_ok());
        assert!(validate_range(-0.1, (0.0, 1.0), "quality").is_err());
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("info-box").is_ok());
        assert!(validate_slug("box2").is_ok());
        assert!(validate_slug("Info-Box").is_err());
        assert!(validate_slug("info--box").is_err());
        assert!(validate_slug("-info").is_err());
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Info Box!"), "info-box");
        assert_eq!(slugify("  Tips & Tricks  "), "tips-tricks");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn test_identity_uniqueness() {
        let store = MemoryPresetStore::with_presets(vec![Preset::new("Info", "info")]);
        let dup = Preset::new("Info 2", "info");
        assert!(matches!(
            validate_preset_identity(&dup, &store, false),
            Err(BlockError::DuplicateSlug { .. })
        ));
        assert!(validate_preset_identity(&dup, &store, true).is_ok());
        let missing = Preset::new("Other", "other");
        assert!(matches!(
            validate_preset_identity(&missing, &store, true),
            Err(BlockError::PresetNotFound { .. })
        ));
        let unnamed = Preset::new("  ", "unnamed");
        assert!(matches!(
            validate_preset_identity(&unnamed, &store, false),
            Err(BlockError::MissingField { .. })
        ));
    }

    #[test]
    fn test_sanitize_styles_drops_invalid_fields() {
        let raw: RawStyles = serde_json::from_value(json!({
            "padding": {"top": 1000, "left": 10},
            "border": {"width": 2, "color": "bogus"}
        }))
        .unwrap();
        let out = sanitize_styles(&raw);
        assert_eq!(out.issues.len(), 2);
        let padding = out.value.padding.unwrap();
        assert_eq!(padding.top, None);
        assert_eq!(padding.left, Some(10.0));
        let border = out.value.border.unwrap();
        assert_eq!(border.width, Some(2.0));
        assert_eq!(border.color, None);
    }

    #[test]
    fn test_sanitize_features_resets_bad_anchor() {
        let raw: RawFeatures = serde_json::from_value(json!({
            "icon": {"position": {"placement": "outside", "position": "middle-center", "zIndex": 20000}},
            "screenshot": {"quality": 3}
        }))
        .unwrap();
        let out = sanitize_features(&raw);
        assert_eq!(out.issues.len(), 3);
        let pos = out.value.icon.unwrap().position.unwrap();
        assert_eq!(pos.position.as_deref(), Some("outside-top-left"));
        assert_eq!(pos.z_index, None);
        assert_eq!(out.value.screenshot.unwrap().quality, None);
    }

    #[test]
    fn test_clean_input_has_no_issues() {
        let raw: RawFeatures = serde_json::from_value(json!({
            "icon": {"enabled": true, "value": "dashicons-info", "position": {"placement": "inside", "position": "top-right"}}
        }))
        .unwrap();
        assert!(sanitize_features(&raw).is_clean());
        assert!(sanitize_features_json(&json!({"numbering": {"format": "alphabetic"}})).is_clean());
    }

    #[test]
    fn test_unknown_enum_values_are_reported() {
        let out = sanitize_features_json(&json!({
            "collapse": {"defaultState": "sideways"},
            "numbering": {"format": "hex"},
            "screenshot": {"format": "gif", "quality": 0.5}
        }));
        assert_eq!(
            out.issues,
            vec![
                BlockError::InvalidEnum {
                    property: "collapse.defaultState".to_string(),
                    value: "sideways".to_string(),
                    expected: "expanded, collapsed".to_string(),
                },
                BlockError::InvalidEnum {
                    property: "numbering.format".to_string(),
                    value: "hex".to_string(),
                    expected: "numeric, alpha, roman".to_string(),
                },
                BlockError::InvalidEnum {
                    property: "screenshot.format".to_string(),
                    value: "gif".to_string(),
                    expected: "png, jpeg".to_string(),
                },
            ]
        );
        assert_eq!(out.value.collapse.unwrap().default_state, None);
        assert_eq!(out.value.screenshot.unwrap().quality, Some(0.5));

        let styles = sanitize_styles_json(&json!("{\"text\": {\"alignment\": 7}}"));
        assert!(matches!(
            styles.issues.as_slice(),
            [BlockError::InvalidEnum { value, .. }] if value == "7"
        ));
    }

    #[test]
    fn test_anchor_check_matches_resolver() {
        let raw: RawFeatures = serde_json::from_value(json!({
            "icon": {"position": {"placement": "outside", "position": " outside-top-right "}},
            "numbering": {"position": {"placement": "inside", "position": "outside-top-left"}}
        }))
        .unwrap();
        let out = sanitize_features(&raw);
        assert_eq!(out.issues.len(), 1);
        assert_eq!(
            out.value.numbering.unwrap().position.unwrap().position.as_deref(),
            Some("top-left")
        );
    }
}

//! Admin save path: validate, sanitize, store, and report the outcome as a
//! dismissible notice.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BlockError, BlockResult};
use crate::markup::Element;
use crate::preset::{Preset, PresetSink, PresetSource};
use crate::validator::{
    sanitize_features, sanitize_features_json, sanitize_styles, sanitize_styles_json, slugify,
    validate_preset_identity,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

/// Inline message shown above the preset editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminNotice {
    pub level: NoticeLevel,
    pub message: String,
    /// Extra lines, e.g. fields that were reset while saving
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    pub dismissible: bool,
}

impl AdminNotice {
    pub fn success(message: impl Into<String>) -> Self {
        AdminNotice {
            level: NoticeLevel::Success,
            message: message.into(),
            details: Vec::new(),
            dismissible: true,
        }
    }

    pub fn from_error(err: &BlockError) -> Self {
        AdminNotice {
            level: NoticeLevel::Error,
            message: err.to_string(),
            details: Vec::new(),
            dismissible: true,
        }
    }

    pub fn to_element(&self) -> Element {
        let mut el = Element::new("div")
            .with_class("notice")
            .with_class(format!("notice-{}", self.level.as_str()))
            .with_attr("role", "alert");
        if self.dismissible {
            el.add_class("is-dismissible");
        }
        el = el.with_child(Element::new("p").with_text(self.message.clone()));
        if !self.details.is_empty() {
            let mut list = Element::new("ul");
            for detail in &self.details {
                list = list.with_child(Element::new("li").with_text(detail.clone()));
            }
            el = el.with_child(list);
        }
        el
    }
}

/// Which stored operation a save performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveAction {
    Create,
    Update,
}

/// Validate identity, sanitize settings and write the preset. Sanitizer
/// findings do not block the save; they are returned alongside the stored preset.
/// A new preset with a blank slug gets one derived from its name.
pub fn save_preset<S>(store: &S, preset: Preset, action: SaveAction) -> BlockResult<(Preset, Vec<BlockError>)>
where
    S: PresetSource + PresetSink,
{
    store_sanitized(store, preset, action, Vec::new())
}

/// [`save_preset`] for the editor form's JSON. Enum values the typed parse
/// would silently reset are reported with the other findings.
pub fn save_submitted<S>(store: &S, submitted: &Value, action: SaveAction) -> BlockResult<(Preset, Vec<BlockError>)>
where
    S: PresetSource + PresetSink,
{
    let preset: Preset = serde_json::from_value(submitted.clone())?;
    let null = Value::Null;
    let enum_issues = sanitize_styles_json(submitted.get("styles").unwrap_or(&null))
        .issues
        .into_iter()
        .chain(sanitize_features_json(submitted.get("features").unwrap_or(&null)).issues)
        .filter(|issue| matches!(issue, BlockError::InvalidEnum { .. }))
        .collect();
    store_sanitized(store, preset, action, enum_issues)
}

fn store_sanitized<S>(
    store: &S,
    mut preset: Preset,
    action: SaveAction,
    mut issues: Vec<BlockError>,
) -> BlockResult<(Preset, Vec<BlockError>)>
where
    S: PresetSource + PresetSink,
{
    preset.name = preset.name.trim().to_string();
    if action == SaveAction::Create && preset.slug.trim().is_empty() {
        preset.slug = slugify(&preset.name);
    }
    validate_preset_identity(&preset, store, action == SaveAction::Update)?;

    let styles = sanitize_styles(&preset.styles);
    let features = sanitize_features(&preset.features);
    preset.styles = styles.value;
    preset.features = features.value;
    issues.extend(styles.issues);
    issues.extend(features.issues);
    for issue in &issues {
        tracing::warn!(slug = %preset.slug, issue = %issue, "preset setting reset while saving");
    }

    let stored = match action {
        SaveAction::Create => store.insert(preset)?,
        SaveAction::Update => store.update(preset)?,
    };
    tracing::info!(slug = %stored.slug, id = stored.id, "preset saved");
    Ok((stored, issues))
}

/// [`save_preset`] reported as the notice the admin screen displays.
pub fn save_preset_notice<S>(store: &S, preset: Preset, action: SaveAction) -> AdminNotice
where
    S: PresetSource + PresetSink,
{
    saved_notice(save_preset(store, preset, action))
}

pub fn save_submitted_notice<S>(store: &S, submitted: &Value, action: SaveAction) -> AdminNotice
where
    S: PresetSource + PresetSink,
{
    saved_notice(save_submitted(store, submitted, action))
}

fn saved_notice(result: BlockResult<(Preset, Vec<BlockError>)>) -> AdminNotice {
    match result {
        Ok((stored, issues)) if issues.is_empty() => {
            AdminNotice::success(format!("Preset \"{}\" saved.", stored.name))
        }
        Ok((stored, issues)) => AdminNotice {
            level: NoticeLevel::Warning,
            message: format!("Preset \"{}\" saved. Some settings were reset to defaults.", stored.name),
            details: issues.iter().map(ToString::to_string).collect(),
            dismissible: true,
        },
        Err(err) => {
            tracing::warn!(error = %err, "preset save failed");
            AdminNotice::from_error(&err)
        }
    }
}

/// Delete a preset; instances that reference it render the placeholder afterwards.
pub fn delete_preset_notice<S: PresetSink>(store: &S, slug: &str) -> AdminNotice {
    match store.delete(slug) {
        Ok(()) => AdminNotice::success(format!("Preset \"{}\" deleted.", slug)),
        Err(err) => AdminNotice::from_error(&err),
    }
}

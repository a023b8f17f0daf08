//! Builds the canonical container markup from a block instance and its preset.
//!
//! The same tree is produced for the editor preview and the server render;
//! only the wrapper's inline style differs (custom properties vs literal
//! declarations).

use serde::{Deserialize, Serialize};

use crate::config::GlobalDefaults;
use crate::feature::{resolve_features, CollapseState, FeatureConfig, FeatureKind, Features};
use crate::instance::BlockInstance;
use crate::markup::Element;
use crate::merge::Merge;
use crate::numbering::{numbering_label, NumberingCounter};
use crate::preset::{Preset, PresetSource};
use crate::style::{inline_css, Styles};

/// Base stylesheet for preview mode. Maps the `--blockbox-*` custom
/// properties onto the same declarations the server render writes inline.
pub const BASE_STYLES: &str = ".blockbox-container{position:relative;box-sizing:border-box;\
padding:var(--blockbox-padding);margin:var(--blockbox-margin);\
background-color:var(--blockbox-background);color:var(--blockbox-text-color);\
text-align:var(--blockbox-text-align);\
border:var(--blockbox-border-width) solid var(--blockbox-border-color);\
border-radius:var(--blockbox-border-radius);box-shadow:var(--blockbox-shadow);}\
.blockbox-container.has-outside-position{overflow:visible;}\
.blockbox-header{display:flex;align-items:center;gap:8px;}\
.blockbox-container.is-collapsible .blockbox-header{cursor:pointer;}\
.blockbox-title{flex:1;font-weight:600;}\
.blockbox-numbering{font-weight:700;}\
.blockbox-collapse-toggle{background:none;border:0;cursor:pointer;}\
.blockbox-body.is-hidden{display:none;}\
.blockbox-actions{display:flex;justify-content:flex-end;gap:8px;margin-top:12px;}\
.blockbox-screenshot-loading{position:absolute;inset:0;background:rgba(255,255,255,0.6);}\
.blockbox-missing-preset{padding:12px;border:1px dashed #cc1818;color:#cc1818;}";

pub const CONTAINER_CLASS: &str = "blockbox-container";
pub const HEADER_CLASS: &str = "blockbox-header";
pub const TITLE_CLASS: &str = "blockbox-title";
pub const BODY_CLASS: &str = "blockbox-body";
pub const ACTIONS_CLASS: &str = "blockbox-actions";
pub const COLLAPSE_TOGGLE_CLASS: &str = "blockbox-collapse-toggle";
pub const COPY_BUTTON_CLASS: &str = "blockbox-copy-button";
pub const SCREENSHOT_BUTTON_CLASS: &str = "blockbox-screenshot-button";
pub const MISSING_PRESET_CLASS: &str = "blockbox-missing-preset";
pub const OUTSIDE_POSITION_CLASS: &str = "has-outside-position";
pub const HIDDEN_CLASS: &str = "is-hidden";
pub const COLLAPSIBLE_CLASS: &str = "is-collapsible";
pub const COLLAPSED_CLASS: &str = "is-collapsed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Editor preview: wrapper carries custom properties, styled by [`BASE_STYLES`]
    Preview,
    /// Server render: wrapper carries literal declarations
    #[default]
    Server,
}

/// State for one render pass over a page
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub mode: RenderMode,
    pub defaults: GlobalDefaults,
    counter: NumberingCounter,
    sequence: u32,
}

impl RenderContext {
    pub fn new(defaults: GlobalDefaults, mode: RenderMode) -> Self {
        RenderContext {
            mode,
            defaults,
            counter: NumberingCounter::new(),
            sequence: 0,
        }
    }

    /// Start a new page: numbering and generated ids restart.
    pub fn begin_page(&mut self) {
        self.counter.reset();
        self.sequence = 0;
    }

    fn next_id(&mut self, slug: &str) -> String {
        self.sequence += 1;
        format!("blockbox-{}-{}", slug, self.sequence)
    }
}

/// One block on a page: its attributes and already-rendered inner content.
#[derive(Debug, Clone, PartialEq)]
pub struct PageBlock {
    pub instance: BlockInstance,
    pub content: String,
}

/// Effective styles for an instance: the override layered over the preset's.
pub fn effective_styles(instance: &BlockInstance, preset: &Preset) -> Styles {
    Styles::resolve(&preset.styles.merged(&instance.config_override))
}

pub fn effective_features(
    instance: &BlockInstance,
    preset: &Preset,
    defaults: &GlobalDefaults,
) -> Features {
    resolve_features(defaults, &preset.features, &instance.features_override)
}

/// Render one container. A missing preset yields the placeholder notice.
pub fn render_block(
    ctx: &mut RenderContext,
    instance: &BlockInstance,
    preset: Option<&Preset>,
    content: &str,
) -> Element {
    let Some(preset) = preset else {
        tracing::warn!(slug = %instance.selected_preset_slug, "container preset not found");
        return missing_preset(&instance.selected_preset_slug);
    };

    let styles = effective_styles(instance, preset);
    let features = effective_features(instance, preset, &ctx.defaults);
    let id = instance
        .instance_id
        .as_deref()
        .map(str::trim)
        .filter(|id| is_safe_id(id))
        .map(str::to_string)
        .unwrap_or_else(|| ctx.next_id(&preset.slug));
    let body_id = format!("{}-body", id);
    let collapsed = features
        .collapse
        .enabled_settings()
        .is_some_and(|c| c.default_state == CollapseState::Collapsed);

    let mut wrapper = Element::new("div")
        .with_attr("id", id.clone())
        .with_class(CONTAINER_CLASS)
        .with_class(format!("blockbox-preset-{}", preset.slug))
        .with_classes(instance.class_tokens());
    if features.collapse.enabled {
        wrapper.add_class(COLLAPSIBLE_CLASS);
    }
    if collapsed {
        wrapper.add_class(COLLAPSED_CLASS);
    }
    if features.has_outside_decorations() {
        wrapper.add_class(OUTSIDE_POSITION_CLASS);
    }

    let style = match ctx.mode {
        RenderMode::Preview => inline_css(&styles.css_variables()),
        RenderMode::Server => inline_css(&styles.css_declarations()),
    };
    wrapper.set_attr("style", style);
    wrapper.set_attr("data-preset", preset.slug.clone());
    for config in features.enabled() {
        wrapper.set_attr(config.kind().enable_attribute(), "true");
        for (name, value) in config.data_attributes() {
            wrapper.set_attr(name, value);
        }
    }

    let title = instance
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(&preset.name);
    if let Some(header) = render_header(ctx, &features, &preset.slug, title, &body_id, collapsed) {
        wrapper = wrapper.with_child(header);
    }

    let mut body = Element::new("div")
        .with_attr("id", body_id.clone())
        .with_class(BODY_CLASS)
        .with_raw(content);
    if collapsed {
        body.add_class(HIDDEN_CLASS);
    }
    wrapper = wrapper.with_child(body);

    if let Some(actions) = render_actions(&features, &id, &body_id) {
        wrapper = wrapper.with_child(actions);
    }
    wrapper
}

pub fn render_block_html(
    ctx: &mut RenderContext,
    instance: &BlockInstance,
    preset: Option<&Preset>,
    content: &str,
) -> String {
    render_block(ctx, instance, preset, content).to_html()
}

/// Render every block of a page in order as one pass. Numbering restarts at
/// the beginning of the page. Lookup failures degrade to the placeholder.
pub fn render_page(ctx: &mut RenderContext, blocks: &[PageBlock], source: &dyn PresetSource) -> String {
    ctx.begin_page();
    let mut out = String::new();
    if ctx.mode == RenderMode::Preview {
        out.push_str("<style>");
        out.push_str(BASE_STYLES);
        out.push_str("</style>");
    }
    for block in blocks {
        let preset = match source.get_by_slug(&block.instance.selected_preset_slug) {
            Ok(preset) => preset,
            Err(err) => {
                tracing::warn!(slug = %block.instance.selected_preset_slug, error = %err, "preset lookup failed");
                None
            }
        };
        out.push_str(&render_block_html(ctx, &block.instance, preset.as_ref(), &block.content));
    }
    out
}

fn render_header(
    ctx: &mut RenderContext,
    features: &Features,
    slug: &str,
    title: &str,
    body_id: &str,
    collapsed: bool,
) -> Option<Element> {
    let mut header = Element::new("div").with_class(HEADER_CLASS);

    if let Some(icon) = features.icon.enabled_settings() {
        let mut el = Element::new("span")
            .with_class("dashicons")
            .with_classes(icon.value.split_whitespace().map(str::to_string));
        let mut style = Vec::new();
        if let Some(color) = &icon.color {
            style.push(format!("color: {};", color));
        }
        match &icon.position {
            Some(pos) => {
                let out = pos.resolve_output(FeatureKind::Icon);
                el = el.with_classes(out.classes);
                style.push(out.style);
            }
            None => el.add_class("blockbox-icon"),
        }
        el.set_attr("aria-hidden", "true");
        el.set_attr("data-icon", icon.value.clone());
        if !style.is_empty() {
            el.set_attr("style", style.join(" "));
        }
        header = header.with_child(el);
    }

    if let Some(numbering) = features.numbering.enabled_settings() {
        let ordinal = ctx.counter.next(slug);
        let label = numbering_label(
            numbering.format,
            numbering.start_from,
            ordinal,
            &numbering.prefix,
            &numbering.suffix,
        );
        let mut el = Element::new("span");
        match &numbering.position {
            Some(pos) => {
                let out = pos.resolve_output(FeatureKind::Numbering);
                el = el.with_classes(out.classes).with_attr("style", out.style);
            }
            None => el.add_class("blockbox-numbering"),
        }
        let index = numbering.start_from.saturating_add(ordinal.saturating_sub(1));
        header = header.with_child(el.with_attr("data-number", index.to_string()).with_text(label));
    }

    if !title.is_empty() {
        header = header.with_child(Element::new("span").with_class(TITLE_CLASS).with_text(title));
    }

    if features.collapse.enabled {
        let toggle = Element::new("button")
            .with_class(COLLAPSE_TOGGLE_CLASS)
            .with_attr("type", "button")
            .with_attr("aria-expanded", (!collapsed).to_string())
            .with_attr("aria-controls", body_id)
            .with_child(
                Element::new("span")
                    .with_class("blockbox-collapse-indicator")
                    .with_attr("aria-hidden", "true"),
            );
        header = header.with_child(toggle);
    }

    (!header.children.is_empty()).then_some(header)
}

fn render_actions(features: &Features, id: &str, body_id: &str) -> Option<Element> {
    let mut actions = Element::new("div").with_class(ACTIONS_CLASS);
    for config in features.enabled() {
        let button = match &config {
            FeatureConfig::CopyText(s) => Element::new("button")
                .with_classes(["blockbox-action", COPY_BUTTON_CLASS])
                .with_attr("type", "button")
                .with_attr("data-target", body_id)
                .with_attr("data-button-text", s.button_text.clone())
                .with_attr("data-format", s.format.as_str())
                .with_text(s.button_text.clone()),
            FeatureConfig::Screenshot(s) => Element::new("button")
                .with_classes(["blockbox-action", SCREENSHOT_BUTTON_CLASS])
                .with_attr("type", "button")
                .with_attr("data-target", id)
                .with_attr("data-button-text", s.button_text.clone())
                .with_attr("data-format", s.format.as_str())
                .with_attr("data-quality", s.quality.to_string())
                .with_attr("data-filename", s.filename.clone())
                .with_text(s.button_text.clone()),
            FeatureConfig::Icon(_) | FeatureConfig::Collapse(_) | FeatureConfig::Numbering(_) => continue,
        };
        actions = actions.with_child(button);
    }
    (!actions.children.is_empty()).then_some(actions)
}

fn missing_preset(slug: &str) -> Element {
    let message = if slug.trim().is_empty() {
        "No container preset selected.".to_string()
    } else {
        format!("Container preset \"{}\" was not found.", slug)
    };
    Element::new("div")
        .with_class(MISSING_PRESET_CLASS)
        .with_attr("role", "note")
        .with_attr("data-preset", slug)
        .with_text(message)
}

fn is_safe_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
}

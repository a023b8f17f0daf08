//! Discovers rendered containers and reads their behavior from data attributes.
//!
//! Everything the runtime needs is carried by the markup, so binding never
//! consults server state. Each container is bound once; a second scan over
//! the same tree (after the host inserts more content) only picks up the new
//! containers.

use blockbox_core::feature::{CollapseState, CopyFormat, FeatureKind, ImageFormat};
use blockbox_core::markup::Element;
use blockbox_core::render::{
    BODY_CLASS, CONTAINER_CLASS, COPY_BUTTON_CLASS, SCREENSHOT_BUTTON_CLASS,
};

pub const BOUND_ATTR: &str = "data-blockbox-bound";

#[derive(Debug, Clone, PartialEq)]
pub struct CollapseBinding {
    pub default_state: CollapseState,
    pub animation_speed: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CopyBinding {
    /// Id of the element whose content is copied
    pub target: String,
    pub button_text: String,
    pub format: CopyFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenshotBinding {
    /// Id of the element that is captured
    pub target: String,
    pub button_text: String,
    pub format: ImageFormat,
    pub quality: f64,
    pub filename: String,
}

/// Behaviors attached to one container
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerBinding {
    pub id: String,
    pub collapse: Option<CollapseBinding>,
    pub copy: Option<CopyBinding>,
    pub screenshot: Option<ScreenshotBinding>,
}

impl ContainerBinding {
    /// Read a binding from a container element. Missing or malformed
    /// parameters take the same defaults the resolver uses.
    pub fn from_element(container: &Element) -> Option<ContainerBinding> {
        let id = container.id()?.to_string();
        let enabled = |kind: FeatureKind| container.attr(&kind.enable_attribute()) == Some("true");
        let body_id = container
            .find_by_class(BODY_CLASS)
            .and_then(Element::id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}-body", id));

        let collapse = enabled(FeatureKind::Collapse).then(|| CollapseBinding {
            default_state: container
                .attr("data-collapse-default-state")
                .and_then(CollapseState::parse)
                .unwrap_or_default(),
            animation_speed: container
                .attr("data-collapse-animation-speed")
                .and_then(|v| v.parse().ok())
                .unwrap_or(blockbox_core::feature::DEFAULT_ANIMATION_SPEED),
        });

        let copy = enabled(FeatureKind::CopyText).then(|| {
            let button = container.find_by_class(COPY_BUTTON_CLASS);
            CopyBinding {
                target: button
                    .and_then(|b| b.attr("data-target"))
                    .map(str::to_string)
                    .unwrap_or_else(|| body_id.clone()),
                button_text: container
                    .attr("data-copy-text-button-text")
                    .unwrap_or(blockbox_core::feature::DEFAULT_COPY_BUTTON_TEXT)
                    .to_string(),
                format: match container.attr("data-copy-text-format") {
                    Some("html") => CopyFormat::Html,
                    _ => CopyFormat::Text,
                },
            }
        });

        let screenshot = enabled(FeatureKind::Screenshot).then(|| {
            let button = container.find_by_class(SCREENSHOT_BUTTON_CLASS);
            ScreenshotBinding {
                target: button
                    .and_then(|b| b.attr("data-target"))
                    .map(str::to_string)
                    .unwrap_or_else(|| id.clone()),
                button_text: container
                    .attr("data-screenshot-button-text")
                    .unwrap_or(blockbox_core::feature::DEFAULT_SCREENSHOT_BUTTON_TEXT)
                    .to_string(),
                format: match container.attr("data-screenshot-format") {
                    Some("jpeg") | Some("jpg") => ImageFormat::Jpeg,
                    _ => ImageFormat::Png,
                },
                quality: container
                    .attr("data-screenshot-quality")
                    .and_then(|v| v.parse::<f64>().ok())
                    .filter(|q| (0.1..=1.0).contains(q))
                    .unwrap_or(blockbox_core::feature::DEFAULT_QUALITY),
                filename: container
                    .attr("data-screenshot-filename")
                    .filter(|f| !f.is_empty())
                    .unwrap_or(blockbox_core::feature::DEFAULT_SCREENSHOT_FILENAME)
                    .to_string(),
            }
        });

        Some(ContainerBinding {
            id,
            collapse,
            copy,
            screenshot,
        })
    }
}

/// Bind every not-yet-bound container under `root` and mark it bound.
pub fn bind_all(root: &mut Element) -> Vec<ContainerBinding> {
    let mut bound = Vec::new();
    root.for_each_with_class_mut(CONTAINER_CLASS, &mut |container| {
        if container.attr(BOUND_ATTR) == Some("true") {
            return;
        }
        match ContainerBinding::from_element(container) {
            Some(binding) => {
                container.set_attr(BOUND_ATTR, "true");
                bound.push(binding);
            }
            None => tracing::warn!("container without id, skipping"),
        }
    });
    tracing::debug!(count = bound.len(), "bound containers");
    bound
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockbox_core::{render_block, BlockInstance, Preset, RenderContext};
    use pretty_assertions::assert_eq;

    fn page() -> Element {
        let mut preset = Preset::new("Note", "note");
        preset.features = serde_json::from_str(
            r#"{
                "collapse": {"enabled": true, "defaultState": "collapsed", "animationSpeed": 150},
                "copyText": {"enabled": true, "format": "html"},
                "screenshot": {"enabled": true, "format": "jpeg", "quality": 0.7}
            }"#,
        )
        .unwrap();
        let mut ctx = RenderContext::default();
        let instance = BlockInstance {
            instance_id: Some("n1".to_string()),
            ..BlockInstance::for_preset("note")
        };
        Element::new("main")
            .with_child(render_block(&mut ctx, &instance, Some(&preset), "<p>a</p>"))
            .with_child(render_block(&mut ctx, &BlockInstance::for_preset("note"), Some(&preset), "<p>b</p>"))
    }

    #[test]
    fn test_binding_reads_data_attributes() {
        let mut root = page();
        let bindings = bind_all(&mut root);
        assert_eq!(bindings.len(), 2);
        let first = &bindings[0];
        assert_eq!(first.id, "n1");
        assert_eq!(
            first.collapse,
            Some(CollapseBinding { default_state: CollapseState::Collapsed, animation_speed: 150 })
        );
        let copy = first.copy.as_ref().unwrap();
        assert_eq!(copy.target, "n1-body");
        assert_eq!(copy.format, CopyFormat::Html);
        let shot = first.screenshot.as_ref().unwrap();
        assert_eq!(shot.target, "n1");
        assert_eq!(shot.format, ImageFormat::Jpeg);
        assert_eq!(shot.quality, 0.7);
        assert_eq!(shot.filename, "container-screenshot");
    }

    #[test]
    fn test_binding_is_idempotent() {
        let mut root = page();
        assert_eq!(bind_all(&mut root).len(), 2);
        assert!(bind_all(&mut root).is_empty());

        let mut ctx = RenderContext::default();
        root.children.push(blockbox_core::markup::Node::Element(render_block(
            &mut ctx,
            &BlockInstance::for_preset("note"),
            Some(&Preset::new("Note", "note")),
            "",
        )));
        let late = bind_all(&mut root);
        assert_eq!(late.len(), 1);
        assert_eq!(late[0].collapse, None);
    }
}

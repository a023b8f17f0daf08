//! Placement of decorations (icon, numbering badge) relative to the container.

use serde::{Deserialize, Serialize};

use crate::feature::FeatureKind;
use crate::lenient;
use crate::merge::{merge_value, Merge};
use crate::style::{in_range, inline_css, px};

pub const OFFSET_RANGE: (f64, f64) = (-100.0, 100.0);
pub const Z_INDEX_RANGE: (f64, f64) = (1.0, 9999.0);
pub const DEFAULT_Z_INDEX: u32 = 10;

const OUTSIDE_PREFIX: &str = "outside-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    #[default]
    Inside,
    Outside,
}

impl Placement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Placement::Inside => "inside",
            Placement::Outside => "outside",
        }
    }

    /// Anchors valid for this placement, in menu order. The first entry is
    /// what a placement switch resets to.
    pub fn anchors(&self) -> &'static [Anchor] {
        match self {
            Placement::Inside => &INSIDE_ANCHORS,
            Placement::Outside => &OUTSIDE_ANCHORS,
        }
    }

    /// Position names as stored (outside names carry the `outside-` prefix).
    pub fn position_names(&self) -> Vec<String> {
        self.anchors().iter().map(|a| a.position_name(*self)).collect()
    }

    /// The anchor stored under `name` in this placement's group. A name from
    /// the other group does not match.
    pub fn anchor_named(&self, name: &str) -> Option<Anchor> {
        let name = name.trim();
        self.anchors()
            .iter()
            .copied()
            .find(|a| a.position_name(*self) == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

const INSIDE_ANCHORS: [Anchor; 9] = [
    Anchor::TopLeft,
    Anchor::TopCenter,
    Anchor::TopRight,
    Anchor::MiddleLeft,
    Anchor::MiddleCenter,
    Anchor::MiddleRight,
    Anchor::BottomLeft,
    Anchor::BottomCenter,
    Anchor::BottomRight,
];

const OUTSIDE_ANCHORS: [Anchor; 8] = [
    Anchor::TopLeft,
    Anchor::TopCenter,
    Anchor::TopRight,
    Anchor::MiddleLeft,
    Anchor::MiddleRight,
    Anchor::BottomLeft,
    Anchor::BottomCenter,
    Anchor::BottomRight,
];

impl Anchor {
    pub fn name(&self) -> &'static str {
        match self {
            Anchor::TopLeft => "top-left",
            Anchor::TopCenter => "top-center",
            Anchor::TopRight => "top-right",
            Anchor::MiddleLeft => "middle-left",
            Anchor::MiddleCenter => "middle-center",
            Anchor::MiddleRight => "middle-right",
            Anchor::BottomLeft => "bottom-left",
            Anchor::BottomCenter => "bottom-center",
            Anchor::BottomRight => "bottom-right",
        }
    }

    pub fn position_name(&self, placement: Placement) -> String {
        match placement {
            Placement::Inside => self.name().to_string(),
            Placement::Outside => format!("{}{}", OUTSIDE_PREFIX, self.name()),
        }
    }
}

/// Anchor slot after resolution. Names that match no anchor of the placement
/// are kept as `Unspecified`: they get classes but no offset declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorSlot {
    Anchor(Anchor),
    Unspecified(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPositionSettings {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub placement: Option<Placement>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::number")]
    pub offset_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::number")]
    pub offset_y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::number")]
    pub z_index: Option<f64>,
}

impl Merge for RawPositionSettings {
    fn merge_from(&mut self, other: &Self) {
        merge_value(&mut self.placement, &other.placement);
        merge_value(&mut self.position, &other.position);
        merge_value(&mut self.offset_x, &other.offset_x);
        merge_value(&mut self.offset_y, &other.offset_y);
        merge_value(&mut self.z_index, &other.z_index);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionSettings {
    pub placement: Placement,
    pub slot: AnchorSlot,
    pub offset_x: f64,
    pub offset_y: f64,
    pub z_index: u32,
}

/// Classes and inline style for one positioned decoration
#[derive(Debug, Clone, PartialEq)]
pub struct PositionOutput {
    pub classes: Vec<String>,
    pub style: String,
}

impl PositionOutput {
    pub fn class_attr(&self) -> String {
        self.classes.join(" ")
    }
}

impl PositionSettings {
    pub fn new(placement: Placement, anchor: Anchor) -> Self {
        PositionSettings {
            placement,
            slot: AnchorSlot::Anchor(anchor),
            offset_x: 0.0,
            offset_y: 0.0,
            z_index: DEFAULT_Z_INDEX,
        }
    }

    /// Resolve stored settings; `default_anchor` applies when no position is stored.
    pub fn resolve(raw: &RawPositionSettings, default_anchor: Anchor) -> Self {
        let placement = raw.placement.unwrap_or_default();
        let slot = match raw.position.as_deref() {
            None => AnchorSlot::Anchor(fit_anchor(default_anchor, placement)),
            Some(name) => match placement.anchor_named(name) {
                Some(anchor) => AnchorSlot::Anchor(anchor),
                None => {
                    tracing::debug!(position = name, placement = placement.as_str(), "unrecognized anchor");
                    AnchorSlot::Unspecified(name.to_string())
                }
            },
        };
        PositionSettings {
            placement,
            slot,
            offset_x: in_range(raw.offset_x, OFFSET_RANGE, 0.0),
            offset_y: in_range(raw.offset_y, OFFSET_RANGE, 0.0),
            z_index: in_range(raw.z_index, Z_INDEX_RANGE, DEFAULT_Z_INDEX as f64).round() as u32,
        }
    }

    pub fn to_raw(&self) -> RawPositionSettings {
        RawPositionSettings {
            placement: Some(self.placement),
            position: Some(self.position_name()),
            offset_x: Some(self.offset_x),
            offset_y: Some(self.offset_y),
            z_index: Some(self.z_index as f64),
        }
    }

    /// Stored name of the current position (`outside-` prefixed when outside).
    pub fn position_name(&self) -> String {
        match &self.slot {
            AnchorSlot::Anchor(a) => a.position_name(self.placement),
            AnchorSlot::Unspecified(name) => name.clone(),
        }
    }

    /// Switch placement. The position resets to the first anchor of the new
    /// group whenever the placement actually changes.
    pub fn set_placement(&mut self, placement: Placement) {
        if self.placement == placement {
            return;
        }
        self.placement = placement;
        self.slot = AnchorSlot::Anchor(placement.anchors()[0]);
    }

    pub fn is_outside(&self) -> bool {
        self.placement == Placement::Outside
    }

    /// Compute the class list and inline style for a decoration of `feature`.
    pub fn resolve_output(&self, feature: FeatureKind) -> PositionOutput {
        let resolved_class = match &self.slot {
            AnchorSlot::Anchor(a) => format!("position-{}", a.name()),
            AnchorSlot::Unspecified(_) => "position-unspecified".to_string(),
        };
        let classes = vec![
            format!("blockbox-{}", feature.css_name()),
            format!("positioned-{}", self.placement.as_str()),
            resolved_class,
        ];

        let mut decls: Vec<(&str, String)> = vec![
            ("z-index", self.z_index.to_string()),
            ("position", "absolute".to_string()),
        ];

        // Outside offsets push the decoration away from the container edge.
        let sign = if self.is_outside() { -1.0 } else { 1.0 };
        let x = sign * self.offset_x;
        let y = sign * self.offset_y;

        if let AnchorSlot::Anchor(anchor) = &self.slot {
            match anchor {
                Anchor::TopLeft => {
                    decls.push(("top", px(y)));
                    decls.push(("left", px(x)));
                }
                Anchor::TopCenter => {
                    decls.push(("top", px(y)));
                    decls.push(("left", "50%".to_string()));
                    decls.push(("transform", translate_x(x)));
                }
                Anchor::TopRight => {
                    decls.push(("top", px(y)));
                    decls.push(("right", px(x)));
                }
                Anchor::MiddleLeft => {
                    decls.push(("top", "50%".to_string()));
                    decls.push(("left", px(x)));
                    decls.push(("transform", translate_y(y)));
                }
                Anchor::MiddleCenter => {
                    decls.push(("top", "50%".to_string()));
                    decls.push(("left", "50%".to_string()));
                    decls.push(("transform", format!("translate({}, {})", centered(x), centered(y))));
                }
                Anchor::MiddleRight => {
                    decls.push(("top", "50%".to_string()));
                    decls.push(("right", px(x)));
                    decls.push(("transform", translate_y(y)));
                }
                Anchor::BottomLeft => {
                    decls.push(("bottom", px(y)));
                    decls.push(("left", px(x)));
                }
                Anchor::BottomCenter => {
                    decls.push(("bottom", px(y)));
                    decls.push(("left", "50%".to_string()));
                    decls.push(("transform", translate_x(x)));
                }
                Anchor::BottomRight => {
                    decls.push(("bottom", px(y)));
                    decls.push(("right", px(x)));
                }
            }
        }

        PositionOutput {
            classes,
            style: inline_css(&decls),
        }
    }
}

fn fit_anchor(anchor: Anchor, placement: Placement) -> Anchor {
    if placement.anchors().contains(&anchor) {
        anchor
    } else {
        placement.anchors()[0]
    }
}

fn centered(offset: f64) -> String {
    if offset == 0.0 {
        "-50%".to_string()
    } else {
        format!("calc(-50% + {})", px(offset))
    }
}

fn translate_x(offset: f64) -> String {
    format!("translateX({})", centered(offset))
}

fn translate_y(offset: f64) -> String {
    format!("translateY({})", centered(offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn settings(value: serde_json::Value) -> PositionSettings {
        let raw: RawPositionSettings = serde_json::from_value(value).unwrap();
        PositionSettings::resolve(&raw, Anchor::TopLeft)
    }

    #[test]
    fn test_outside_offsets_are_negated() {
        let s = settings(json!({
            "placement": "outside", "position": "outside-top-left", "offsetX": 10, "offsetY": 5
        }));
        let out = s.resolve_output(FeatureKind::Icon);
        assert!(out.style.contains("top: -5px; left: -10px"), "{}", out.style);
        assert_eq!(
            out.classes,
            vec!["blockbox-icon", "positioned-outside", "position-top-left"]
        );
    }

    #[test]
    fn test_inside_offsets_keep_sign() {
        let s = settings(json!({
            "placement": "inside", "position": "top-left", "offsetX": 10, "offsetY": 5
        }));
        let out = s.resolve_output(FeatureKind::Icon);
        assert!(out.style.contains("top: 5px; left: 10px"), "{}", out.style);
        assert!(out.style.starts_with("z-index: 10; position: absolute;"));
    }

    #[test]
    fn test_center_anchor_uses_translate() {
        let s = settings(json!({"position": "middle-center"}));
        let out = s.resolve_output(FeatureKind::Numbering);
        assert_eq!(
            out.style,
            "z-index: 10; position: absolute; top: 50%; left: 50%; transform: translate(-50%, -50%);"
        );

        let s = settings(json!({"position": "top-center", "offsetX": 4}));
        let out = s.resolve_output(FeatureKind::Numbering);
        assert!(out.style.contains("left: 50%; transform: translateX(calc(-50% + 4px));"));
    }

    #[test]
    fn test_unrecognized_anchor_has_no_offsets() {
        let s = settings(json!({"position": "somewhere", "offsetX": 10}));
        assert_eq!(s.slot, AnchorSlot::Unspecified("somewhere".to_string()));
        let out = s.resolve_output(FeatureKind::Icon);
        assert_eq!(out.style, "z-index: 10; position: absolute;");
        assert_eq!(out.classes[2], "position-unspecified");
    }

    #[test]
    fn test_middle_center_is_not_an_outside_anchor() {
        let s = settings(json!({"placement": "outside", "position": "outside-middle-center"}));
        assert!(matches!(s.slot, AnchorSlot::Unspecified(_)));
    }

    #[test]
    fn test_anchor_from_other_group_is_unspecified() {
        let s = settings(json!({
            "placement": "inside", "position": "outside-top-left", "offsetX": 10, "offsetY": 5
        }));
        assert_eq!(s.slot, AnchorSlot::Unspecified("outside-top-left".to_string()));
        assert_eq!(s.resolve_output(FeatureKind::Icon).style, "z-index: 10; position: absolute;");

        let s = settings(json!({
            "placement": "outside", "position": "top-left", "offsetX": 10, "offsetY": 5
        }));
        assert_eq!(s.slot, AnchorSlot::Unspecified("top-left".to_string()));
        assert_eq!(s.resolve_output(FeatureKind::Icon).style, "z-index: 10; position: absolute;");
    }

    #[test]
    fn test_switching_placement_resets_position() {
        let mut s = settings(json!({"placement": "inside", "position": "bottom-right"}));
        s.set_placement(Placement::Outside);
        assert_eq!(s.position_name(), "outside-top-left");
        s.set_placement(Placement::Outside);
        assert_eq!(s.position_name(), "outside-top-left");
        s.set_placement(Placement::Inside);
        assert_eq!(s.position_name(), "top-left");
    }

    #[test]
    fn test_out_of_range_values_default() {
        let s = settings(json!({"offsetX": 150, "offsetY": -20, "zIndex": 0}));
        assert_eq!(s.offset_x, 0.0);
        assert_eq!(s.offset_y, -20.0);
        assert_eq!(s.z_index, DEFAULT_Z_INDEX);
    }

    #[test]
    fn test_anchor_group_sizes() {
        assert_eq!(Placement::Inside.position_names().len(), 9);
        assert_eq!(Placement::Outside.position_names().len(), 8);
        assert!(Placement::Outside
            .position_names()
            .iter()
            .all(|n| n.starts_with("outside-")));
    }
}

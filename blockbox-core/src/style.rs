use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lenient;
use crate::merge::{merge_nested, merge_value, Merge};
use crate::validator::is_valid_color;

pub const DEFAULT_PADDING: f64 = 20.0;
pub const DEFAULT_MARGIN: f64 = 0.0;
pub const DEFAULT_BACKGROUND: &str = "#ffffff";
pub const DEFAULT_TEXT_COLOR: &str = "#333333";
pub const DEFAULT_BORDER_WIDTH: f64 = 0.0;
pub const DEFAULT_BORDER_COLOR: &str = "#dddddd";
pub const DEFAULT_BORDER_RADIUS: f64 = 0.0;
pub const DEFAULT_SHADOW_OFFSET_X: f64 = 0.0;
pub const DEFAULT_SHADOW_OFFSET_Y: f64 = 2.0;
pub const DEFAULT_SHADOW_BLUR: f64 = 4.0;
pub const DEFAULT_SHADOW_COLOR: &str = "rgba(0,0,0,0.1)";

pub const PADDING_RANGE: (f64, f64) = (0.0, 500.0);
pub const MARGIN_RANGE: (f64, f64) = (-500.0, 500.0);
pub const BORDER_WIDTH_RANGE: (f64, f64) = (0.0, 50.0);
pub const BORDER_RADIUS_RANGE: (f64, f64) = (0.0, 500.0);
pub const SHADOW_OFFSET_RANGE: (f64, f64) = (-100.0, 100.0);
pub const SHADOW_BLUR_RANGE: (f64, f64) = (0.0, 100.0);

/// Four-sided box as stored (padding, margin)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawBox {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::number")]
    pub top: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::number")]
    pub right: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::number")]
    pub bottom: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::number")]
    pub left: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawBackground {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawText {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub alignment: Option<TextAlign>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawBorder {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::number")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::number")]
    pub radius: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawShadow {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::flag")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::number")]
    pub offset_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::number")]
    pub offset_y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::number")]
    pub blur: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub color: Option<String>,
}

/// Container styles as stored in a preset or a block override. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawStyles {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub padding: Option<RawBox>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub margin: Option<RawBox>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub background: Option<RawBackground>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub text: Option<RawText>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub border: Option<RawBorder>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional")]
    pub shadow: Option<RawShadow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlign {
    pub fn as_css(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
            TextAlign::Justify => "justify",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxSides {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl BoxSides {
    pub fn uniform(v: f64) -> Self {
        Self { top: v, right: v, bottom: v, left: v }
    }

    fn to_css(self) -> String {
        format!("{} {} {} {}", px(self.top), px(self.right), px(self.bottom), px(self.left))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub color: String,
    pub alignment: TextAlign,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Border {
    pub width: f64,
    pub color: String,
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shadow {
    pub enabled: bool,
    pub offset_x: f64,
    pub offset_y: f64,
    pub blur: f64,
    pub color: String,
}

impl Shadow {
    fn to_css(&self) -> String {
        if self.enabled {
            format!("{} {} {} {}", px(self.offset_x), px(self.offset_y), px(self.blur), self.color)
        } else {
            "none".to_string()
        }
    }
}

/// Fully resolved container styles
#[derive(Debug, Clone, PartialEq)]
pub struct Styles {
    pub padding: BoxSides,
    pub margin: BoxSides,
    pub background: Background,
    pub text: TextStyle,
    pub border: Border,
    pub shadow: Shadow,
}

impl Default for Styles {
    fn default() -> Self {
        Styles::resolve(&RawStyles::default())
    }
}

impl Styles {
    /// Fill every unset or invalid field of `raw` with its default.
    pub fn resolve(raw: &RawStyles) -> Styles {
        let padding = raw.padding.clone().unwrap_or_default();
        let margin = raw.margin.clone().unwrap_or_default();
        let background = raw.background.clone().unwrap_or_default();
        let text = raw.text.clone().unwrap_or_default();
        let border = raw.border.clone().unwrap_or_default();
        let shadow = raw.shadow.clone().unwrap_or_default();

        Styles {
            padding: resolve_box(&padding, DEFAULT_PADDING, PADDING_RANGE),
            margin: resolve_box(&margin, DEFAULT_MARGIN, MARGIN_RANGE),
            background: Background {
                color: color_or(background.color, DEFAULT_BACKGROUND),
            },
            text: TextStyle {
                color: color_or(text.color, DEFAULT_TEXT_COLOR),
                alignment: text.alignment.unwrap_or_default(),
            },
            border: Border {
                width: in_range(border.width, BORDER_WIDTH_RANGE, DEFAULT_BORDER_WIDTH),
                color: color_or(border.color, DEFAULT_BORDER_COLOR),
                radius: in_range(border.radius, BORDER_RADIUS_RANGE, DEFAULT_BORDER_RADIUS),
            },
            shadow: Shadow {
                enabled: shadow.enabled.unwrap_or(false),
                offset_x: in_range(shadow.offset_x, SHADOW_OFFSET_RANGE, DEFAULT_SHADOW_OFFSET_X),
                offset_y: in_range(shadow.offset_y, SHADOW_OFFSET_RANGE, DEFAULT_SHADOW_OFFSET_Y),
                blur: in_range(shadow.blur, SHADOW_BLUR_RANGE, DEFAULT_SHADOW_BLUR),
                color: color_or(shadow.color, DEFAULT_SHADOW_COLOR),
            },
        }
    }

    /// Resolve from a stored JSON value (object or JSON-encoded string).
    pub fn from_json_value(value: &Value) -> Styles {
        Styles::resolve(&lenient::from_json_value::<RawStyles>(value))
    }

    /// Resolve from a JSON string; malformed input yields the defaults.
    pub fn from_json_str(input: &str) -> Styles {
        Styles::resolve(&lenient::from_json_str::<RawStyles>(input))
    }

    /// Project back to the storage shape with every field set.
    pub fn to_raw(&self) -> RawStyles {
        let sides = |b: &BoxSides| RawBox {
            top: Some(b.top),
            right: Some(b.right),
            bottom: Some(b.bottom),
            left: Some(b.left),
        };
        RawStyles {
            padding: Some(sides(&self.padding)),
            margin: Some(sides(&self.margin)),
            background: Some(RawBackground {
                color: Some(self.background.color.clone()),
            }),
            text: Some(RawText {
                color: Some(self.text.color.clone()),
                alignment: Some(self.text.alignment),
            }),
            border: Some(RawBorder {
                width: Some(self.border.width),
                color: Some(self.border.color.clone()),
                radius: Some(self.border.radius),
            }),
            shadow: Some(RawShadow {
                enabled: Some(self.shadow.enabled),
                offset_x: Some(self.shadow.offset_x),
                offset_y: Some(self.shadow.offset_y),
                blur: Some(self.shadow.blur),
                color: Some(self.shadow.color.clone()),
            }),
        }
    }

    /// Literal declarations for static (server) rendering.
    pub fn css_declarations(&self) -> Vec<(&'static str, String)> {
        let mut decls = vec![
            ("padding", self.padding.to_css()),
            ("margin", self.margin.to_css()),
            ("background-color", self.background.color.clone()),
            ("color", self.text.color.clone()),
            ("text-align", self.text.alignment.as_css().to_string()),
            ("border", format!("{} solid {}", px(self.border.width), self.border.color)),
            ("border-radius", px(self.border.radius)),
        ];
        if self.shadow.enabled {
            decls.push(("box-shadow", self.shadow.to_css()));
        }
        decls
    }

    /// Custom properties for the editor preview; [`crate::render::BASE_STYLES`]
    /// maps each one onto the property [`Styles::css_declarations`] emits.
    pub fn css_variables(&self) -> Vec<(&'static str, String)> {
        vec![
            ("--blockbox-padding", self.padding.to_css()),
            ("--blockbox-margin", self.margin.to_css()),
            ("--blockbox-background", self.background.color.clone()),
            ("--blockbox-text-color", self.text.color.clone()),
            ("--blockbox-text-align", self.text.alignment.as_css().to_string()),
            ("--blockbox-border-width", px(self.border.width)),
            ("--blockbox-border-color", self.border.color.clone()),
            ("--blockbox-border-radius", px(self.border.radius)),
            ("--blockbox-shadow", self.shadow.to_css()),
        ]
    }
}

impl Merge for RawBox {
    fn merge_from(&mut self, other: &Self) {
        merge_value(&mut self.top, &other.top);
        merge_value(&mut self.right, &other.right);
        merge_value(&mut self.bottom, &other.bottom);
        merge_value(&mut self.left, &other.left);
    }
}

impl Merge for RawBackground {
    fn merge_from(&mut self, other: &Self) {
        merge_value(&mut self.color, &other.color);
    }
}

impl Merge for RawText {
    fn merge_from(&mut self, other: &Self) {
        merge_value(&mut self.color, &other.color);
        merge_value(&mut self.alignment, &other.alignment);
    }
}

impl Merge for RawBorder {
    fn merge_from(&mut self, other: &Self) {
        merge_value(&mut self.width, &other.width);
        merge_value(&mut self.color, &other.color);
        merge_value(&mut self.radius, &other.radius);
    }
}

impl Merge for RawShadow {
    fn merge_from(&mut self, other: &Self) {
        merge_value(&mut self.enabled, &other.enabled);
        merge_value(&mut self.offset_x, &other.offset_x);
        merge_value(&mut self.offset_y, &other.offset_y);
        merge_value(&mut self.blur, &other.blur);
        merge_value(&mut self.color, &other.color);
    }
}

impl Merge for RawStyles {
    fn merge_from(&mut self, other: &Self) {
        merge_nested(&mut self.padding, &other.padding);
        merge_nested(&mut self.margin, &other.margin);
        merge_nested(&mut self.background, &other.background);
        merge_nested(&mut self.text, &other.text);
        merge_nested(&mut self.border, &other.border);
        merge_nested(&mut self.shadow, &other.shadow);
    }
}

/// Render a pixel length. `-0` collapses to `0`.
pub(crate) fn px(v: f64) -> String {
    let v = if v == 0.0 { 0.0 } else { v };
    format!("{}px", v)
}

/// Join declarations into an inline `style` attribute value.
pub fn inline_css<K: AsRef<str>>(decls: &[(K, String)]) -> String {
    decls
        .iter()
        .map(|(k, v)| format!("{}: {};", k.as_ref(), v))
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn in_range(value: Option<f64>, range: (f64, f64), default: f64) -> f64 {
    match value {
        Some(v) if v >= range.0 && v <= range.1 => v,
        Some(v) => {
            tracing::warn!(value = v, min = range.0, max = range.1, "style value out of range, using default");
            default
        }
        None => default,
    }
}

fn color_or(value: Option<String>, default: &str) -> String {
    match value {
        Some(c) if is_valid_color(c.trim()) => c.trim().to_string(),
        Some(c) => {
            tracing::warn!(color = %c, "invalid color, using default");
            default.to_string()
        }
        None => default.to_string(),
    }
}

fn resolve_box(raw: &RawBox, default: f64, range: (f64, f64)) -> BoxSides {
    BoxSides {
        top: in_range(raw.top, range, default),
        right: in_range(raw.right, range, default),
        bottom: in_range(raw.bottom, range, default),
        left: in_range(raw.left, range, default),
    }
}

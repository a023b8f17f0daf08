//! # blockbox
//!
//! Configuration resolution and markup rendering for reusable content
//! containers ("blockboxes").
//!
//! A container instance names a stored [`Preset`] by slug. Rendering layers
//! the preset's styles and features with site-wide [`GlobalDefaults`] and the
//! instance's own overrides, then builds one canonical markup tree used both
//! for the editor preview and the server render.
//!
//! ## Example
//! ```ignore
//! use blockbox_core::{render_block_html, BlockInstance, Preset, RenderContext};
//!
//! let mut preset = Preset::new("Info", "info-box");
//! preset.features = serde_json::from_str(r#"{"copyText": {"enabled": true}}"#)?;
//!
//! let mut ctx = RenderContext::default();
//! let html = render_block_html(
//!     &mut ctx,
//!     &BlockInstance::for_preset("info-box"),
//!     Some(&preset),
//!     "<p>Hello</p>",
//! );
//! ```

pub mod admin;
pub mod config;
pub mod error;
pub mod feature;
pub mod instance;
pub mod lenient;
pub mod markup;
pub mod merge;
pub mod numbering;
pub mod position;
pub mod preset;
pub mod render;
pub mod style;
pub mod validator;

// --- Core types ---
pub use config::{FeatureDefault, GlobalDefaults};
pub use error::{BlockError, BlockResult};
pub use instance::BlockInstance;
pub use markup::{Element, Node};
pub use merge::Merge;
pub use preset::{MemoryPresetStore, Preset, PresetRow, PresetSink, PresetSource, PresetStatus};

// --- Resolution ---
pub use feature::{resolve_features, FeatureConfig, FeatureKind, Features, RawFeatures, Toggle};
pub use numbering::{format_number, NumberFormat, NumberingCounter};
pub use position::{Anchor, AnchorSlot, Placement, PositionOutput, PositionSettings};
pub use style::{RawStyles, Styles};

// --- Rendering ---
pub use admin::{
    save_preset, save_preset_notice, save_submitted, save_submitted_notice, AdminNotice, NoticeLevel,
    SaveAction,
};
pub use render::{render_block, render_block_html, render_page, PageBlock, RenderContext, RenderMode};

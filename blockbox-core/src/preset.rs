use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::{BlockError, BlockResult};
use crate::feature::RawFeatures;
use crate::lenient;
use crate::style::RawStyles;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetStatus {
    #[default]
    Active,
    Inactive,
    Draft,
}

impl PresetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresetStatus::Active => "active",
            PresetStatus::Inactive => "inactive",
            PresetStatus::Draft => "draft",
        }
    }

    pub fn parse(value: &str) -> Option<PresetStatus> {
        match value.trim() {
            "active" => Some(PresetStatus::Active),
            "inactive" => Some(PresetStatus::Inactive),
            "draft" => Some(PresetStatus::Draft),
            _ => None,
        }
    }
}

/// A named, reusable container configuration referenced by slug
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: PresetStatus,
    #[serde(default)]
    pub styles: RawStyles,
    #[serde(default)]
    pub features: RawFeatures,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}

/// A preset as the host stores it: JSON columns kept as text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetRow {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    /// Styles JSON
    #[serde(default)]
    pub config: String,
    /// Features JSON
    #[serde(default)]
    pub features: String,
    #[serde(default)]
    pub status: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Preset {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        let now = Utc::now();
        Preset {
            id: 0,
            name: name.into(),
            slug: slug.into(),
            description: String::new(),
            status: PresetStatus::Active,
            styles: RawStyles::default(),
            features: RawFeatures::default(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Decode a stored row. Malformed JSON columns and unknown statuses fall
    /// back to defaults rather than rejecting the row.
    pub fn from_row(row: &PresetRow) -> Preset {
        let status = PresetStatus::parse(&row.status).unwrap_or_else(|| {
            tracing::warn!(slug = %row.slug, status = %row.status, "unknown preset status, treating as draft");
            PresetStatus::Draft
        });
        Preset {
            id: row.id,
            name: row.name.clone(),
            slug: row.slug.clone(),
            description: row.description.clone(),
            status,
            styles: lenient::from_json_str(&row.config),
            features: lenient::from_json_str(&row.features),
            created_at: row.created,
            modified_at: row.modified,
        }
    }

    pub fn to_row(&self) -> BlockResult<PresetRow> {
        Ok(PresetRow {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            description: self.description.clone(),
            config: serde_json::to_string(&self.styles)?,
            features: serde_json::to_string(&self.features)?,
            status: self.status.as_str().to_string(),
            created: self.created_at,
            modified: self.modified_at,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == PresetStatus::Active
    }
}

/// Read access to stored presets. Implementations may be backed by an
/// in-page cache or by a remote call; the resolvers only see fetched data.
pub trait PresetSource {
    fn get_by_slug(&self, slug: &str) -> BlockResult<Option<Preset>>;
    /// Active presets ordered by name
    fn list_active(&self) -> BlockResult<Vec<Preset>>;
}

/// Write access used by the admin save path
pub trait PresetSink {
    fn insert(&self, preset: Preset) -> BlockResult<Preset>;
    fn update(&self, preset: Preset) -> BlockResult<Preset>;
    fn delete(&self, slug: &str) -> BlockResult<()>;
}

/// Thread-safe in-memory preset table keyed by slug
#[derive(Debug, Default)]
pub struct MemoryPresetStore {
    presets: RwLock<BTreeMap<String, Preset>>,
    next_id: RwLock<u64>,
}

impl MemoryPresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_presets(presets: impl IntoIterator<Item = Preset>) -> Self {
        let store = Self::new();
        for preset in presets {
            // Seed data keeps its own ids.
            if let Ok(mut map) = store.presets.write() {
                map.insert(preset.slug.clone(), preset);
            }
        }
        store
    }

    fn poisoned() -> BlockError {
        BlockError::StorageError("preset store lock poisoned".to_string())
    }
}

impl PresetSource for MemoryPresetStore {
    fn get_by_slug(&self, slug: &str) -> BlockResult<Option<Preset>> {
        let map = self.presets.read().map_err(|_| Self::poisoned())?;
        Ok(map.get(slug).cloned())
    }

    fn list_active(&self) -> BlockResult<Vec<Preset>> {
        let map = self.presets.read().map_err(|_| Self::poisoned())?;
        let mut active: Vec<Preset> = map.values().filter(|p| p.is_active()).cloned().collect();
        active.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(active)
    }
}

impl PresetSink for MemoryPresetStore {
    fn insert(&self, mut preset: Preset) -> BlockResult<Preset> {
        let mut map = self.presets.write().map_err(|_| Self::poisoned())?;
        if map.contains_key(&preset.slug) {
            return Err(BlockError::DuplicateSlug { slug: preset.slug });
        }
        let mut next_id = self.next_id.write().map_err(|_| Self::poisoned())?;
        let max_seen = map.values().map(|p| p.id).max().unwrap_or(0);
        *next_id = (*next_id).max(max_seen) + 1;
        preset.id = *next_id;
        let now = Utc::now();
        preset.created_at = now;
        preset.modified_at = now;
        map.insert(preset.slug.clone(), preset.clone());
        Ok(preset)
    }

    fn update(&self, mut preset: Preset) -> BlockResult<Preset> {
        let mut map = self.presets.write().map_err(|_| Self::poisoned())?;
        let existing = map
            .get(&preset.slug)
            .ok_or_else(|| BlockError::PresetNotFound { slug: preset.slug.clone() })?;
        preset.id = existing.id;
        preset.created_at = existing.created_at;
        preset.modified_at = Utc::now();
        map.insert(preset.slug.clone(), preset.clone());
        Ok(preset)
    }

    fn delete(&self, slug: &str) -> BlockResult<()> {
        let mut map = self.presets.write().map_err(|_| Self::poisoned())?;
        map.remove(slug)
            .map(|_| ())
            .ok_or_else(|| BlockError::PresetNotFound { slug: slug.to_string() })
    }
}

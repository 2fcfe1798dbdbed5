//! Material record data model
//!
//! Records are persisted as `{"materials": {"<sku>": {...}}}` with camelCase
//! field names. Older stores written with Spanish keys (`nombre`,
//! `etiquetas`, `formato`, `files`) are read through serde aliases.

use crate::channels::ChannelRole;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Default metalness written on confirm
pub const CONFIRM_METALNESS: f32 = 0.3;
/// Default roughness written on confirm
pub const CONFIRM_ROUGHNESS: f32 = 0.41;
/// Default ambient-occlusion intensity written on confirm
pub const CONFIRM_AO_INTENSITY: f32 = 1.0;

fn enabled() -> bool {
    true
}

/// Per-material PBR tuning.
///
/// Numeric values are optional so the renderer can tell "absent" from an
/// explicit value and apply its own defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metalness: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roughness: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ao_intensity: Option<f32>,
    #[serde(default = "enabled")]
    pub enable_color: bool,
    #[serde(default = "enabled")]
    pub enable_normal: bool,
    #[serde(default = "enabled")]
    pub enable_roughness: bool,
    #[serde(default = "enabled")]
    pub enable_metalness: bool,
    #[serde(default = "enabled", rename = "enableAO", alias = "enableAo")]
    pub enable_ao: bool,
}

impl Default for PbrSettings {
    fn default() -> Self {
        Self {
            metalness: None,
            roughness: None,
            normal_scale: None,
            ao_intensity: None,
            enable_color: true,
            enable_normal: true,
            enable_roughness: true,
            enable_metalness: true,
            enable_ao: true,
        }
    }
}

impl PbrSettings {
    /// Settings stamped on a freshly confirmed material
    pub fn confirm_defaults() -> Self {
        Self {
            metalness: Some(CONFIRM_METALNESS),
            roughness: Some(CONFIRM_ROUGHNESS),
            ao_intensity: Some(CONFIRM_AO_INTENSITY),
            ..Self::default()
        }
    }
}

/// Partial update of [`PbrSettings`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrSettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metalness: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roughness: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ao_intensity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_color: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_normal: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_roughness: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_metalness: Option<bool>,
    #[serde(
        default,
        rename = "enableAO",
        alias = "enableAo",
        skip_serializing_if = "Option::is_none"
    )]
    pub enable_ao: Option<bool>,
}

impl PbrSettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Metalness, roughness and AO intensity must lie in 0..=1
    pub fn validate(&self) -> Result<()> {
        let unit = [
            ("metalness", self.metalness),
            ("roughness", self.roughness),
            ("aoIntensity", self.ao_intensity),
        ];
        for (field, value) in unit {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) {
                    return Err(Error::Validation(format!(
                        "{} must be between 0 and 1 (got {})",
                        field, v
                    )));
                }
            }
        }
        if let Some(scale) = self.normal_scale {
            if !scale.is_finite() {
                return Err(Error::Validation("normalScale must be finite".to_string()));
            }
        }
        Ok(())
    }

    pub fn apply_to(&self, settings: &mut PbrSettings) {
        if let Some(v) = self.metalness {
            settings.metalness = Some(v);
        }
        if let Some(v) = self.roughness {
            settings.roughness = Some(v);
        }
        if let Some(v) = self.normal_scale {
            settings.normal_scale = Some(v);
        }
        if let Some(v) = self.ao_intensity {
            settings.ao_intensity = Some(v);
        }
        if let Some(v) = self.enable_color {
            settings.enable_color = v;
        }
        if let Some(v) = self.enable_normal {
            settings.enable_normal = v;
        }
        if let Some(v) = self.enable_roughness {
            settings.enable_roughness = v;
        }
        if let Some(v) = self.enable_metalness {
            settings.enable_metalness = v;
        }
        if let Some(v) = self.enable_ao {
            settings.enable_ao = v;
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagsInput {
    List(Vec<String>),
    Csv(String),
}

impl TagsInput {
    fn into_tags(self) -> Vec<String> {
        let raw: Vec<String> = match self {
            TagsInput::List(list) => list,
            TagsInput::Csv(csv) => csv.split(',').map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect()
    }
}

fn deserialize_tag_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TagsInput>::deserialize(deserializer)?
        .map(TagsInput::into_tags)
        .unwrap_or_default())
}

fn deserialize_tag_patch<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TagsInput>::deserialize(deserializer)?.map(TagsInput::into_tags))
}

/// One persisted material, keyed by SKU
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRecord {
    /// SKU; immutable once created
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "nombre")]
    pub name: String,
    #[serde(default)]
    pub color_label: String,
    #[serde(default, alias = "formato")]
    pub format: String,
    #[serde(default, alias = "etiquetas", deserialize_with = "deserialize_tag_list")]
    pub tags: Vec<String>,
    /// Channel role → file name relative to the SKU's asset directory
    #[serde(default, alias = "files")]
    pub channel_files: BTreeMap<ChannelRole, String>,
    #[serde(default)]
    pub pbr_settings: PbrSettings,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl MaterialRecord {
    /// Blank record named after its SKU
    pub fn new(sku: &str, at: DateTime<Utc>) -> Self {
        Self {
            id: sku.to_string(),
            name: sku.to_string(),
            color_label: String::new(),
            format: String::new(),
            tags: Vec::new(),
            channel_files: BTreeMap::new(),
            pbr_settings: PbrSettings::default(),
            created_at: at,
            updated_at: at,
        }
    }

    /// Merge `patch` into this record and stamp `updatedAt`.
    ///
    /// `id` and `createdAt` are never touched.
    pub fn apply(&mut self, patch: &MaterialPatch, at: DateTime<Utc>) {
        if let Some(name) = &patch.name {
            let trimmed = name.trim();
            if !trimmed.is_empty() {
                self.name = trimmed.to_string();
            }
        }
        if let Some(color_label) = &patch.color_label {
            self.color_label = color_label.trim().to_string();
        }
        if let Some(format) = &patch.format {
            self.format = format.trim().to_string();
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
        if let Some(files) = &patch.channel_files {
            self.channel_files = files.clone();
        }
        if let Some(settings) = &patch.pbr_settings {
            settings.apply_to(&mut self.pbr_settings);
        }
        self.updated_at = at;
    }

    /// File stored under `role`, if any
    pub fn channel_file(&self, role: ChannelRole) -> Option<&str> {
        self.channel_files.get(&role).map(String::as_str)
    }
}

/// Partial update of a [`MaterialRecord`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialPatch {
    #[serde(default, alias = "nombre", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_label: Option<String>,
    #[serde(default, alias = "formato", skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(
        default,
        alias = "etiquetas",
        alias = "hashtags",
        deserialize_with = "deserialize_tag_patch",
        skip_serializing_if = "Option::is_none"
    )]
    pub tags: Option<Vec<String>>,
    #[serde(default, alias = "files", skip_serializing_if = "Option::is_none")]
    pub channel_files: Option<BTreeMap<ChannelRole, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbr_settings: Option<PbrSettingsPatch>,
}

impl MaterialPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(settings) = &self.pbr_settings {
            settings.validate()?;
        }
        Ok(())
    }
}

/// On-disk shape of the repository file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialStore {
    #[serde(default)]
    pub materials: BTreeMap<String, MaterialRecord>,
}

impl MaterialStore {
    /// Force every record's `id` to match its key
    pub fn normalize_ids(&mut self) {
        for (sku, record) in self.materials.iter_mut() {
            if record.id != *sku {
                record.id = sku.clone();
            }
        }
    }
}

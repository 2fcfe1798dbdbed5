//! Renderable material instances built from records
//!
//! An instance is fully derived from `(record, options)`. Nothing here reads
//! session state: the PBR flag and tiling arrive through [`BuildOptions`].

use crate::texture::{ColorSpace, Texture, TextureLoader};
use crate::ClientResult;
use matlib_common::channels;
use matlib_common::{Channel, ChannelRole, MaterialRecord, PbrSettings};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_METALNESS: f32 = 0.3;
pub const DEFAULT_ROUGHNESS: f32 = 0.5;
/// Applied as `(s, -s)`
pub const DEFAULT_NORMAL_SCALE: f32 = 2.0;
pub const DEFAULT_AO_INTENSITY: f32 = 1.0;
pub const DEFAULT_DISPLACEMENT_SCALE: f32 = -0.05;
pub const DEFAULT_DISPLACEMENT_BIAS: f32 = -0.05;

/// World-UV tiling factor
pub const DEFAULT_TILING: f32 = 0.25;
/// Offset is `tiling * OFFSET_FACTOR` unless overridden
pub const OFFSET_FACTOR: f32 = 0.726;

const GLASS_OPACITY: f32 = 0.4;
const GLASS_TRANSMISSION: f32 = 1.0;
const GLASS_THICKNESS: f32 = 0.5;
const GLASS_IOR: f32 = 10.0;
const GLASS_ROUGHNESS: f32 = 0.0;

/// Substrings in a record's name or tags that select the glass override
pub const GLASS_KEYWORDS: [&str; 3] = ["cristal", "vidrio", "glass"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    Standard,
    Glass,
}

/// Scalar shading parameters
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialParams {
    pub metalness: f32,
    pub roughness: f32,
    pub normal_scale: [f32; 2],
    pub ao_intensity: f32,
    pub displacement_scale: f32,
    pub displacement_bias: f32,
    pub transparent: bool,
    pub opacity: f32,
    pub transmission: f32,
    pub thickness: f32,
    pub ior: f32,
}

impl MaterialParams {
    /// Standard parameters with absent settings filled by defaults
    pub fn from_settings(settings: &PbrSettings) -> Self {
        let normal = settings.normal_scale.unwrap_or(DEFAULT_NORMAL_SCALE);
        Self {
            metalness: settings.metalness.unwrap_or(DEFAULT_METALNESS),
            roughness: settings.roughness.unwrap_or(DEFAULT_ROUGHNESS),
            normal_scale: [normal, -normal],
            ao_intensity: settings.ao_intensity.unwrap_or(DEFAULT_AO_INTENSITY),
            displacement_scale: DEFAULT_DISPLACEMENT_SCALE,
            displacement_bias: DEFAULT_DISPLACEMENT_BIAS,
            transparent: false,
            opacity: 1.0,
            transmission: 0.0,
            thickness: 0.0,
            ior: 1.5,
        }
    }

    pub fn glass() -> Self {
        Self {
            metalness: 0.0,
            roughness: GLASS_ROUGHNESS,
            transparent: true,
            opacity: GLASS_OPACITY,
            transmission: GLASS_TRANSMISSION,
            thickness: GLASS_THICKNESS,
            ior: GLASS_IOR,
            ..Self::from_settings(&PbrSettings::default())
        }
    }
}

/// What was actually loaded into an instance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceMetadata {
    pub sku: String,
    /// Color path the instance was derived from
    pub texture_path: Option<String>,
    pub pbr_maps_loaded: bool,
    pub loaded_channels: BTreeSet<Channel>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialInstance {
    pub kind: MaterialKind,
    pub color_map: Option<Texture>,
    pub maps: BTreeMap<Channel, Texture>,
    pub params: MaterialParams,
    pub metadata: InstanceMetadata,
}

impl MaterialInstance {
    /// Map-less standard material, e.g. what a mesh carries when a scene loads
    pub fn untextured(label: impl Into<String>) -> Self {
        Self {
            kind: MaterialKind::Standard,
            color_map: None,
            maps: BTreeMap::new(),
            params: MaterialParams::from_settings(&PbrSettings::default()),
            metadata: InstanceMetadata {
                sku: label.into(),
                ..InstanceMetadata::default()
            },
        }
    }

    fn glass(sku: &str) -> Self {
        Self {
            kind: MaterialKind::Glass,
            color_map: None,
            maps: BTreeMap::new(),
            params: MaterialParams::glass(),
            metadata: InstanceMetadata {
                sku: sku.to_string(),
                ..InstanceMetadata::default()
            },
        }
    }

    pub fn sku(&self) -> &str {
        &self.metadata.sku
    }
}

/// Per-build options
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    pub pbr_enabled: bool,
    pub is_glass: bool,
    pub tiling: f32,
    /// Explicit offset; derived from tiling when `None`
    pub offset: Option<[f32; 2]>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            pbr_enabled: true,
            is_glass: false,
            tiling: DEFAULT_TILING,
            offset: None,
        }
    }
}

impl BuildOptions {
    /// Options for `record`, with glass detected from its name and tags
    pub fn for_record(record: &MaterialRecord, pbr_enabled: bool) -> Self {
        Self {
            pbr_enabled,
            is_glass: is_glass_record(record),
            ..Self::default()
        }
    }

    pub fn with_tiling(mut self, tiling: f32) -> Self {
        self.tiling = tiling;
        self
    }

    pub fn effective_offset(&self) -> [f32; 2] {
        self.offset.unwrap_or_else(|| {
            let o = self.tiling * OFFSET_FACTOR;
            [o, o]
        })
    }
}

pub fn is_glass_record(record: &MaterialRecord) -> bool {
    let matches = |text: &str| {
        let lower = text.to_lowercase();
        GLASS_KEYWORDS.iter().any(|k| lower.contains(k))
    };
    matches(&record.name) || record.tags.iter().any(|tag| matches(tag))
}

/// Asset path of a record's color file
pub fn color_path(record: &MaterialRecord) -> String {
    let file = record
        .channel_file(ChannelRole::Color)
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}.png", record.id));
    format!("/materials/{}/{}", record.id, file)
}

fn channel_enabled(settings: &PbrSettings, channel: Channel) -> bool {
    match channel.role() {
        Some(ChannelRole::Normal) => settings.enable_normal,
        Some(ChannelRole::Roughness) => settings.enable_roughness,
        Some(ChannelRole::Metalness) => settings.enable_metalness,
        Some(ChannelRole::Ao) => settings.enable_ao,
        _ => true,
    }
}

/// Builds [`MaterialInstance`]s through a [`TextureLoader`]
#[derive(Clone)]
pub struct MaterialBuilder {
    loader: Arc<dyn TextureLoader>,
}

impl MaterialBuilder {
    pub fn new(loader: Arc<dyn TextureLoader>) -> Self {
        Self { loader }
    }

    /// Build an instance for `record`.
    ///
    /// The color map must load. Every other channel is optional: a failed
    /// load leaves that channel out.
    pub async fn build(
        &self,
        record: &MaterialRecord,
        options: &BuildOptions,
    ) -> ClientResult<MaterialInstance> {
        if options.is_glass {
            debug!(sku = %record.id, "Glass override");
            return Ok(MaterialInstance::glass(&record.id));
        }

        let settings = &record.pbr_settings;
        let offset = options.effective_offset();
        let color = color_path(record);

        let color_map = if settings.enable_color {
            let texture = self.loader.load(&color).await?;
            Some(
                texture
                    .tiled(options.tiling, offset)
                    .with_color_space(ColorSpace::Srgb),
            )
        } else {
            None
        };

        let mut maps = BTreeMap::new();
        if options.pbr_enabled {
            let resolved = channels::resolve(&record.id, &color);
            for (channel, path) in resolved.iter() {
                if !channel_enabled(settings, channel) {
                    continue;
                }
                match self.loader.load(path).await {
                    Ok(texture) => {
                        maps.insert(channel, texture.tiled(options.tiling, offset));
                    }
                    Err(e) => debug!(sku = %record.id, channel = %channel, error = %e, "Channel absent"),
                }
            }
        }

        let loaded_channels: BTreeSet<Channel> = maps.keys().copied().collect();
        debug!(
            sku = %record.id,
            channels = loaded_channels.len(),
            pbr = options.pbr_enabled,
            "Material instance built"
        );

        Ok(MaterialInstance {
            kind: MaterialKind::Standard,
            color_map,
            params: MaterialParams::from_settings(settings),
            metadata: InstanceMetadata {
                sku: record.id.clone(),
                texture_path: Some(color),
                pbr_maps_loaded: !maps.is_empty(),
                loaded_channels,
            },
            maps,
        })
    }
}

//! PBR channel naming convention
//!
//! A material's base color file is named `<base>_Color.<ext>`. Every other
//! channel lives beside it as `<base>_<Suffix>.jpg`. Resolution here is
//! purely textual: nothing in this module touches the filesystem, callers
//! check existence lazily and treat a missing channel as "absent".

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Suffix carried by the canonical color file
pub const COLOR_SUFFIX: &str = "_Color";

/// Extension every generated channel file uses
pub const CHANNEL_EXTENSION: &str = "jpg";

/// Accepted texture upload extensions (lowercase)
pub const TEXTURE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Accepted model upload extension (lowercase)
pub const MODEL_EXTENSION: &str = "glb";

/// A derived PBR map that sits beside the color file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    Normal,
    Roughness,
    Metalness,
    Specular,
    AmbientOcclusion,
    Displacement,
}

impl Channel {
    /// Every sibling channel, in load order
    pub const ALL: [Channel; 6] = [
        Channel::Normal,
        Channel::Roughness,
        Channel::Metalness,
        Channel::Specular,
        Channel::AmbientOcclusion,
        Channel::Displacement,
    ];

    /// File-name suffix replacing `_Color`
    pub fn suffix(self) -> &'static str {
        match self {
            Channel::Normal => "_Normal",
            Channel::Roughness => "_Roughness",
            Channel::Metalness => "_Metalness",
            Channel::Specular => "_Specular",
            Channel::AmbientOcclusion => "_AmbientOcclusion",
            Channel::Displacement => "_Displacement",
        }
    }

    /// Record role this channel is stored under, if any.
    ///
    /// Specular and displacement maps are loaded by convention only and are
    /// never listed in a record's `channelFiles`.
    pub fn role(self) -> Option<ChannelRole> {
        match self {
            Channel::Normal => Some(ChannelRole::Normal),
            Channel::Roughness => Some(ChannelRole::Roughness),
            Channel::Metalness => Some(ChannelRole::Metalness),
            Channel::AmbientOcclusion => Some(ChannelRole::Ao),
            Channel::Specular | Channel::Displacement => None,
        }
    }

    /// `<base><suffix>.jpg`
    pub fn file_name(self, base: &str) -> String {
        format!("{}{}.{}", base, self.suffix(), CHANNEL_EXTENSION)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.suffix()[1..])
    }
}

/// Key of a record's `channelFiles` map
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelRole {
    Color,
    Normal,
    Roughness,
    Metalness,
    Ao,
    Model,
}

impl ChannelRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelRole::Color => "color",
            ChannelRole::Normal => "normal",
            ChannelRole::Roughness => "roughness",
            ChannelRole::Metalness => "metalness",
            ChannelRole::Ao => "ao",
            ChannelRole::Model => "model",
        }
    }
}

/// Sibling paths derived from one color path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPaths {
    /// Identifier the suffixes were appended to
    pub base: String,
    /// The color path exactly as given
    pub color: String,
    siblings: Vec<(Channel, String)>,
}

impl ChannelPaths {
    /// Expected path of `channel`
    pub fn get(&self, channel: Channel) -> Option<&str> {
        self.siblings
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, p)| p.as_str())
    }

    /// All six sibling paths in load order
    pub fn iter(&self) -> impl Iterator<Item = (Channel, &str)> {
        self.siblings.iter().map(|(c, p)| (*c, p.as_str()))
    }
}

/// Derive every sibling channel path from a color path.
///
/// When the color file name ends in `_Color` that suffix is replaced; when it
/// does not, `base_id` is used as the stem instead (falling back to the file
/// stem if `base_id` is empty). Works on `/` and `\` separated paths alike.
pub fn resolve(base_id: &str, color_path: &str) -> ChannelPaths {
    let split = color_path.rfind(|c| c == '/' || c == '\\');
    let (prefix, file_name) = match split {
        Some(idx) => (&color_path[..=idx], &color_path[idx + 1..]),
        None => ("", color_path),
    };

    let stem = match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    };

    let base = match stem.strip_suffix(COLOR_SUFFIX) {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ if !base_id.is_empty() => base_id.to_string(),
        _ => stem.to_string(),
    };

    let siblings = Channel::ALL
        .iter()
        .map(|channel| (*channel, format!("{}{}", prefix, channel.file_name(&base))))
        .collect();

    ChannelPaths {
        base,
        color: color_path.to_string(),
        siblings,
    }
}

/// Sibling paths for a color file stored inside `dir`
pub fn resolve_in_dir(dir: &Path, base_id: &str, color_file_name: &str) -> Vec<(Channel, PathBuf)> {
    let resolved = resolve(base_id, color_file_name);
    resolved
        .iter()
        .map(|(channel, name)| (channel, dir.join(name)))
        .collect()
}

/// Classify a committed file into its record role by naming convention
pub fn classify_file(file_name: &str) -> Option<ChannelRole> {
    if extension_of(file_name).as_deref() == Some(MODEL_EXTENSION) {
        return Some(ChannelRole::Model);
    }
    if file_name.contains(COLOR_SUFFIX) {
        return Some(ChannelRole::Color);
    }
    Channel::ALL
        .iter()
        .find(|channel| file_name.contains(channel.suffix()))
        .and_then(|channel| channel.role())
}

/// Lowercase extension without the dot
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Derive a SKU from an uploaded file name.
///
/// Drops the extension and a trailing `_Color`, then keeps only ASCII
/// alphanumerics: `"oak-floor_Color.png"` becomes `"oakfloor"`.
pub fn extract_sku(file_name: &str) -> String {
    let stem = match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    };
    let stem = stem.strip_suffix(COLOR_SUFFIX).unwrap_or(stem);
    stem.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Role and staged file name for an upload, inferred at staging time.
///
/// Textures become `<sku>_Color.<ext>`, models become `<sku>.glb`.
pub fn staged_file_name(sku: &str, original_name: &str) -> Result<(ChannelRole, String)> {
    let ext = extension_of(original_name).ok_or_else(|| {
        Error::Validation(format!("File has no extension: {}", original_name))
    })?;

    if ext == MODEL_EXTENSION {
        return Ok((ChannelRole::Model, format!("{}.{}", sku, MODEL_EXTENSION)));
    }
    if TEXTURE_EXTENSIONS.contains(&ext.as_str()) {
        // Keep the extension as uploaded
        let original_ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(&ext);
        return Ok((
            ChannelRole::Color,
            format!("{}{}.{}", sku, COLOR_SUFFIX, original_ext),
        ));
    }

    Err(Error::Validation(format!(
        "Unsupported file type: {} (accepted: jpg, jpeg, png, webp, glb)",
        original_name
    )))
}

/// Path segments under `/materials/` taken by fixed routes
pub const RESERVED_SKUS: [&str; 7] = [
    "confirm",
    "save",
    "staging",
    "cleanup-temp",
    "check",
    "upload",
    "generate-pbr",
];

/// Reject SKUs that are empty, unsafe as a path segment or shadowed by a route
pub fn validate_sku(sku: &str) -> Result<()> {
    if sku.trim().is_empty() {
        return Err(Error::Validation("SKU is required".to_string()));
    }
    if RESERVED_SKUS.contains(&sku) {
        return Err(Error::Validation(format!("SKU is a reserved name: {}", sku)));
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::Validation(format!(
            "SKU contains unsupported characters: {}",
            sku
        )));
    }
    Ok(())
}

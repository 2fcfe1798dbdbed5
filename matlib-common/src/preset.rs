//! Preset wire model
//!
//! Two shapes exist on the wire:
//! - current: `{"presets": [[{"uuid": "...", "sku": "..."}], ...]}`
//! - legacy:  `{"Presets": {"1": [{"targetTxt": "SKU", "objects": [{"uuid": "..."}]}], "2": [...]}}`
//!
//! Both are accepted at the boundary and normalized into flat bindings.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// One mesh → SKU pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetBinding {
    #[serde(default, rename = "uuid", alias = "meshId")]
    pub mesh_id: String,
    #[serde(default)]
    pub sku: String,
}

impl PresetBinding {
    pub fn new(mesh_id: impl Into<String>, sku: impl Into<String>) -> Self {
        Self {
            mesh_id: mesh_id.into(),
            sku: sku.into(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.mesh_id.is_empty() && !self.sku.is_empty()
    }
}

/// Mesh reference inside a legacy group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyObject {
    #[serde(default)]
    pub uuid: String,
}

/// Legacy group: one SKU applied to several meshes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyGroup {
    #[serde(rename = "targetTxt")]
    pub target_txt: String,
    #[serde(default)]
    pub objects: Vec<LegacyObject>,
}

/// A set of bindings meant to be applied together
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Preset {
    Flat(Vec<PresetBinding>),
    Grouped(Vec<LegacyGroup>),
}

/// One element of a preset array; groups are recognised by `targetTxt`
#[derive(Deserialize)]
#[serde(untagged)]
enum PresetEntry {
    Group(LegacyGroup),
    Binding(PresetBinding),
}

impl<'de> Deserialize<'de> for Preset {
    /// An array made only of groups stays grouped. Anything else reads as
    /// flat, with any groups in it expanded in place.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<PresetEntry>::deserialize(deserializer)?;
        let all_groups = !entries.is_empty()
            && entries.iter().all(|e| matches!(e, PresetEntry::Group(_)));

        if all_groups {
            let groups = entries
                .into_iter()
                .filter_map(|entry| match entry {
                    PresetEntry::Group(group) => Some(group),
                    PresetEntry::Binding(_) => None,
                })
                .collect();
            return Ok(Preset::Grouped(groups));
        }

        let bindings = entries
            .into_iter()
            .flat_map(|entry| match entry {
                PresetEntry::Binding(binding) => vec![binding],
                PresetEntry::Group(group) => Preset::Grouped(vec![group]).into_bindings(),
            })
            .collect();
        Ok(Preset::Flat(bindings))
    }
}

impl Preset {
    /// Normalize into flat bindings, dropping entries without a mesh or SKU.
    ///
    /// Order is preserved: groups in sequence, objects in sequence.
    pub fn into_bindings(self) -> Vec<PresetBinding> {
        let bindings: Vec<PresetBinding> = match self {
            Preset::Flat(bindings) => bindings,
            Preset::Grouped(groups) => groups
                .into_iter()
                .flat_map(|group| {
                    let sku = group.target_txt;
                    group
                        .objects
                        .into_iter()
                        .map(move |object| PresetBinding::new(object.uuid, sku.clone()))
                })
                .collect(),
        };
        bindings.into_iter().filter(PresetBinding::is_complete).collect()
    }

    /// Flat copy of this preset
    pub fn normalized(&self) -> Preset {
        Preset::Flat(self.clone().into_bindings())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Preset::Flat(bindings) => bindings.is_empty(),
            Preset::Grouped(groups) => groups.is_empty(),
        }
    }
}

impl From<Vec<PresetBinding>> for Preset {
    fn from(bindings: Vec<PresetBinding>) -> Self {
        Preset::Flat(bindings)
    }
}

/// All presets belonging to one project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresetBook {
    pub presets: Vec<Preset>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PresetBookWire {
    Current {
        presets: Vec<Preset>,
    },
    Legacy {
        #[serde(rename = "Presets")]
        presets: BTreeMap<String, Preset>,
    },
}

#[derive(Serialize)]
struct PresetBookOut<'a> {
    presets: &'a [Preset],
}

/// Numeric keys in numeric order, anything else after them lexically
fn legacy_order(mut entries: Vec<(String, Preset)>) -> Vec<Preset> {
    entries.sort_by(|(a, _), (b, _)| match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    });
    entries.into_iter().map(|(_, preset)| preset).collect()
}

impl<'de> Deserialize<'de> for PresetBook {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let presets = match PresetBookWire::deserialize(deserializer)? {
            PresetBookWire::Current { presets } => presets,
            PresetBookWire::Legacy { presets } => legacy_order(presets.into_iter().collect()),
        };
        Ok(PresetBook { presets })
    }
}

impl Serialize for PresetBook {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        PresetBookOut {
            presets: &self.presets,
        }
        .serialize(serializer)
    }
}

impl PresetBook {
    /// Book with every preset in flat form
    pub fn normalized(&self) -> PresetBook {
        PresetBook {
            presets: self.presets.iter().map(Preset::normalized).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_preset_parses() {
        let preset: Preset = serde_json::from_value(json!([
            { "uuid": "mesh-a", "sku": "S1" },
            { "uuid": "mesh-b", "sku": "S2" }
        ]))
        .unwrap();
        assert!(matches!(preset, Preset::Flat(_)));
        assert_eq!(
            preset.into_bindings(),
            vec![PresetBinding::new("mesh-a", "S1"), PresetBinding::new("mesh-b", "S2")]
        );
    }

    #[test]
    fn test_grouped_preset_parses_and_flattens() {
        let preset: Preset = serde_json::from_value(json!([
            { "targetTxt": "S1", "objects": [{ "uuid": "a" }, { "uuid": "b" }] },
            { "targetTxt": "S2", "objects": [{ "uuid": "c" }] }
        ]))
        .unwrap();
        assert!(matches!(preset, Preset::Grouped(_)));
        assert_eq!(
            preset.into_bindings(),
            vec![
                PresetBinding::new("a", "S1"),
                PresetBinding::new("b", "S1"),
                PresetBinding::new("c", "S2"),
            ]
        );
    }

    #[test]
    fn test_incomplete_bindings_are_dropped() {
        let preset: Preset = serde_json::from_value(json!([
            { "uuid": "", "sku": "S1" },
            { "meshId": "m", "sku": "S2" }
        ]))
        .unwrap();
        assert_eq!(preset.into_bindings(), vec![PresetBinding::new("m", "S2")]);
    }

    #[test]
    fn test_binding_missing_a_field_does_not_spoil_the_book() {
        let book: PresetBook = serde_json::from_value(json!({
            "presets": [[{ "uuid": "m1" }, { "uuid": "m2", "sku": "A" }, { "sku": "B" }]]
        }))
        .unwrap();
        assert_eq!(
            book.normalized().presets,
            vec![Preset::Flat(vec![PresetBinding::new("m2", "A")])]
        );
    }

    #[test]
    fn test_legacy_object_without_uuid_is_dropped() {
        let preset: Preset = serde_json::from_value(json!([
            { "targetTxt": "S1", "objects": [{}, { "uuid": "a" }] }
        ]))
        .unwrap();
        assert!(matches!(preset, Preset::Grouped(_)));
        assert_eq!(preset.into_bindings(), vec![PresetBinding::new("a", "S1")]);
    }

    #[test]
    fn test_legacy_book_orders_numerically() {
        let book: PresetBook = serde_json::from_value(json!({
            "Presets": {
                "10": [{ "targetTxt": "TEN", "objects": [{ "uuid": "x" }] }],
                "2":  [{ "targetTxt": "TWO", "objects": [{ "uuid": "y" }] }],
                "1":  [{ "targetTxt": "ONE", "objects": [{ "uuid": "z" }] }]
            }
        }))
        .unwrap();

        let skus: Vec<String> = book
            .presets
            .into_iter()
            .map(|p| p.into_bindings()[0].sku.clone())
            .collect();
        assert_eq!(skus, vec!["ONE", "TWO", "TEN"]);
    }

    #[test]
    fn test_book_serializes_current_format() {
        let book = PresetBook {
            presets: vec![Preset::Flat(vec![PresetBinding::new("m1", "S1")])],
        };
        let value = serde_json::to_value(&book).unwrap();
        assert_eq!(value, json!({ "presets": [[{ "uuid": "m1", "sku": "S1" }]] }));

        let reparsed: PresetBook = serde_json::from_value(value).unwrap();
        assert_eq!(reparsed, book);
    }

    #[test]
    fn test_empty_preset_is_flat() {
        let preset: Preset = serde_json::from_value(json!([])).unwrap();
        assert_eq!(preset, Preset::Flat(vec![]));
        assert!(preset.is_empty());
    }
}

//! Scene seam
//!
//! The session only needs to look meshes up by identifier and swap their
//! material. [`SceneGraph`] is the in-memory implementation; a renderer
//! implements [`Scene`] over its own node tree.

use crate::instance::MaterialInstance;
use crate::{ClientError, ClientResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

pub trait Scene: Send {
    fn contains(&self, mesh_id: &str) -> bool;

    fn mesh_ids(&self) -> Vec<String>;

    /// Material currently on `mesh_id`, `None` if detached or unknown
    fn material(&self, mesh_id: &str) -> Option<Arc<MaterialInstance>>;

    /// Replace the material on `mesh_id`; `None` detaches it
    fn set_material(
        &mut self,
        mesh_id: &str,
        material: Option<Arc<MaterialInstance>>,
    ) -> ClientResult<()>;
}

/// Flat mesh table
#[derive(Debug, Default, Clone)]
pub struct SceneGraph {
    meshes: BTreeMap<String, Option<Arc<MaterialInstance>>>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mesh carrying `material`; replaces any mesh with the same id
    pub fn add_mesh(&mut self, mesh_id: impl Into<String>, material: Option<Arc<MaterialInstance>>) {
        self.meshes.insert(mesh_id.into(), material);
    }

    /// Add a mesh under a fresh identifier with an untextured material
    pub fn spawn_mesh(&mut self) -> String {
        let id = Uuid::new_v4().to_string();
        let material = Arc::new(MaterialInstance::untextured(id.as_str()));
        self.add_mesh(id.clone(), Some(material));
        id
    }

    pub fn remove_mesh(&mut self, mesh_id: &str) -> bool {
        self.meshes.remove(mesh_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

impl Scene for SceneGraph {
    fn contains(&self, mesh_id: &str) -> bool {
        self.meshes.contains_key(mesh_id)
    }

    fn mesh_ids(&self) -> Vec<String> {
        self.meshes.keys().cloned().collect()
    }

    fn material(&self, mesh_id: &str) -> Option<Arc<MaterialInstance>> {
        self.meshes.get(mesh_id).cloned().flatten()
    }

    fn set_material(
        &mut self,
        mesh_id: &str,
        material: Option<Arc<MaterialInstance>>,
    ) -> ClientResult<()> {
        match self.meshes.get_mut(mesh_id) {
            Some(slot) => {
                *slot = material;
                Ok(())
            }
            None => Err(ClientError::UnknownMesh(mesh_id.to_string())),
        }
    }
}

//! Mesh-binding session
//!
//! Owns the binding table (mesh → SKU currently shown), the bounded undo
//! history and the session-wide PBR flag. Every instance is built from
//! `(record, options)` where the options come from explicit session fields.

use crate::history::{ActionHistory, ActionHistoryEntry, ActionKind};
use crate::instance::{BuildOptions, MaterialBuilder, MaterialInstance, DEFAULT_TILING};
use crate::scene::Scene;
use crate::source::MaterialSource;
use crate::texture::TextureLoader;
use crate::{ClientError, ClientResult};
use matlib_common::time::{Clock, SystemClock};
use matlib_common::{MaterialRecord, Preset, PresetBinding};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one [`BindingSession::undo`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoReport {
    /// SKU the undone operation had applied
    pub sku: String,
    pub restored: Vec<String>,
    /// Meshes left as they are: gone from the scene or without a captured material
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoInfo {
    pub can_undo: bool,
    pub history_size: usize,
}

/// Outcome of re-applying every binding after a PBR toggle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebindReport {
    pub rebound: Vec<String>,
    /// `"<mesh>: <error>"` per binding that could not be rebuilt
    pub errors: Vec<String>,
}

pub struct BindingSession<S: Scene> {
    scene: S,
    source: Arc<dyn MaterialSource>,
    builder: MaterialBuilder,
    bindings: BTreeMap<String, String>,
    history: ActionHistory,
    pbr_enabled: bool,
    tiling: f32,
    pending_selection: Option<String>,
    clock: Arc<dyn Clock>,
}

impl<S: Scene> BindingSession<S> {
    pub fn new(scene: S, source: Arc<dyn MaterialSource>, loader: Arc<dyn TextureLoader>) -> Self {
        Self {
            scene,
            source,
            builder: MaterialBuilder::new(loader),
            bindings: BTreeMap::new(),
            history: ActionHistory::new(),
            pbr_enabled: true,
            tiling: DEFAULT_TILING,
            pending_selection: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_tiling(mut self, tiling: f32) -> Self {
        self.tiling = tiling;
        self
    }

    pub fn with_pbr(mut self, enabled: bool) -> Self {
        self.pbr_enabled = enabled;
        self
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    /// SKU currently bound to `mesh_id`
    pub fn binding(&self, mesh_id: &str) -> Option<&str> {
        self.bindings.get(mesh_id).map(String::as_str)
    }

    pub fn bindings(&self) -> &BTreeMap<String, String> {
        &self.bindings
    }

    pub fn history(&self) -> &ActionHistory {
        &self.history
    }

    pub fn pbr_enabled(&self) -> bool {
        self.pbr_enabled
    }

    pub fn tiling(&self) -> f32 {
        self.tiling
    }

    pub fn undo_info(&self) -> UndoInfo {
        UndoInfo {
            can_undo: !self.history.is_empty(),
            history_size: self.history.len(),
        }
    }

    /// Build options for `record` under the current session flags
    pub fn options_for(&self, record: &MaterialRecord) -> BuildOptions {
        BuildOptions::for_record(record, self.pbr_enabled).with_tiling(self.tiling)
    }

    /// Fetch `sku` and build its instance without touching the scene
    pub async fn instantiate(&self, sku: &str) -> ClientResult<Arc<MaterialInstance>> {
        let record = self.source.fetch(sku).await?;
        let options = self.options_for(&record);
        let instance = self.builder.build(&record, &options).await?;
        Ok(Arc::new(instance))
    }

    /// Bind `sku` to one mesh.
    ///
    /// Overwrites any existing binding of the mesh and pushes one history
    /// entry holding the material it carried before.
    pub async fn bind(&mut self, mesh_id: &str, sku: &str) -> ClientResult<Arc<MaterialInstance>> {
        if !self.scene.contains(mesh_id) {
            return Err(ClientError::UnknownMesh(mesh_id.to_string()));
        }
        let instance = self.instantiate(sku).await?;
        self.apply_instance(&[mesh_id.to_string()], sku, instance.clone());
        Ok(instance)
    }

    /// Put one shared instance on several meshes as a single undoable step.
    ///
    /// Meshes missing from the scene are skipped. Returns the meshes that
    /// received the instance; no history entry is pushed when that is empty.
    pub fn apply_instance(
        &mut self,
        mesh_ids: &[String],
        sku: &str,
        instance: Arc<MaterialInstance>,
    ) -> Vec<String> {
        let mut applied = Vec::with_capacity(mesh_ids.len());
        let mut previous_materials = Vec::with_capacity(mesh_ids.len());
        let mut previous_skus = Vec::with_capacity(mesh_ids.len());

        for mesh_id in mesh_ids {
            if !self.scene.contains(mesh_id) {
                debug!(mesh = %mesh_id, sku = %sku, "Mesh not in scene, skipped");
                continue;
            }
            let previous = self.scene.material(mesh_id);
            if let Err(e) = self.scene.set_material(mesh_id, Some(instance.clone())) {
                warn!(mesh = %mesh_id, sku = %sku, error = %e, "Failed to apply material");
                continue;
            }
            previous_materials.push(previous);
            previous_skus.push(self.bindings.insert(mesh_id.clone(), sku.to_string()));
            applied.push(mesh_id.clone());
        }

        if applied.is_empty() {
            return applied;
        }

        let entry = ActionHistoryEntry {
            kind: ActionKind::BindingApply,
            sku: sku.to_string(),
            affected_mesh_ids: applied.clone(),
            previous_materials,
            previous_skus,
            timestamp: self.clock.now(),
        };
        if let Some(evicted) = self.history.push(entry) {
            debug!(sku = %evicted.sku, "Oldest history entry evicted");
        }
        debug!(sku = %sku, meshes = applied.len(), "Material applied");
        applied
    }

    /// Revert the most recent binding operation.
    ///
    /// Restores the exact material objects captured at bind time. Returns
    /// `None` when the history is exhausted.
    pub fn undo(&mut self) -> Option<UndoReport> {
        let entry = self.history.pop()?;
        let mut report = UndoReport {
            sku: entry.sku.clone(),
            restored: Vec::new(),
            skipped: Vec::new(),
        };

        let steps = entry
            .affected_mesh_ids
            .into_iter()
            .zip(entry.previous_materials)
            .zip(entry.previous_skus)
            .rev();
        for ((mesh_id, previous), previous_sku) in steps {
            let Some(previous) = previous else {
                warn!(mesh = %mesh_id, "No previous material captured, undo skipped for mesh");
                report.skipped.push(mesh_id);
                continue;
            };
            if let Err(e) = self.scene.set_material(&mesh_id, Some(previous)) {
                warn!(mesh = %mesh_id, error = %e, "Undo skipped for mesh");
                report.skipped.push(mesh_id);
                continue;
            }
            match previous_sku {
                Some(sku) => self.bindings.insert(mesh_id.clone(), sku),
                None => self.bindings.remove(&mesh_id),
            };
            report.restored.push(mesh_id);
        }

        debug!(
            sku = %report.sku,
            restored = report.restored.len(),
            skipped = report.skipped.len(),
            "Undo"
        );
        Some(report)
    }

    /// Detach the material of every mesh in the scene and drop the binding
    /// table and history
    pub fn clear_all(&mut self) {
        for mesh_id in self.scene.mesh_ids() {
            if let Err(e) = self.scene.set_material(&mesh_id, None) {
                debug!(mesh = %mesh_id, error = %e, "Mesh left the scene");
            }
        }
        let cleared = self.bindings.len();
        self.bindings.clear();
        self.history.clear();
        self.pending_selection = None;
        info!(cleared, "Bindings cleared");
    }

    /// Set the session PBR flag and rebuild every bound mesh with it
    pub async fn set_pbr(&mut self, enabled: bool) -> RebindReport {
        if enabled == self.pbr_enabled {
            return RebindReport::default();
        }
        self.pbr_enabled = enabled;

        let current: Vec<(String, String)> = self
            .bindings
            .iter()
            .map(|(mesh, sku)| (mesh.clone(), sku.clone()))
            .collect();

        let mut report = RebindReport::default();
        for (mesh_id, sku) in current {
            match self.bind(&mesh_id, &sku).await {
                Ok(_) => report.rebound.push(mesh_id),
                Err(e) => {
                    warn!(mesh = %mesh_id, sku = %sku, error = %e, "Rebind failed");
                    report.errors.push(format!("{}: {}", mesh_id, e));
                }
            }
        }
        info!(pbr = enabled, rebound = report.rebound.len(), "PBR toggled");
        report
    }

    pub async fn toggle_pbr(&mut self) -> RebindReport {
        let next = !self.pbr_enabled;
        self.set_pbr(next).await
    }

    /// Arm a one-shot selection for `sku`; a previously armed one is cancelled and returned
    pub fn begin_selection(&mut self, sku: impl Into<String>) -> Option<String> {
        let cancelled = self.pending_selection.replace(sku.into());
        if let Some(previous) = &cancelled {
            debug!(sku = %previous, "Pending selection replaced");
        }
        cancelled
    }

    pub fn cancel_selection(&mut self) -> Option<String> {
        self.pending_selection.take()
    }

    pub fn pending_selection(&self) -> Option<&str> {
        self.pending_selection.as_deref()
    }

    /// Consume the pending selection by binding it to `mesh_id`.
    ///
    /// `Ok(None)` when nothing was armed.
    pub async fn complete_selection(
        &mut self,
        mesh_id: &str,
    ) -> ClientResult<Option<Arc<MaterialInstance>>> {
        let Some(sku) = self.pending_selection.take() else {
            return Ok(None);
        };
        self.bind(mesh_id, &sku).await.map(Some)
    }

    /// Current binding table as a flat preset
    pub fn to_preset(&self) -> Preset {
        Preset::Flat(
            self.bindings
                .iter()
                .map(|(mesh, sku)| PresetBinding::new(mesh.as_str(), sku.as_str()))
                .collect(),
        )
    }
}

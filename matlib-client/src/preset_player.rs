//! Preset replay
//!
//! A preset replaces the current bindings wholesale. Bindings are grouped by
//! SKU in first-appearance order so each distinct material is fetched and
//! built once, then shared by every mesh of its group.

use crate::scene::Scene;
use crate::session::BindingSession;
use matlib_common::Preset;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresetReport {
    /// Meshes that received a material
    pub bound: Vec<String>,
    /// Meshes named by the preset but absent from the scene
    pub skipped_meshes: Vec<String>,
    /// `"<sku>: <error>"` per group whose fetch or build failed
    pub failed_skus: Vec<String>,
    /// Repository fetches performed
    pub fetches: usize,
}

/// Group `(mesh, sku)` pairs by SKU, keeping first-appearance order.
///
/// A mesh named more than once keeps only its last binding.
fn group_by_sku(preset: &Preset) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for binding in preset.clone().into_bindings() {
        for (_, meshes) in groups.iter_mut() {
            meshes.retain(|mesh| *mesh != binding.mesh_id);
        }
        match groups.iter_mut().find(|(sku, _)| *sku == binding.sku) {
            Some((_, meshes)) => meshes.push(binding.mesh_id),
            None => groups.push((binding.sku, vec![binding.mesh_id])),
        }
    }
    groups.retain(|(_, meshes)| !meshes.is_empty());
    groups
}

/// Clear `session` and apply every binding of `preset`.
///
/// A group whose meshes are all absent is not fetched. A failing group is
/// reported and the remaining groups still apply.
pub async fn apply_preset<S: Scene>(session: &mut BindingSession<S>, preset: &Preset) -> PresetReport {
    session.clear_all();

    let mut report = PresetReport::default();
    for (sku, mesh_ids) in group_by_sku(preset) {
        let (present, absent): (Vec<String>, Vec<String>) = mesh_ids
            .into_iter()
            .partition(|mesh| session.scene().contains(mesh));
        report.skipped_meshes.extend(absent);
        if present.is_empty() {
            continue;
        }

        report.fetches += 1;
        match session.instantiate(&sku).await {
            Ok(instance) => {
                let applied = session.apply_instance(&present, &sku, instance);
                report.bound.extend(applied);
            }
            Err(e) => {
                warn!(sku = %sku, error = %e, "Preset group failed");
                report.failed_skus.push(format!("{}: {}", sku, e));
            }
        }
    }

    info!(
        bound = report.bound.len(),
        skipped = report.skipped_meshes.len(),
        failed = report.failed_skus.len(),
        fetches = report.fetches,
        "Preset applied"
    );
    report
}
